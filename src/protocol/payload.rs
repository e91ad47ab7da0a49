// src/protocol/payload.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::request::Size;

/// 发往供应商竞价服务的请求描述，由宿主负责真正发送
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerRequest {
    pub method: HttpMethod,
    pub url: String,
    pub data: OutboundPayload,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
}

/// 整批请求对应的 JSON body；缺省字段不会出现在线上 JSON 中
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    pub auction_id: String,
    pub bids: Vec<PayloadBid>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub secure: bool,
    /// main page accessible
    pub mpa: bool,
    /// 剩余超时预算，可能为负
    pub timeout: i64,
    pub ssat: u8,
    pub yl2: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ab: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gdpr: Option<GdprSignal>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PayloadBid {
    pub bid_id: String,
    pub sid: String,
    pub sizes: Vec<Size>,
    /// None 表示可见性未知，不写入 JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_in_view: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserIds {
    pub euids: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GdprSignal {
    pub consent: String,
    pub applies: bool,
}
