// src/protocol/response.rs

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::protocol::lenient;

/// 宿主交回的原始响应，`body` 可能缺失、为空或不是对象
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ServerResponse {
    #[serde(default)]
    pub body: Option<Value>,
}

impl ServerResponse {
    pub fn new(body: Value) -> Self {
        Self { body: Some(body) }
    }
}

/// 响应 `bids` 数组中的单个出价
///
/// 只有 `bidId` 必须可用；数值字段缺失或不可用时取 0，不丢弃整个出价。
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBid {
    pub bid_id: String,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub cpm: f64,
    #[serde(default, deserialize_with = "lenient::dimension_or_zero")]
    pub width: u32,
    #[serde(default, deserialize_with = "lenient::dimension_or_zero")]
    pub height: u32,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub ad: Option<String>,
    /// 价格优化字段，字段集合由服务端决定
    #[serde(default, deserialize_with = "lenient::optional")]
    pub bid_price_optimisation: Option<Map<String, Value>>,
}

/// 交给宿主的标准化出价。
///
/// 基础字段之外的 `extra` 在序列化时最后合并，同名键覆盖基础字段。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBid {
    pub request_id: String,
    pub cpm: f64,
    pub width: u32,
    pub height: u32,
    pub ad: String,
    pub ttl: u32,
    pub currency: String,
    pub net_revenue: bool,
    pub creative_id: String,
    pub extra: Map<String, Value>,
}

impl NormalizedBid {
    /// 合并后的线上表示
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "requestId": self.request_id,
            "cpm": self.cpm,
            "width": self.width,
            "height": self.height,
            "ad": self.ad,
            "ttl": self.ttl,
            "currency": self.currency,
            "netRevenue": self.net_revenue,
            "creativeId": self.creative_id,
        });
        if let Value::Object(ref mut map) = value {
            for (key, extra) in &self.extra {
                map.insert(key.clone(), extra.clone());
            }
        }
        value
    }
}

impl Serialize for NormalizedBid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
