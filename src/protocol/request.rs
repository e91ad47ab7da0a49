// src/protocol/request.rs

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::protocol::lenient;

/// 广告尺寸 `[width, height]`
pub type Size = [u32; 2];

/// 单个广告位的竞价请求（由宿主竞价框架传入）。
///
/// `params` 保留原始 JSON，校验器需要看到未经类型化的值；
/// 类型化后的参数通过 `params()` 延迟解析并缓存。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub bid_id: String,

    /// 供应商参数，原始 JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip)]
    pub params_detail: OnceCell<Option<BidParams>>,

    /// 结构化的媒体类型声明，例如 `{"banner": {"sizes": [[300, 250]]}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_types: Option<MediaTypes>,

    /// 旧版单一媒体类型字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// 广告单元代码，同时也是页面中广告容器的元素 id
    #[serde(default)]
    pub ad_unit_code: String,

    /// 旧版扁平尺寸字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<Size>>,

    /// 第三方身份数据：provider -> payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Map<String, Value>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MediaTypes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<BannerMediaType>,
    /// video / native 等其它声明，只用于判断是否"独占"非 banner 类型
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BannerMediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<Size>>,
}

/// 类型化后的供应商参数。
///
/// 只有 `sid` 是必需的；可选字段类型不符时按未设置处理，不影响整个请求。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidParams {
    /// 广告位 id
    pub sid: String,
    /// server-side auction type，只允许 1 或 2
    #[serde(default, deserialize_with = "lenient::ssat")]
    pub ssat: Option<u8>,
    /// A/B 测试标记
    #[serde(default, deserialize_with = "lenient::optional")]
    pub yl2: Option<bool>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub port: Option<EndpointPort>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub secure_port: Option<EndpointPort>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub path: Option<String>,
}

/// 端口覆盖值，发布方既可能写数字也可能写字符串
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EndpointPort {
    Number(u16),
    Text(String),
}

impl fmt::Display for EndpointPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointPort::Number(port) => write!(f, "{}", port),
            EndpointPort::Text(port) => f.write_str(port),
        }
    }
}

impl BidRequest {
    /// 解析并缓存类型化参数；`params` 缺失或无法解析时返回 None
    pub fn params(&self) -> Option<&BidParams> {
        self.params_detail
            .get_or_init(|| {
                self.params
                    .as_ref()
                    .and_then(|raw| BidParams::deserialize(raw).ok())
            })
            .as_ref()
    }

    /// 是否完全没有声明任何媒体类型（兼容旧版请求）
    pub fn declares_no_media_type(&self) -> bool {
        self.media_types.is_none() && self.media_type.is_none()
    }

    pub fn declares_banner(&self) -> bool {
        let structured = self
            .media_types
            .as_ref()
            .map(|types| types.banner.is_some())
            .unwrap_or(false);
        structured || self.media_type.as_deref() == Some("banner")
    }

    /// 优先使用 `mediaTypes.banner.sizes`，其次旧版 `sizes`，都没有则为空
    pub fn resolved_sizes(&self) -> Vec<Size> {
        self.media_types
            .as_ref()
            .and_then(|types| types.banner.as_ref())
            .and_then(|banner| banner.sizes.clone())
            .or_else(|| self.sizes.clone())
            .unwrap_or_default()
    }
}

/// 一次拍卖中同时提交的一批竞价请求
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BidderRequest {
    pub auction_id: String,
    /// 无法解析的单个请求会被丢弃，不影响同批其它请求
    #[serde(default, deserialize_with = "decodable_bids")]
    pub bids: Vec<BidRequest>,
    /// 拍卖开始时间（Unix 毫秒）
    pub auction_start: i64,
    /// 拍卖超时预算（毫秒）
    pub timeout: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gdpr_consent: Option<GdprConsent>,
}

fn decodable_bids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<BidRequest>, D::Error> {
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match BidRequest::deserialize(entry) {
            Ok(bid) => Some(bid),
            Err(e) => {
                warn!(index, error = %e, "bid request rejected, entry could not be decoded");
                None
            }
        })
        .collect())
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GdprConsent {
    #[serde(default)]
    pub consent_string: Option<String>,
    #[serde(default)]
    pub gdpr_applies: Option<bool>,
}
