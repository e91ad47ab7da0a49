// src/config/adapter_config.rs

use std::fs;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};

/// 供应商内置默认值
pub static VENDOR_DEFAULTS: Lazy<AdapterConfig> = Lazy::new(|| AdapterConfig {
    bidder_code: "bannerx".to_string(),
    endpoint: EndpointDefaults {
        host: "bid.bannerx-exchange.com".to_string(),
        path: "prebid".to_string(),
    },
    sync_url: "https://sync.bannerx-exchange.com/usersync.html".to_string(),
    ttl: 300,
    currency: "EUR".to_string(),
    net_revenue: true,
});

/// 适配器配置，文件中缺省的字段取供应商默认值
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterConfig {
    pub bidder_code: String,
    pub endpoint: EndpointDefaults,
    /// iframe 用户同步页面
    pub sync_url: String,
    /// 出价有效期（秒）
    pub ttl: u32,
    pub currency: String,
    pub net_revenue: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointDefaults {
    pub host: String,
    pub path: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        VENDOR_DEFAULTS.clone()
    }
}

impl Default for EndpointDefaults {
    fn default() -> Self {
        VENDOR_DEFAULTS.endpoint.clone()
    }
}

pub trait ConfigAdapter: Send + Sync {
    fn load(&self) -> Result<AdapterConfig>;
}

/// 从 JSON 文件读取配置
pub struct FileConfigAdapter {
    pub config_file: String,
}

impl FileConfigAdapter {
    pub fn new(config_file: &str) -> Self {
        Self {
            config_file: config_file.to_string(),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AdapterConfig> {
        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| AdapterError::Config(format!("{}: {}", self.config_file, e)))?;
        let config: AdapterConfig = serde_json::from_str(&content)?;
        if config.endpoint.host.is_empty() {
            return Err(AdapterError::Config("endpoint.host must not be empty".to_string()));
        }
        Ok(config)
    }
}
