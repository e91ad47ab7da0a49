// src/bidding/user_sync.rs

use serde::{Deserialize, Serialize};

use crate::protocol::response::ServerResponse;

/// 宿主允许的同步方式
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    #[serde(default)]
    pub iframe_enabled: bool,
    /// 宿主会一并传入；本适配器只提供 iframe 同步，该值不参与判断
    #[serde(default)]
    pub pixel_enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    Iframe,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SyncDescriptor {
    #[serde(rename = "type")]
    pub sync_type: SyncType,
    pub url: String,
}

pub struct UserSyncProvider {
    sync_url: String,
}

impl UserSyncProvider {
    pub fn new(sync_url: &str) -> Self {
        Self {
            sync_url: sync_url.to_string(),
        }
    }

    /// iframe 同步开启且至少收到一个响应时返回固定的 iframe 同步页
    pub fn get_syncs(&self, options: &SyncOptions, responses: &[ServerResponse]) -> Vec<SyncDescriptor> {
        if options.iframe_enabled && !responses.is_empty() {
            vec![SyncDescriptor {
                sync_type: SyncType::Iframe,
                url: self.sync_url.clone(),
            }]
        } else {
            Vec::new()
        }
    }
}
