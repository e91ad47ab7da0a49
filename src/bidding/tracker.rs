// src/bidding/tracker.rs

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// 发送追踪请求的协作者：只管发出，不等待结果
pub trait TrackingPixel: Send + Sync {
    fn fire(&self, url: &str);
}

/// 通过 reqwest 在后台任务中发出 GET
pub struct HttpTracker {
    client: Client,
}

impl HttpTracker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl TrackingPixel for HttpTracker {
    fn fire(&self, url: &str) {
        let Ok(handle) = Handle::try_current() else {
            warn!(url, "no async runtime available, tracking request dropped");
            return;
        };
        let client = self.client.clone();
        let url = url.to_string();
        handle.spawn(async move {
            match client.get(&url).send().await {
                Ok(resp) => debug!(url = %url, status = %resp.status(), "tracking request sent"),
                Err(e) => debug!(url = %url, error = %e, "tracking request failed"),
            }
        });
    }
}

/// 测试替身：记录所有被触发的 URL
#[cfg(test)]
#[derive(Default)]
pub struct RecordingTracker {
    pub fired: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingTracker {
    pub fn urls(&self) -> Vec<String> {
        self.fired.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl TrackingPixel for RecordingTracker {
    fn fire(&self, url: &str) {
        self.fired.lock().unwrap().push(url.to_string());
    }
}
