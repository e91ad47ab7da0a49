use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// **适配器调用日志**，每次宿主调用记录一条
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdapterLog {
    pub timestamp: String,
    pub call_id: String,           // 本次调用的唯一标识（uuid v4）
    pub log_type: String,          // "bid_requests_built" / "bid_response_interpreted" / "user_syncs"
    pub auction_id: Option<String>,
    pub received: usize,           // 收到的请求或响应出价数
    pub accepted: usize,           // 通过校验或被采纳的数量
    pub status: String,            // "success" / "no_valid_bids" / "no_bids"
}

impl AdapterLog {
    pub fn new(log_type: &str, auction_id: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            call_id: Uuid::new_v4().to_string(),
            log_type: log_type.to_string(),
            auction_id: auction_id.map(str::to_string),
            received: 0,
            accepted: 0,
            status: "success".to_string(),
        }
    }

    /// **记录数量**，没有任何被采纳时把状态置为 `empty_status`
    pub fn record_counts(&mut self, received: usize, accepted: usize, empty_status: &str) {
        self.received = received;
        self.accepted = accepted;
        if accepted == 0 {
            self.status = empty_status.to_string();
        }
    }
}
