// src/bidding/response_interpreter.rs

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::bidding::tracker::TrackingPixel;
use crate::config::adapter_config::AdapterConfig;
use crate::protocol::payload::ServerRequest;
use crate::protocol::response::{NormalizedBid, ResponseBid, ServerResponse};

/// 把供应商响应转换为标准化出价
pub struct ResponseInterpreter<T: TrackingPixel> {
    tracker: T,
    ttl: u32,
    currency: String,
    net_revenue: bool,
}

impl<T: TrackingPixel> ResponseInterpreter<T> {
    pub fn new(config: &AdapterConfig, tracker: T) -> Self {
        Self {
            tracker,
            ttl: config.ttl,
            currency: config.currency.clone(),
            net_revenue: config.net_revenue,
        }
    }

    /// body 缺失、为空或不是对象时返回空列表。
    ///
    /// `tep` 存在时先触发一次追踪请求；只保留 bidId 属于原始请求的出价。
    pub fn interpret(&self, response: &ServerResponse, request: &ServerRequest) -> Vec<NormalizedBid> {
        let body = match response.body.as_ref() {
            Some(Value::Object(body)) if !body.is_empty() => body,
            _ => return Vec::new(),
        };

        if let Some(Value::String(tep)) = body.get("tep") {
            if !tep.is_empty() {
                self.tracker.fire(tep);
            }
        }

        let entries = match body.get("bids") {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                warn!(auction_id = %request.data.auction_id, kind = %json_kind(other), "response bids is not a list");
                return Vec::new();
            }
            None => {
                warn!(auction_id = %request.data.auction_id, "response without bids list (legacy redirect shape), no bids taken");
                return Vec::new();
            }
        };

        let requested: HashSet<&str> = request.data.bids.iter().map(|bid| bid.bid_id.as_str()).collect();

        entries
            .iter()
            .filter_map(|entry| match ResponseBid::deserialize(entry) {
                Ok(bid) => Some(bid),
                Err(e) => {
                    warn!(error = %e, "skipping malformed response bid");
                    None
                }
            })
            .filter(|bid| {
                let known = requested.contains(bid.bid_id.as_str());
                if !known {
                    warn!(bid_id = %bid.bid_id, "response bid does not match any requested bid");
                }
                known
            })
            .map(|bid| self.normalize(bid))
            .collect()
    }

    fn normalize(&self, bid: ResponseBid) -> NormalizedBid {
        NormalizedBid {
            request_id: bid.bid_id,
            cpm: bid.cpm,
            width: bid.width,
            height: bid.height,
            ad: bid.ad.unwrap_or_default(),
            ttl: self.ttl,
            currency: self.currency.clone(),
            net_revenue: self.net_revenue,
            creative_id: String::new(),
            extra: bid.bid_price_optimisation.unwrap_or_default(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
