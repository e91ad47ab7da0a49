// src/bidding/adapter.rs

use serde::{Deserialize, Serialize};

use crate::bidding::request_builder::RequestBuilder;
use crate::bidding::response_interpreter::ResponseInterpreter;
use crate::bidding::tracker::TrackingPixel;
use crate::bidding::user_sync::{SyncDescriptor, SyncOptions, UserSyncProvider};
use crate::bidding::validator;
use crate::config::adapter_config::AdapterConfig;
use crate::config::ambient::AmbientSignals;
use crate::environment::context::BrowsingContexts;
use crate::protocol::payload::ServerRequest;
use crate::protocol::request::{BidRequest, BidderRequest};
use crate::protocol::response::{NormalizedBid, ServerResponse};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Banner,
}

/// 注册到宿主竞价框架时暴露的信息
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfo {
    pub code: String,
    pub supported_media_types: Vec<MediaType>,
}

/// 宿主调用的适配器能力集合
pub trait BidAdapter: Send + Sync {
    fn info(&self) -> AdapterInfo;

    fn is_bid_request_valid(&self, bid: &BidRequest) -> bool;

    fn build_requests(
        &self,
        valid_bids: &[BidRequest],
        batch: &BidderRequest,
        contexts: &dyn BrowsingContexts,
        ambient: &AmbientSignals,
        now_ms: i64,
    ) -> ServerRequest;

    fn interpret_response(&self, response: &ServerResponse, request: &ServerRequest) -> Vec<NormalizedBid>;

    fn get_user_syncs(&self, options: &SyncOptions, responses: &[ServerResponse]) -> Vec<SyncDescriptor>;

    /// 保持原始顺序过滤出有效请求
    fn valid_bids(&self, batch: &BidderRequest) -> Vec<BidRequest> {
        batch
            .bids
            .iter()
            .filter(|bid| self.is_bid_request_valid(bid))
            .cloned()
            .collect()
    }
}

pub struct VendorAdapter<T: TrackingPixel> {
    code: String,
    builder: RequestBuilder,
    interpreter: ResponseInterpreter<T>,
    syncs: UserSyncProvider,
}

impl<T: TrackingPixel> VendorAdapter<T> {
    pub fn new(config: &AdapterConfig, tracker: T) -> Self {
        Self {
            code: config.bidder_code.clone(),
            builder: RequestBuilder::new(config.endpoint.clone()),
            interpreter: ResponseInterpreter::new(config, tracker),
            syncs: UserSyncProvider::new(&config.sync_url),
        }
    }
}

impl<T: TrackingPixel> BidAdapter for VendorAdapter<T> {
    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            code: self.code.clone(),
            supported_media_types: vec![MediaType::Banner],
        }
    }

    fn is_bid_request_valid(&self, bid: &BidRequest) -> bool {
        validator::is_valid(bid)
    }

    fn build_requests(
        &self,
        valid_bids: &[BidRequest],
        batch: &BidderRequest,
        contexts: &dyn BrowsingContexts,
        ambient: &AmbientSignals,
        now_ms: i64,
    ) -> ServerRequest {
        self.builder.build(valid_bids, batch, contexts, ambient, now_ms)
    }

    fn interpret_response(&self, response: &ServerResponse, request: &ServerRequest) -> Vec<NormalizedBid> {
        self.interpreter.interpret(response, request)
    }

    fn get_user_syncs(&self, options: &SyncOptions, responses: &[ServerResponse]) -> Vec<SyncDescriptor> {
        self.syncs.get_syncs(options, responses)
    }
}
