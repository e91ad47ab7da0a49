use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::bidding::adapter::AdapterInfo;
use crate::bidding::user_sync::{SyncDescriptor, SyncOptions};
use crate::config::ambient::AmbientSignals;
use crate::environment::frame_tree::FrameTree;
use crate::error::AdapterError;
use crate::logging::adapter_log::AdapterLog;
use crate::logging::runtime_logger::LogLevel;
use crate::protocol::payload::ServerRequest;
use crate::protocol::request::BidderRequest;
use crate::protocol::response::{NormalizedBid, ServerResponse};
use crate::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequestsBody {
    pub bidder_request: BidderRequest,
    #[serde(default)]
    pub environment: FrameTree,
    #[serde(default)]
    pub ambient: AmbientSignals,
}

#[derive(Deserialize, Debug)]
pub struct InterpretResponseBody {
    pub request: ServerRequest,
    #[serde(default)]
    pub response: ServerResponse,
}

#[derive(Deserialize, Debug)]
pub struct UserSyncsBody {
    #[serde(default)]
    pub options: SyncOptions,
    #[serde(default)]
    pub responses: Vec<ServerResponse>,
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = match self {
            AdapterError::Decode(_) | AdapterError::Serde(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// 请求体先用 simd-json 解析，再映射到具体类型
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AdapterError> {
    let mut buf = body.to_vec();
    let value: Value = simd_json::serde::from_slice(&mut buf).map_err(|e| AdapterError::Decode(e.to_string()))?;
    Ok(serde_json::from_value(value)?)
}

/// **校验整批请求并构建发往供应商的请求**，没有有效请求时返回 204
pub async fn handle_bid_requests(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AdapterError> {
    let body: BuildRequestsBody = decode_body(&body)?;
    let batch = &body.bidder_request;
    let mut adapter_log = AdapterLog::new("bid_requests_built", Some(batch.auction_id.as_str()));

    let valid_bids = state.adapter.valid_bids(batch);
    adapter_log.record_counts(batch.bids.len(), valid_bids.len(), "no_valid_bids");
    info!(
        call_id = %adapter_log.call_id,
        auction_id = %batch.auction_id,
        received = batch.bids.len(),
        valid = valid_bids.len(),
        "bid requests validated"
    );

    let response = if valid_bids.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let request = state.adapter.build_requests(
            &valid_bids,
            batch,
            &body.environment,
            &body.ambient,
            Utc::now().timestamp_millis(),
        );
        (StatusCode::OK, Json(request)).into_response()
    };

    state.runtime_logger.log_record(LogLevel::Info, &adapter_log).await;
    Ok(response)
}

/// **解析供应商响应**
pub async fn handle_bid_response(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Vec<NormalizedBid>>, AdapterError> {
    let body: InterpretResponseBody = decode_body(&body)?;
    let auction_id = &body.request.data.auction_id;
    let mut adapter_log = AdapterLog::new("bid_response_interpreted", Some(auction_id.as_str()));

    let bids = state.adapter.interpret_response(&body.response, &body.request);
    let offered = body
        .response
        .body
        .as_ref()
        .and_then(|b| b.get("bids"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    adapter_log.record_counts(offered, bids.len(), "no_bids");
    info!(call_id = %adapter_log.call_id, auction_id = %auction_id, bids = bids.len(), "bid response interpreted");

    state.runtime_logger.log_record(LogLevel::Info, &adapter_log).await;
    Ok(Json(bids))
}

pub async fn handle_user_syncs(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Vec<SyncDescriptor>>, AdapterError> {
    let body: UserSyncsBody = decode_body(&body)?;
    let syncs = state.adapter.get_user_syncs(&body.options, &body.responses);

    let mut adapter_log = AdapterLog::new("user_syncs", None);
    adapter_log.record_counts(body.responses.len(), syncs.len(), "no_sync");
    state.runtime_logger.log_record(LogLevel::Debug, &adapter_log).await;
    Ok(Json(syncs))
}

pub async fn handle_adapter_info(State(state): State<Arc<AppState>>) -> Json<AdapterInfo> {
    Json(state.adapter.info())
}
