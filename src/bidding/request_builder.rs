// src/bidding/request_builder.rs

use tracing::debug;

use crate::config::adapter_config::EndpointDefaults;
use crate::config::ambient::AmbientSignals;
use crate::environment::context::BrowsingContexts;
use crate::environment::probe::EnvironmentProbe;
use crate::protocol::payload::{GdprSignal, HttpMethod, OutboundPayload, PayloadBid, ServerRequest, UserIds};
use crate::protocol::request::{BidParams, BidRequest, BidderRequest, GdprConsent};

const DEFAULT_SSAT: u8 = 2;

/// 把通过校验的请求组装成一次发往供应商的 POST
pub struct RequestBuilder {
    endpoint: EndpointDefaults,
}

impl RequestBuilder {
    pub fn new(endpoint: EndpointDefaults) -> Self {
        Self { endpoint }
    }

    /// `valid_bids` 必须保持原始顺序；`now_ms` 为当前 Unix 毫秒
    pub fn build<C: BrowsingContexts + ?Sized>(
        &self,
        valid_bids: &[BidRequest],
        batch: &BidderRequest,
        contexts: &C,
        ambient: &AmbientSignals,
        now_ms: i64,
    ) -> ServerRequest {
        let probe = EnvironmentProbe::new(contexts);
        let first_original = batch.bids.first();

        let bids = valid_bids
            .iter()
            .map(|bid| PayloadBid {
                bid_id: bid.bid_id.clone(),
                sid: bid.params().map(|params| params.sid.clone()).unwrap_or_default(),
                sizes: bid.resolved_sizes(),
                is_in_view: probe.is_element_in_view(&bid.ad_unit_code),
            })
            .collect();

        let payload = OutboundPayload {
            auction_id: batch.auction_id.clone(),
            bids,
            referrer: probe.top_referrer(),
            secure: probe.is_secure(),
            mpa: probe.is_main_page_accessible(),
            timeout: remaining_timeout(batch, now_ms),
            ssat: resolve_ssat(valid_bids),
            yl2: resolve_yl2(valid_bids, ambient),
            ab: ambient.ab_test.clone(),
            user: first_original
                .and_then(|bid| bid.user_id.clone())
                .filter(|euids| !euids.is_empty())
                .map(|euids| UserIds { euids }),
            gdpr: batch.gdpr_consent.as_ref().and_then(gdpr_signal),
        };

        let url = self.endpoint_url(first_original.and_then(BidRequest::params));
        debug!(auction_id = %payload.auction_id, url = %url, bids = payload.bids.len(), "outbound request assembled");

        ServerRequest {
            method: HttpMethod::Post,
            url,
            data: payload,
        }
    }

    /// 协议固定为 https；securePort 优先于 port
    fn endpoint_url(&self, overrides: Option<&BidParams>) -> String {
        let host = overrides
            .and_then(|params| params.host.as_deref())
            .unwrap_or(self.endpoint.host.as_str());
        let path = overrides
            .and_then(|params| params.path.as_deref())
            .unwrap_or(self.endpoint.path.as_str())
            .trim_start_matches('/');
        let port = overrides
            .and_then(|params| params.secure_port.as_ref().or(params.port.as_ref()))
            .map(|port| format!(":{}", port))
            .unwrap_or_default();

        format!("https://{}{}/{}", host, port, path)
    }
}

/// 剩余超时预算，可以为负；宿主传入的极端值按饱和运算处理
fn remaining_timeout(batch: &BidderRequest, now_ms: i64) -> i64 {
    batch.timeout.saturating_sub(now_ms.saturating_sub(batch.auction_start))
}

/// 第一个显式设置 ssat 的请求胜出
fn resolve_ssat(valid_bids: &[BidRequest]) -> u8 {
    valid_bids
        .iter()
        .find_map(|bid| bid.params().and_then(|params| params.ssat))
        .unwrap_or(DEFAULT_SSAT)
}

/// 请求显式值 > 持久化标记 > false
fn resolve_yl2(valid_bids: &[BidRequest], ambient: &AmbientSignals) -> bool {
    valid_bids
        .iter()
        .find_map(|bid| bid.params().and_then(|params| params.yl2))
        .unwrap_or_else(|| ambient.yl2_flag())
}

fn gdpr_signal(consent: &GdprConsent) -> Option<GdprSignal> {
    match (&consent.consent_string, consent.gdpr_applies) {
        (Some(consent), Some(applies)) => Some(GdprSignal {
            consent: consent.clone(),
            applies,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::adapter_config::VENDOR_DEFAULTS;
    use crate::environment::context::Rect;
    use crate::environment::frame_tree::{FrameSnapshot, FrameTree};
    use serde_json::{json, Value};

    const AUCTION_START: i64 = 10_000;
    const NOW: i64 = 13_500;

    fn bid(value: Value) -> BidRequest {
        serde_json::from_value(value).unwrap()
    }

    fn batch(bids: Vec<BidRequest>) -> BidderRequest {
        BidderRequest {
            auction_id: "auction-1".to_string(),
            bids,
            auction_start: AUCTION_START,
            timeout: 5000,
            gdpr_consent: None,
        }
    }

    fn page() -> FrameTree {
        FrameTree {
            current: 0,
            frames: vec![FrameSnapshot::page("https://pub.example", "https://pub.example/")
                .with_referrer("https://search.example/")
                .with_element("div-1", Rect { top: 0.0, bottom: 250.0 })
                .with_element("div-2", Rect { top: 3000.0, bottom: 3250.0 })],
        }
    }

    fn build(valid: &[BidRequest], batch: &BidderRequest, ambient: &AmbientSignals) -> ServerRequest {
        RequestBuilder::new(VENDOR_DEFAULTS.endpoint.clone()).build(valid, batch, &page(), ambient, NOW)
    }

    fn default_url() -> String {
        format!("https://{}/{}", VENDOR_DEFAULTS.endpoint.host, VENDOR_DEFAULTS.endpoint.path)
    }

    #[test]
    fn builds_payload_for_valid_bids_in_order() {
        let bids = vec![
            bid(json!({"bidId": "b1", "adUnitCode": "div-1", "params": {"sid": "11"},
                       "mediaTypes": {"banner": {"sizes": [[300, 250]]}}})),
            bid(json!({"bidId": "b2", "adUnitCode": "div-2", "params": {"sid": "22"}, "sizes": [[728, 90]]})),
            bid(json!({"bidId": "b3", "adUnitCode": "div-9", "params": {"sid": "33"}})),
        ];
        let request = build(&bids, &batch(bids.clone()), &AmbientSignals::default());

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, default_url());
        let data = &request.data;
        assert_eq!(data.auction_id, "auction-1");
        assert_eq!(data.timeout, 1500);
        assert_eq!(data.referrer.as_deref(), Some("https://search.example/"));
        assert!(data.secure);
        assert!(data.mpa);
        assert_eq!(data.ssat, 2);
        assert!(!data.yl2);

        let ids: Vec<_> = data.bids.iter().map(|b| b.bid_id.as_str()).collect();
        assert_eq!(ids, ["b1", "b2", "b3"]);
        assert_eq!(data.bids[0].sizes, vec![[300, 250]]);
        assert_eq!(data.bids[1].sizes, vec![[728, 90]]);
        assert_eq!(data.bids[0].is_in_view, Some(true));
        assert_eq!(data.bids[1].is_in_view, Some(false));
        assert_eq!(data.bids[2].is_in_view, None);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let bids = vec![bid(json!({"bidId": "b1", "adUnitCode": "missing", "params": {"sid": "1"}}))];
        let request = RequestBuilder::new(VENDOR_DEFAULTS.endpoint.clone()).build(
            &bids,
            &batch(bids.clone()),
            &FrameTree::default(),
            &AmbientSignals::default(),
            NOW,
        );
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["method"], json!("POST"));
        let data = wire["data"].as_object().unwrap();
        for key in ["ref", "ab", "user", "gdpr"] {
            assert!(!data.contains_key(key), "{} should be omitted", key);
        }
        assert!(!data["bids"][0].as_object().unwrap().contains_key("isInView"));
        assert_eq!(data["secure"], json!(false));
    }

    #[test]
    fn timeout_may_go_negative() {
        let bids = vec![bid(json!({"bidId": "b1", "params": {"sid": "1"}}))];
        let request = RequestBuilder::new(VENDOR_DEFAULTS.endpoint.clone()).build(
            &bids,
            &batch(bids.clone()),
            &page(),
            &AmbientSignals::default(),
            AUCTION_START + 6000,
        );
        assert_eq!(request.data.timeout, -1000);
    }

    #[test]
    fn timeout_saturates_on_extreme_host_values() {
        let bids = vec![bid(json!({"bidId": "b1", "params": {"sid": "1"}}))];
        let mut extreme = batch(bids.clone());
        extreme.auction_start = i64::MIN;
        let request = build(&bids, &extreme, &AmbientSignals::default());
        assert_eq!(request.data.timeout, 5000 - i64::MAX);

        extreme.timeout = i64::MIN;
        let request = build(&bids, &extreme, &AmbientSignals::default());
        assert_eq!(request.data.timeout, i64::MIN);
    }

    #[test]
    fn every_valid_bid_yields_one_entry_despite_mistyped_params() {
        let bids = vec![
            bid(json!({"bidId": "b1", "params": {"sid": "1", "yl2": "yes", "port": 70000}})),
            bid(json!({"bidId": "b2", "params": {"sid": "2", "host": 5, "ssat": 1.0}})),
        ];
        let request = build(&bids, &batch(bids.clone()), &AmbientSignals::default());
        let sids: Vec<_> = request.data.bids.iter().map(|b| b.sid.as_str()).collect();
        assert_eq!(sids, ["1", "2"]);
        assert_eq!(request.url, default_url());
        assert_eq!(request.data.ssat, 1);
        assert!(!request.data.yl2);
    }

    #[test]
    fn first_explicit_ssat_wins() {
        let bids = vec![
            bid(json!({"bidId": "b1", "params": {"sid": "1"}})),
            bid(json!({"bidId": "b2", "params": {"sid": "2", "ssat": 1}})),
            bid(json!({"bidId": "b3", "params": {"sid": "3", "ssat": 2}})),
        ];
        assert_eq!(build(&bids, &batch(bids.clone()), &AmbientSignals::default()).data.ssat, 1);
    }

    #[test]
    fn yl2_precedence() {
        let flagged = AmbientSignals {
            persisted_yl2: Some("1".to_string()),
            ab_test: None,
        };
        let unset = vec![bid(json!({"bidId": "b1", "params": {"sid": "1"}}))];
        assert!(build(&unset, &batch(unset.clone()), &flagged).data.yl2);
        assert!(!build(&unset, &batch(unset.clone()), &AmbientSignals::default()).data.yl2);

        let explicit = vec![
            bid(json!({"bidId": "b1", "params": {"sid": "1"}})),
            bid(json!({"bidId": "b2", "params": {"sid": "2", "yl2": false}})),
            bid(json!({"bidId": "b3", "params": {"sid": "3", "yl2": true}})),
        ];
        assert!(!build(&explicit, &batch(explicit.clone()), &flagged).data.yl2);

        let other_flag = AmbientSignals {
            persisted_yl2: Some("0".to_string()),
            ab_test: None,
        };
        assert!(!build(&unset, &batch(unset.clone()), &other_flag).data.yl2);
    }

    #[test]
    fn gdpr_requires_both_values_even_when_applies_is_false() {
        let bids = vec![bid(json!({"bidId": "b1", "params": {"sid": "1"}}))];
        let mut with_consent = batch(bids.clone());

        with_consent.gdpr_consent = Some(GdprConsent {
            consent_string: Some("BOJ/P2HOJ".to_string()),
            gdpr_applies: Some(false),
        });
        let gdpr = build(&bids, &with_consent, &AmbientSignals::default()).data.gdpr;
        assert_eq!(
            gdpr,
            Some(GdprSignal {
                consent: "BOJ/P2HOJ".to_string(),
                applies: false
            })
        );

        with_consent.gdpr_consent = Some(GdprConsent {
            consent_string: Some("BOJ/P2HOJ".to_string()),
            gdpr_applies: None,
        });
        assert!(build(&bids, &with_consent, &AmbientSignals::default()).data.gdpr.is_none());

        with_consent.gdpr_consent = Some(GdprConsent {
            consent_string: None,
            gdpr_applies: Some(true),
        });
        assert!(build(&bids, &with_consent, &AmbientSignals::default()).data.gdpr.is_none());
    }

    #[test]
    fn ab_and_euids_pass_through() {
        let bids = vec![
            bid(json!({"bidId": "b1", "params": {"sid": "1"}, "userId": {"id5id": {"uid": "ID5-abc"}}})),
            bid(json!({"bidId": "b2", "params": {"sid": "2"}, "userId": {"tdid": "ignored"}})),
        ];
        let ambient = AmbientSignals {
            persisted_yl2: None,
            ab_test: serde_json::from_value(json!({"variant": "B"})).unwrap(),
        };
        let data = build(&bids, &batch(bids.clone()), &ambient).data;

        assert_eq!(data.ab.unwrap()["variant"], json!("B"));
        let euids = data.user.unwrap().euids;
        assert_eq!(euids.len(), 1);
        assert_eq!(euids["id5id"]["uid"], json!("ID5-abc"));
    }

    #[test]
    fn empty_user_id_map_is_omitted() {
        let bids = vec![bid(json!({"bidId": "b1", "params": {"sid": "1"}, "userId": {}}))];
        assert!(build(&bids, &batch(bids.clone()), &AmbientSignals::default()).data.user.is_none());
    }

    #[test]
    fn port_override_without_secure_port() {
        let bids = vec![bid(json!({"bidId": "b1", "params": {"sid": "1", "port": 8080}}))];
        let url = build(&bids, &batch(bids.clone()), &AmbientSignals::default()).url;
        assert_eq!(
            url,
            format!("https://{}:8080/{}", VENDOR_DEFAULTS.endpoint.host, VENDOR_DEFAULTS.endpoint.path)
        );
    }

    #[test]
    fn secure_port_wins_over_port() {
        let bids = vec![bid(json!({"bidId": "b1",
            "params": {"sid": "1", "host": "test.bid.example", "port": 8080, "securePort": "8443", "path": "/custom"}}))];
        let url = build(&bids, &batch(bids.clone()), &AmbientSignals::default()).url;
        assert_eq!(url, "https://test.bid.example:8443/custom");
    }

    #[test]
    fn endpoint_comes_from_first_original_bid() {
        let invalid_first = bid(json!({"bidId": "b0", "mediaTypes": {"video": {}},
            "params": {"sid": "0", "host": "first.example"}}));
        let valid = bid(json!({"bidId": "b1", "params": {"sid": "1", "host": "second.example"}}));
        let request = build(
            std::slice::from_ref(&valid),
            &batch(vec![invalid_first, valid.clone()]),
            &AmbientSignals::default(),
        );
        assert!(request.url.starts_with("https://first.example/"));
        assert_eq!(request.data.bids.len(), 1);
    }
}
