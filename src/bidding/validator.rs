// src/bidding/validator.rs

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::protocol::lenient::ssat_code;
use crate::protocol::request::BidRequest;

/// 被拒绝的原因，每条规则对应一个变体
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("only banner is supported, declared media types exclude it")]
    UnsupportedMediaType,

    #[error("params must be an object")]
    MissingParams,

    #[error("params.sid must be a string")]
    InvalidSid,

    #[error("params.ssat must be 1 or 2, got {0}")]
    InvalidSsat(Value),
}

/// 按顺序检查规则，第一条不满足的规则即为结果
pub fn validate(bid: &BidRequest) -> Result<(), Rejection> {
    if !bid.declares_no_media_type() && !bid.declares_banner() {
        return Err(Rejection::UnsupportedMediaType);
    }

    let params = match bid.params.as_ref() {
        Some(Value::Object(params)) => params,
        _ => return Err(Rejection::MissingParams),
    };

    if !matches!(params.get("sid"), Some(Value::String(_))) {
        return Err(Rejection::InvalidSid);
    }

    if let Some(ssat) = params.get("ssat") {
        if ssat_code(ssat).is_none() {
            return Err(Rejection::InvalidSsat(ssat.clone()));
        }
    }

    Ok(())
}

/// 只报告 true/false，排除无效请求由调用方负责
pub fn is_valid(bid: &BidRequest) -> bool {
    match validate(bid) {
        Ok(()) => true,
        Err(rejection) => {
            warn!(bid_id = %bid.bid_id, reason = %rejection, "bid request rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn bid(value: Value) -> BidRequest {
        serde_json::from_value(value).unwrap()
    }

    fn with_params(params: Value) -> BidRequest {
        bid(json!({"bidId": "b1", "adUnitCode": "div-1", "params": params}))
    }

    #[test]
    fn accepts_minimal_banner_request() {
        assert!(is_valid(&with_params(json!({"sid": "1234"}))));
        assert!(is_valid(&bid(json!({
            "bidId": "b1",
            "mediaTypes": {"banner": {"sizes": [[300, 250]]}, "video": {}},
            "params": {"sid": "1234"}
        }))));
        assert!(is_valid(&bid(json!({"bidId": "b1", "mediaType": "banner", "params": {"sid": "1"}}))));
    }

    #[test]
    fn rejects_exclusive_non_banner_declarations() {
        let video = bid(json!({"bidId": "b1", "mediaTypes": {"video": {}}, "params": {"sid": "1"}}));
        assert_eq!(validate(&video), Err(Rejection::UnsupportedMediaType));

        let legacy_native = bid(json!({"bidId": "b1", "mediaType": "native", "params": {"sid": "1"}}));
        assert_eq!(validate(&legacy_native), Err(Rejection::UnsupportedMediaType));
    }

    #[test]
    fn rejects_missing_or_non_object_params() {
        assert_eq!(validate(&bid(json!({"bidId": "b1"}))), Err(Rejection::MissingParams));
        assert_eq!(validate(&with_params(json!(null))), Err(Rejection::MissingParams));
        assert_eq!(validate(&with_params(json!("sid"))), Err(Rejection::MissingParams));
    }

    #[test]
    fn mistyped_optional_params_do_not_reject() {
        for params in [
            json!({"sid": "1", "yl2": "yes"}),
            json!({"sid": "1", "host": 5}),
            json!({"sid": "1", "port": 70000}),
        ] {
            let request = with_params(params);
            assert_eq!(validate(&request), Ok(()));
            assert!(request.params().is_some());
        }
    }

    #[test]
    fn ssat_is_compared_numerically() {
        assert_eq!(validate(&with_params(json!({"sid": "1", "ssat": 1.0}))), Ok(()));
        assert_eq!(
            validate(&with_params(json!({"sid": "1", "ssat": 1.5}))),
            Err(Rejection::InvalidSsat(json!(1.5)))
        );
        assert_eq!(
            validate(&with_params(json!({"sid": "1", "ssat": "1"}))),
            Err(Rejection::InvalidSsat(json!("1")))
        );
    }

    #[test]
    fn media_type_rule_short_circuits_params_rules() {
        let both_broken = bid(json!({"bidId": "b1", "mediaTypes": {"native": {}}}));
        assert_eq!(validate(&both_broken), Err(Rejection::UnsupportedMediaType));
    }

    proptest! {
        #[test]
        fn non_string_sid_is_rejected(sid in prop_oneof![
            any::<i64>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(|b| json!(b)),
            Just(json!(null)),
            Just(json!([])),
        ]) {
            let request = with_params(json!({"sid": sid}));
            prop_assert!(!is_valid(&request));
        }

        #[test]
        fn any_string_sid_is_accepted(sid in "[a-zA-Z0-9]{0,12}") {
            let request = with_params(json!({"sid": sid}));
            prop_assert!(is_valid(&request));
        }

        #[test]
        fn ssat_outside_one_and_two_is_rejected(ssat in any::<i64>().prop_filter("valid ssat", |n| *n != 1 && *n != 2)) {
            let request = with_params(json!({"sid": "1", "ssat": ssat}));
            prop_assert!(!is_valid(&request));
        }

        #[test]
        fn ssat_one_or_two_is_accepted(ssat in 1u8..=2, as_float in any::<bool>()) {
            let value = if as_float { json!(f64::from(ssat)) } else { json!(ssat) };
            let request = with_params(json!({"sid": "1", "ssat": value}));
            prop_assert!(is_valid(&request));
            prop_assert_eq!(request.params().and_then(|params| params.ssat), Some(ssat));
        }
    }
}
