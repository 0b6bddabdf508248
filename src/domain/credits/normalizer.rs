//! Event normalization - canonical purchase claims from provider payloads.
//!
//! Pure helpers that read user, package and credit amount out of Stripe
//! metadata, success URLs and minor-unit totals. The ordered fallback
//! between sources lives in the application layer; this module only knows
//! how to read each source.

use serde_json::Value;

use crate::domain::foundation::{PackageId, UserId};

use super::provider_event::Metadata;

const USER_KEYS: [&str; 2] = ["userId", "user_id"];
const PACKAGE_KEYS: [&str; 2] = ["packageId", "package_id"];
/// `creditsAmount` wins over the generic `amount`.
const AMOUNT_KEYS: [&str; 2] = ["creditsAmount", "amount"];
const PACKAGE_QUERY_KEYS: [&str; 2] = ["package_id", "packageId"];

/// Canonical `{user, package, amount}` triple extracted from an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseClaim {
    pub user_id: UserId,
    pub package_id: Option<PackageId>,
    /// Credits to grant. Always strictly positive.
    pub amount: i64,
}

impl PurchaseClaim {
    /// Builds a claim, rejecting non-positive amounts.
    pub fn new(user_id: UserId, package_id: Option<PackageId>, amount: i64) -> Option<Self> {
        (amount > 0).then_some(Self {
            user_id,
            package_id,
            amount,
        })
    }

    /// Fills in the package when the primary source did not carry one.
    pub fn or_package(mut self, package_id: Option<PackageId>) -> Self {
        if self.package_id.is_none() {
            self.package_id = package_id;
        }
        self
    }
}

/// Reads a claim from metadata.
///
/// Returns `None` unless both a user id and a positive amount are present.
pub fn claim_from_metadata(metadata: &Metadata) -> Option<PurchaseClaim> {
    let user_id = user_from_metadata(metadata)?;
    let amount = AMOUNT_KEYS
        .iter()
        .find_map(|key| metadata.get(*key).and_then(parse_credit_amount))?;
    let package_id = first_string(metadata, &PACKAGE_KEYS).and_then(|p| PackageId::new(p).ok());

    PurchaseClaim::new(user_id, package_id, amount)
}

/// User id carried in metadata, if any.
pub fn user_from_metadata(metadata: &Metadata) -> Option<UserId> {
    first_string(metadata, &USER_KEYS).and_then(|u| UserId::new(u).ok())
}

/// Interprets a metadata value as a whole number of credits.
///
/// Accepts JSON integers, integral floats, and strings holding either.
pub fn parse_credit_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

/// Converts a minor-unit total (cents) into credits. One credit per major unit.
pub fn minor_units_to_credits(minor_units: i64) -> i64 {
    minor_units / 100
}

/// Extracts `package_id` (or `packageId`) from a checkout success URL query.
pub fn package_from_success_url(success_url: &str) -> Option<PackageId> {
    let url = url::Url::parse(success_url).ok()?;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    PACKAGE_QUERY_KEYS.iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| PackageId::new(v.clone()).ok())
    })
}

fn first_string(metadata: &Metadata, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match metadata.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("metadata must be an object"),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Metadata Claim Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn reads_camel_case_keys() {
        let claim = claim_from_metadata(&metadata(json!({
            "userId": "u1", "packageId": "pkg_20", "creditsAmount": "20"
        })))
        .unwrap();

        assert_eq!(claim.user_id.as_str(), "u1");
        assert_eq!(claim.package_id.unwrap().as_str(), "pkg_20");
        assert_eq!(claim.amount, 20);
    }

    #[test]
    fn reads_snake_case_keys() {
        let claim = claim_from_metadata(&metadata(json!({
            "user_id": "u2", "package_id": "pkg_5", "amount": "5"
        })))
        .unwrap();

        assert_eq!(claim.user_id.as_str(), "u2");
        assert_eq!(claim.amount, 5);
    }

    #[test]
    fn credits_amount_is_preferred_over_amount() {
        let claim = claim_from_metadata(&metadata(json!({
            "userId": "u1", "amount": "1999", "creditsAmount": "20"
        })))
        .unwrap();

        assert_eq!(claim.amount, 20);
    }

    #[test]
    fn missing_package_is_not_fatal() {
        let claim =
            claim_from_metadata(&metadata(json!({"userId": "u1", "creditsAmount": 7}))).unwrap();
        assert!(claim.package_id.is_none());
    }

    #[test]
    fn missing_user_yields_nothing() {
        assert!(claim_from_metadata(&metadata(json!({"creditsAmount": "10"}))).is_none());
    }

    #[test]
    fn missing_amount_yields_nothing() {
        assert!(claim_from_metadata(&metadata(json!({"userId": "u1"}))).is_none());
    }

    #[test]
    fn non_positive_amount_yields_nothing() {
        assert!(claim_from_metadata(&metadata(json!({"userId": "u1", "amount": "0"}))).is_none());
        assert!(claim_from_metadata(&metadata(json!({"userId": "u1", "amount": "-4"}))).is_none());
    }

    #[test]
    fn or_package_only_fills_gaps() {
        let pkg = |s: &str| PackageId::new(s).ok();
        let claim = PurchaseClaim::new(UserId::new("u").unwrap(), pkg("a"), 1).unwrap();
        assert_eq!(claim.or_package(pkg("b")).package_id, pkg("a"));

        let claim = PurchaseClaim::new(UserId::new("u").unwrap(), None, 1).unwrap();
        assert_eq!(claim.or_package(pkg("b")).package_id, pkg("b"));
    }

    // ══════════════════════════════════════════════════════════════
    // Amount Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_integers_and_integral_floats() {
        assert_eq!(parse_credit_amount(&json!(10)), Some(10));
        assert_eq!(parse_credit_amount(&json!(10.0)), Some(10));
        assert_eq!(parse_credit_amount(&json!("10")), Some(10));
        assert_eq!(parse_credit_amount(&json!(" 10.0 ")), Some(10));
    }

    #[test]
    fn rejects_fractional_and_garbage_amounts() {
        assert_eq!(parse_credit_amount(&json!(10.5)), None);
        assert_eq!(parse_credit_amount(&json!("ten")), None);
        assert_eq!(parse_credit_amount(&json!(null)), None);
        assert_eq!(parse_credit_amount(&json!("NaN")), None);
    }

    #[test]
    fn minor_units_truncate_to_whole_credits() {
        assert_eq!(minor_units_to_credits(1000), 10);
        assert_eq!(minor_units_to_credits(1099), 10);
        assert_eq!(minor_units_to_credits(99), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Success URL Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn package_from_snake_case_query() {
        let pkg = package_from_success_url(
            "https://condo.example/credits/success?session_id=cs_1&package_id=pkg_10",
        );
        assert_eq!(pkg.unwrap().as_str(), "pkg_10");
    }

    #[test]
    fn package_from_camel_case_query() {
        let pkg = package_from_success_url("https://condo.example/ok?packageId=pkg_50");
        assert_eq!(pkg.unwrap().as_str(), "pkg_50");
    }

    #[test]
    fn package_absent_or_invalid_url() {
        assert!(package_from_success_url("https://condo.example/ok?session_id=cs_1").is_none());
        assert!(package_from_success_url("not a url").is_none());
    }

    proptest! {
        #[test]
        fn whole_major_units_convert_exactly(credits in 0i64..1_000_000) {
            prop_assert_eq!(minor_units_to_credits(credits * 100), credits);
        }

        #[test]
        fn stringified_integers_parse_back(n in 1i64..i64::MAX) {
            prop_assert_eq!(parse_credit_amount(&Value::String(n.to_string())), Some(n));
        }
    }
}
