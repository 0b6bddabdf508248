//! Stripe REST API response types.
//!
//! Only the fields this service reads are modelled; Stripe adds fields
//! freely, so unknown ones are ignored.

use serde::Deserialize;

use crate::domain::credits::CheckoutSessionObject;
use crate::ports::{CheckoutSession, LineItem};

/// Stripe list envelope (`{"object": "list", "data": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

/// Response of `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCreatedSession {
    pub id: String,

    /// Hosted checkout URL. Absent for embedded sessions.
    #[serde(default)]
    pub url: Option<String>,
}

impl StripeCreatedSession {
    pub fn into_checkout_session(self) -> Option<CheckoutSession> {
        let url = self.url?;
        Some(CheckoutSession { id: self.id, url })
    }
}

/// Item of `GET /v1/checkout/sessions/{id}/line_items`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeLineItem {
    pub id: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub quantity: Option<i64>,

    #[serde(default)]
    pub amount_total: i64,
}

impl From<StripeLineItem> for LineItem {
    fn from(item: StripeLineItem) -> Self {
        LineItem {
            id: item.id,
            description: item.description,
            quantity: item.quantity,
            amount_total: item.amount_total,
        }
    }
}

/// Session listing item. Same shape as the webhook object.
pub type StripeSessionList = StripeList<CheckoutSessionObject>;

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// `api_error`, `card_error`, `invalid_request_error`, ...
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn line_item_list_deserializes() {
        let list: StripeList<StripeLineItem> = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {"id": "li_1", "object": "item", "amount_total": 1000, "quantity": 1, "currency": "usd"}
            ],
            "has_more": false,
            "url": "/v1/checkout/sessions/cs_1/line_items"
        }))
        .unwrap();

        let item: LineItem = list.data.into_iter().next().unwrap().into();
        assert_eq!(item.amount_total, 1000);
        assert_eq!(item.quantity, Some(1));
    }

    #[test]
    fn session_without_url_is_not_hosted() {
        let created: StripeCreatedSession =
            serde_json::from_value(json!({"id": "cs_1", "url": null})).unwrap();
        assert!(created.into_checkout_session().is_none());
    }

    #[test]
    fn error_body_deserializes() {
        let body: StripeErrorBody = serde_json::from_value(json!({
            "error": {"type": "invalid_request_error", "code": "resource_missing", "message": "No such checkout session"}
        }))
        .unwrap();

        assert_eq!(body.error.code.as_deref(), Some("resource_missing"));
        assert_eq!(body.error.error_type.as_deref(), Some("invalid_request_error"));
    }
}
