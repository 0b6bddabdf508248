//! Stripe webhook event types.
//!
//! The raw envelope is parsed first, then classified into a [`ProviderEvent`]
//! whose variants carry their own typed payload. Only fields relevant to
//! credit reconciliation are captured; everything else Stripe sends is ignored.

use serde::{Deserialize, Serialize};

use super::webhook_errors::WebhookError;

/// Free-form metadata attached to Stripe objects.
///
/// Stripe always sends strings, but manually crafted events and older API
/// versions have been seen with numbers, so values stay untyped here.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

/// Event types the router dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    /// Checkout session completed.
    CheckoutSessionCompleted,
    /// Payment intent succeeded.
    PaymentIntentSucceeded,
    /// Anything else; acknowledged but not processed.
    Unsupported,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            _ => Self::Unsupported,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::Unsupported => "unsupported",
        }
    }
}

/// `data.object` of a `checkout.session.completed` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Session id (cs_xxx). Used as the idempotency key.
    pub id: String,

    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,

    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Set to the buyer's user id when the session was created.
    #[serde(default)]
    pub client_reference_id: Option<String>,

    /// Session total in minor currency units.
    #[serde(default)]
    pub amount_total: Option<i64>,

    /// Payment intent id (pi_xxx) backing the session.
    #[serde(default)]
    pub payment_intent: Option<String>,

    #[serde(default)]
    pub success_url: Option<String>,
}

impl CheckoutSessionObject {
    /// Whether the provider reports the session as paid.
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    /// Metadata map, if present and non-empty.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref().filter(|m| !m.is_empty())
    }

    /// Client reference, ignoring blank values.
    pub fn client_reference(&self) -> Option<&str> {
        self.client_reference_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// `data.object` of a `payment_intent.succeeded` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PaymentIntentObject {
    /// Payment intent id (pi_xxx).
    pub id: String,

    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Amount captured in minor currency units.
    #[serde(default)]
    pub amount_received: Option<i64>,
}

impl PaymentIntentObject {
    /// Metadata map, if present and non-empty.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref().filter(|m| !m.is_empty())
    }
}

/// A provider event after classification.
///
/// Each supported variant owns its typed payload; dispatch matches on the
/// variant instead of probing untyped JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    CheckoutSessionCompleted {
        event_id: String,
        session: CheckoutSessionObject,
    },
    PaymentIntentSucceeded {
        event_id: String,
        intent: PaymentIntentObject,
    },
    Unsupported {
        event_id: String,
        event_type: String,
    },
}

impl ProviderEvent {
    /// Provider event id (evt_xxx).
    pub fn event_id(&self) -> &str {
        match self {
            ProviderEvent::CheckoutSessionCompleted { event_id, .. }
            | ProviderEvent::PaymentIntentSucceeded { event_id, .. }
            | ProviderEvent::Unsupported { event_id, .. } => event_id,
        }
    }

    /// Stripe event type string.
    pub fn event_type(&self) -> &str {
        match self {
            ProviderEvent::CheckoutSessionCompleted { .. } => {
                StripeEventType::CheckoutSessionCompleted.as_str()
            }
            ProviderEvent::PaymentIntentSucceeded { .. } => {
                StripeEventType::PaymentIntentSucceeded.as_str()
            }
            ProviderEvent::Unsupported { event_type, .. } => event_type,
        }
    }
}

impl StripeEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }

    /// Deserialize `data.object` into the payload type of this event.
    ///
    /// # Errors
    ///
    /// `ParseError` when a supported event carries an object that does not
    /// match its schema.
    pub fn classify(self) -> Result<ProviderEvent, WebhookError> {
        match self.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => {
                let session: CheckoutSessionObject = serde_json::from_value(self.data.object)
                    .map_err(|e| {
                        WebhookError::ParseError(format!("invalid checkout session: {}", e))
                    })?;
                Ok(ProviderEvent::CheckoutSessionCompleted {
                    event_id: self.id,
                    session,
                })
            }
            StripeEventType::PaymentIntentSucceeded => {
                let intent: PaymentIntentObject = serde_json::from_value(self.data.object)
                    .map_err(|e| {
                        WebhookError::ParseError(format!("invalid payment intent: {}", e))
                    })?;
                Ok(ProviderEvent::PaymentIntentSucceeded {
                    event_id: self.id,
                    intent,
                })
            }
            StripeEventType::Unsupported => Ok(ProviderEvent::Unsupported {
                event_id: self.id,
                event_type: self.event_type,
            }),
        }
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    object: serde_json::Value,
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            object: serde_json::json!({}),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: chrono::Utc::now().timestamp(),
            data: StripeEventData {
                object: self.object,
            },
            livemode: false,
        }
    }
}
