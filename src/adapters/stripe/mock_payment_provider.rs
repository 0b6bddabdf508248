//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured line items and sessions per payment intent
//! - Error injection
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::credits::CheckoutSessionObject;
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, LineItem, PaymentError, PaymentProvider,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.set_line_items("cs_123", vec![MockPaymentProvider::line_item(1000)]);
/// mock.set_method_error("list_line_items", PaymentError::timeout("slow"));
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Line items by checkout session id.
    line_items: HashMap<String, Vec<LineItem>>,

    /// Sessions by payment intent id.
    sessions_by_intent: HashMap<String, Vec<CheckoutSessionObject>>,

    /// Next checkout session to return.
    next_checkout: Option<CheckoutSession>,

    /// Checkout requests received, in order.
    checkout_requests: Vec<CreateCheckoutRequest>,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with no configured data.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Line items returned for a checkout session.
    pub fn set_line_items(&self, session_id: &str, items: Vec<LineItem>) {
        self.state().line_items.insert(session_id.to_string(), items);
    }

    /// Register a session as backing a payment intent.
    pub fn add_session_for_intent(&self, payment_intent_id: &str, session: CheckoutSessionObject) {
        self.state()
            .sessions_by_intent
            .entry(payment_intent_id.to_string())
            .or_default()
            .push(session);
    }

    /// Set the checkout session to return.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.state().next_checkout = Some(session);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Line item helper with a given total in minor units.
    pub fn line_item(amount_total: i64) -> LineItem {
        LineItem {
            id: format!("li_mock_{}", amount_total),
            description: None,
            quantity: Some(1),
            amount_total,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Checkout requests received so far.
    pub fn checkout_requests(&self) -> Vec<CreateCheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // global error is consumed
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![
                request.user_id.to_string(),
                request.package_id.to_string(),
                request.price_minor_units.to_string(),
            ],
        );
        self.check_error("create_checkout_session")?;

        let mut state = self.state();
        state.checkout_requests.push(request);

        let session = state.next_checkout.take().unwrap_or_else(|| {
            let id = format!("cs_mock_{}", state.checkout_requests.len());
            CheckoutSession {
                url: format!("https://checkout.stripe.com/c/pay/{}", id),
                id,
            }
        });

        Ok(session)
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, PaymentError> {
        self.record_call("list_line_items", vec![session_id.to_string()]);
        self.check_error("list_line_items")?;

        Ok(self
            .state()
            .line_items
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_sessions_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<CheckoutSessionObject>, PaymentError> {
        self.record_call(
            "find_sessions_by_payment_intent",
            vec![payment_intent_id.to_string()],
        );
        self.check_error("find_sessions_by_payment_intent")?;

        Ok(self
            .state()
            .sessions_by_intent
            .get(payment_intent_id)
            .cloned()
            .unwrap_or_default())
    }
}
