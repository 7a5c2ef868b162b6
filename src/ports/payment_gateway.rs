//! Payment gateway port for external payment providers.
//!
//! One implementation per provider. Each normalizes its HTTP failures into
//! [`GatewayError`] before anything reaches the application layer, so
//! callers never see a raw transport error.
//!
//! # Design
//!
//! - **Fail closed**: missing credentials surface as `Configuration`, never as success
//! - **Retry safety**: `OrderCreationFailed` is safe to retry, `Ambiguous` is not
//! - **No guessing**: anything a provider cannot confirm is `Inconclusive`

use crate::domain::subscription::{Order, PaymentProvider, SubscriptionError};
use async_trait::async_trait;
use serde::Serialize;

/// Port for a single payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider this gateway talks to.
    fn provider(&self) -> PaymentProvider;

    /// Register the order with the provider.
    ///
    /// Returns where the client should send the user to pay.
    async fn create_order(&self, order: &Order) -> Result<OrderResult, GatewayError>;

    /// Ask the provider whether the order has been paid.
    ///
    /// Transport problems during verification are reported as
    /// [`PaymentOutcome::Inconclusive`], not as errors.
    async fn verify_order(&self, order_id: &str) -> Result<PaymentOutcome, GatewayError>;
}

/// Provider's acknowledgement of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    /// Our order id, echoed back.
    pub order_id: String,

    /// Where the client continues the payment.
    pub checkout: CheckoutTarget,
}

/// How the client continues to the provider's payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutTarget {
    /// Session token for the provider's client-side checkout SDK.
    PaymentSession { payment_session_id: String },

    /// Provider-hosted page to redirect to.
    Redirect { url: String },

    /// Static payment page; confirmation is manual.
    PaymentLink { url: String },
}

/// What a provider reports about an order's payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// At least one payment for the order succeeded.
    Succeeded { provider_transaction_id: Option<String> },

    /// The provider has payment records and none succeeded.
    Failed { reason: String },

    /// Cannot tell yet.
    Inconclusive { reason: String },

    /// Only an operator can confirm this payment.
    ManualReviewRequired,
}

/// Normalized provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub provider: PaymentProvider,
    pub kind: GatewayErrorKind,
    /// Raw diagnostic text. Not for end users in production.
    pub message: String,
    /// Provider's own error code, if it sent one.
    pub provider_code: Option<String>,
}

/// Category of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Credentials missing or unusable.
    Configuration,

    /// The provider definitely did not create the order.
    OrderCreationFailed,

    /// The request may have reached the provider; outcome unknown.
    Ambiguous,
}

impl GatewayError {
    pub fn new(provider: PaymentProvider, kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn configuration(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorKind::Configuration, message)
    }

    pub fn order_creation_failed(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorKind::OrderCreationFailed, message)
    }

    pub fn ambiguous(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorKind::Ambiguous, message)
    }

    /// Attach the provider's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Whether repeating the request cannot double-charge.
    pub fn is_retryable(&self) -> bool {
        self.kind == GatewayErrorKind::OrderCreationFailed
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}: {}", self.provider, self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for SubscriptionError {
    fn from(err: GatewayError) -> Self {
        let detail = match &err.provider_code {
            Some(code) => format!("{} ({})", err.message, code),
            None => err.message.clone(),
        };
        match err.kind {
            GatewayErrorKind::Configuration => SubscriptionError::provider_unavailable(err.provider),
            GatewayErrorKind::OrderCreationFailed => {
                SubscriptionError::order_creation_failed(err.provider, detail)
            }
            GatewayErrorKind::Ambiguous => SubscriptionError::ambiguous(err.provider, detail),
        }
    }
}
