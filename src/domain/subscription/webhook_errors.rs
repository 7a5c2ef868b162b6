//! Webhook error types for provider callbacks.
//!
//! Status codes drive provider retry behavior:
//! - 2xx: acknowledged, no retry
//! - 4xx: rejected, no retry
//! - 5xx: provider retries later

use axum::http::StatusCode;
use thiserror::Error;

use super::PaymentProvider;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No known signature header was present.
    #[error("Unrecognized provider")]
    UnrecognizedProvider,

    /// Signature headers from more than one scheme were present.
    #[error("Conflicting signature headers")]
    ConflictingSchemes,

    /// Signature verification failed.
    ///
    /// Carries both values for the security log. Display never shows them.
    #[error("Invalid signature")]
    InvalidSignature { expected: String, received: String },

    /// Signed timestamp is outside the configured replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// A header the detected scheme requires is absent.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Failed to parse the payload or a header value.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the verified payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Verified payload references an order id that cannot be routed.
    #[error("Invalid order id: {0}")]
    InvalidOrderId(String),

    /// Order id prefix belongs to a different provider than the signature scheme.
    #[error("Order {order_id} does not belong to {provider}")]
    ProviderMismatch {
        provider: PaymentProvider,
        order_id: String,
    },

    /// The server has no secret for the detected scheme.
    #[error("Webhook verification is not configured for {0}")]
    NotConfigured(PaymentProvider),

    /// The account referenced by the order does not exist.
    #[error("Account not found")]
    AccountNotFound,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::NotConfigured(_))
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::UnrecognizedProvider => "UNRECOGNIZED_PROVIDER",
            WebhookError::ConflictingSchemes => "CONFLICTING_SIGNATURE_HEADERS",
            WebhookError::InvalidSignature { .. } => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::MissingHeader(_) => "MISSING_HEADER",
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::InvalidOrderId(_) => "INVALID_ORDER_ID",
            WebhookError::ProviderMismatch { .. } => "PROVIDER_MISMATCH",
            WebhookError::NotConfigured(_) => "WEBHOOK_NOT_CONFIGURED",
            WebhookError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures - don't retry
            WebhookError::InvalidSignature { .. } | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Bad request - don't retry
            WebhookError::UnrecognizedProvider
            | WebhookError::ConflictingSchemes
            | WebhookError::MissingHeader(_)
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_)
            | WebhookError::InvalidOrderId(_)
            | WebhookError::ProviderMismatch { .. } => StatusCode::BAD_REQUEST,

            WebhookError::AccountNotFound => StatusCode::NOT_FOUND,

            // Server errors - will retry
            WebhookError::NotConfigured(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this failure belongs in the security log.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature { .. } | WebhookError::TimestampOutOfRange
        )
    }
}
