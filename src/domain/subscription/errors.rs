//! Subscription-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | AccountNotFound | 404 |
//! | ReviewNotFound | 404 |
//! | InvalidOrderId | 400 |
//! | InvalidProvider | 400 |
//! | ValidationFailed | 400 |
//! | Forbidden | 403 |
//! | InvalidState | 409 |
//! | ProviderUnavailable | 503 |
//! | OrderCreationFailed | 502 |
//! | AmbiguousProviderFailure | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, ValidationError};

use super::PaymentProvider;

/// Errors raised by subscription purchase, verification and status operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No account exists with this id.
    AccountNotFound(AccountId),

    /// No pending manual review exists for this order.
    ReviewNotFound { order_id: String },

    /// The order id does not follow `<PREFIX>_<accountId>_<epochMillis>`.
    InvalidOrderId { order_id: String, reason: String },

    /// Provider name is not one of the supported providers.
    InvalidProvider(String),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// The order belongs to a different account.
    Forbidden { order_id: String },

    /// Invalid state for the requested operation.
    InvalidState { current: String, attempted: String },

    /// Provider credentials are not configured.
    ProviderUnavailable(PaymentProvider),

    /// The provider definitively refused to create the order. Safe to retry.
    OrderCreationFailed {
        provider: PaymentProvider,
        detail: String,
    },

    /// The provider may or may not have acted on the request.
    AmbiguousProviderFailure {
        provider: PaymentProvider,
        detail: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn account_not_found(id: AccountId) -> Self {
        SubscriptionError::AccountNotFound(id)
    }

    pub fn review_not_found(order_id: impl Into<String>) -> Self {
        SubscriptionError::ReviewNotFound {
            order_id: order_id.into(),
        }
    }

    pub fn invalid_order_id(order_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SubscriptionError::InvalidOrderId {
            order_id: order_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_provider(provider: impl Into<String>) -> Self {
        SubscriptionError::InvalidProvider(provider.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(order_id: impl Into<String>) -> Self {
        SubscriptionError::Forbidden {
            order_id: order_id.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        SubscriptionError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn provider_unavailable(provider: PaymentProvider) -> Self {
        SubscriptionError::ProviderUnavailable(provider)
    }

    pub fn order_creation_failed(provider: PaymentProvider, detail: impl Into<String>) -> Self {
        SubscriptionError::OrderCreationFailed {
            provider,
            detail: detail.into(),
        }
    }

    pub fn ambiguous(provider: PaymentProvider, detail: impl Into<String>) -> Self {
        SubscriptionError::AmbiguousProviderFailure {
            provider,
            detail: detail.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::AccountNotFound(_) => ErrorCode::AccountNotFound,
            SubscriptionError::ReviewNotFound { .. } => ErrorCode::ReviewNotFound,
            SubscriptionError::InvalidOrderId { .. } => ErrorCode::InvalidOrderId,
            SubscriptionError::InvalidProvider(_) => ErrorCode::InvalidProvider,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Forbidden { .. } => ErrorCode::Forbidden,
            SubscriptionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            SubscriptionError::OrderCreationFailed { .. } => ErrorCode::PaymentOrderFailed,
            SubscriptionError::AmbiguousProviderFailure { .. } => ErrorCode::ProviderAmbiguous,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    ///
    /// Provider diagnostics are not included; see [`SubscriptionError::detail`].
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::AccountNotFound(id) => format!("Account not found: {}", id),
            SubscriptionError::ReviewNotFound { order_id } => {
                format!("No pending manual review for order '{}'", order_id)
            }
            SubscriptionError::InvalidOrderId { order_id, reason } => {
                format!("Invalid order id '{}': {}", order_id, reason)
            }
            SubscriptionError::InvalidProvider(provider) => {
                format!("Unsupported payment provider: '{}'", provider)
            }
            SubscriptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::Forbidden { order_id } => {
                format!("Order '{}' does not belong to this account", order_id)
            }
            SubscriptionError::InvalidState { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            SubscriptionError::ProviderUnavailable(provider) => {
                format!("Payment provider '{}' is not configured", provider)
            }
            SubscriptionError::OrderCreationFailed { provider, .. } => {
                format!("Payment provider '{}' could not create the order", provider)
            }
            SubscriptionError::AmbiguousProviderFailure { provider, .. } => format!(
                "Payment provider '{}' did not confirm the request; do not retry until the order status is known",
                provider
            ),
            SubscriptionError::Infrastructure(_) => "Internal error".to_string(),
        }
    }

    /// Raw diagnostic text from a provider or the storage layer, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            SubscriptionError::OrderCreationFailed { detail, .. }
            | SubscriptionError::AmbiguousProviderFailure { detail, .. } => Some(detail),
            SubscriptionError::Infrastructure(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns true if the caller may safely repeat the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::Infrastructure(_) | SubscriptionError::OrderCreationFailed { .. }
        )
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                SubscriptionError::validation(field, err.message)
            }
            ErrorCode::InvalidStateTransition => {
                SubscriptionError::invalid_state("current", err.message)
            }
            _ => SubscriptionError::infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::validation(err.field().to_string(), err.to_string())
    }
}
