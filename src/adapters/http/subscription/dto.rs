//! Data Transfer Objects for subscription HTTP endpoints.
//!
//! Request fields are optional at the serde level so that a missing field
//! is reported as `VALIDATION_FAILED` rather than an extractor rejection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::handlers::subscription::{
    CreateOrderResult, ProcessWebhookResult, ResolveManualReviewResult, VerifyPaymentResult,
};
use crate::domain::subscription::{ManualReview, SubscriptionError, SubscriptionSnapshot};
use crate::ports::{CheckoutTarget, SubscriptionOverview};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to create a payment order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub provider: Option<String>,
}

/// Request to verify a payment after the client returns from the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Returns the trimmed value of a required request field.
pub fn required_field(value: Option<String>, field: &str) -> Result<String, SubscriptionError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SubscriptionError::validation(field, "is required")),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub provider: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub created_at: String,
    pub expires_at: String,
    pub checkout: CheckoutTarget,
}

impl From<CreateOrderResult> for CreateOrderResponse {
    fn from(result: CreateOrderResult) -> Self {
        let order = result.order;
        Self {
            order_id: order.order_id.to_string(),
            provider: order.provider.to_string(),
            amount_minor_units: order.amount_minor_units,
            currency: order.currency,
            created_at: order.created_at.to_rfc3339(),
            expires_at: order.expires_at.to_rfc3339(),
            checkout: result.checkout,
        }
    }
}

/// Verification answer. The HTTP status is chosen by the handler.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyPaymentResponse {
    Activated {
        subscription_end_date: String,
    },
    Pending {
        manual_verification_required: bool,
        reason: String,
    },
    Rejected {
        reason: String,
    },
}

impl From<VerifyPaymentResult> for VerifyPaymentResponse {
    fn from(result: VerifyPaymentResult) -> Self {
        match result {
            VerifyPaymentResult::Activated {
                subscription_end_date,
            } => Self::Activated {
                subscription_end_date: subscription_end_date.to_rfc3339(),
            },
            VerifyPaymentResult::Pending {
                manual_verification_required,
                reason,
            } => Self::Pending {
                manual_verification_required,
                reason,
            },
            VerifyPaymentResult::Rejected { reason } => Self::Rejected { reason },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    pub status: String,
    pub subscription_end_date: Option<String>,
    pub is_expired: bool,
    pub is_entitled: bool,
}

impl From<SubscriptionSnapshot> for SubscriptionStatusResponse {
    fn from(snapshot: SubscriptionSnapshot) -> Self {
        Self {
            status: snapshot.status.to_string(),
            subscription_end_date: snapshot.subscription_end_date.map(|t| t.to_rfc3339()),
            is_expired: snapshot.is_expired,
            is_entitled: snapshot.is_entitled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionMonitorResponse {
    /// Accounts per stored status, keyed by status name.
    pub status_distribution: BTreeMap<String, i64>,
    pub expired_but_unmarked: i64,
    pub expiring_within_7_days: i64,
    pub expired_last_24_hours: i64,
}

impl From<SubscriptionOverview> for SubscriptionMonitorResponse {
    fn from(overview: SubscriptionOverview) -> Self {
        let mut status_distribution = BTreeMap::new();
        for entry in &overview.status_counts {
            *status_distribution.entry(entry.status.to_string()).or_insert(0) += entry.count;
        }
        Self {
            status_distribution,
            expired_but_unmarked: overview.expired_but_unmarked,
            expiring_within_7_days: overview.expiring_within_7_days,
            expired_last_24_hours: overview.expired_last_24_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualReviewResponse {
    pub order_id: String,
    pub account_id: i64,
    pub provider: String,
    pub state: String,
    pub requested_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

impl From<ManualReview> for ManualReviewResponse {
    fn from(review: ManualReview) -> Self {
        Self {
            order_id: review.order_id.to_string(),
            account_id: review.account_id.as_i64(),
            provider: review.provider.to_string(),
            state: review.state.to_string(),
            requested_at: review.requested_at.to_rfc3339(),
            resolved_at: review.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualReviewListResponse {
    pub reviews: Vec<ManualReviewResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveManualReviewResponse {
    pub review: ManualReviewResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_end_date: Option<String>,
}

impl From<ResolveManualReviewResult> for ResolveManualReviewResponse {
    fn from(result: ResolveManualReviewResult) -> Self {
        Self {
            review: result.review.into(),
            subscription_end_date: result.subscription_end_date.map(|t| t.to_rfc3339()),
        }
    }
}

/// Acknowledgement body for webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub result: &'static str,
}

impl From<&ProcessWebhookResult> for WebhookAckResponse {
    fn from(result: &ProcessWebhookResult) -> Self {
        let result = match result {
            ProcessWebhookResult::Activated { .. } => "activated",
            ProcessWebhookResult::AlreadyProcessed { .. } => "already_processed",
            ProcessWebhookResult::PaymentFailed { .. } => "payment_failed",
            ProcessWebhookResult::Ignored { .. } => "ignored",
        };
        Self { result }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether repeating the request is safe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    /// Raw diagnostic text. Omitted in production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: None,
            details: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
