//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    approve_manual_review, create_order, get_monitor, get_status, handle_payment_webhook,
    list_manual_reviews, reject_manual_review, verify_payment, SubscriptionAppState,
};

/// Create the account-facing subscription router.
///
/// # Routes (require `X-Account-Id`)
/// - `POST /orders` - Create a payment order
/// - `POST /verify` - Verify a payment on return from the provider
/// - `GET /status` - Current subscription status
pub fn subscription_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/status", get(get_status))
}

/// Create the admin router.
///
/// # Routes (require the admin bearer key)
/// - `GET /monitor` - Aggregate subscription counts
/// - `GET /manual-reviews` - Payments awaiting operator confirmation
/// - `POST /manual-reviews/:order_id/approve` - Confirm and activate
/// - `POST /manual-reviews/:order_id/reject` - Close without activating
pub fn admin_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/monitor", get(get_monitor))
        .route("/manual-reviews", get(list_manual_reviews))
        .route("/manual-reviews/:order_id/approve", post(approve_manual_review))
        .route("/manual-reviews/:order_id/reject", post(reject_manual_review))
}

/// Create the provider webhook router.
///
/// Webhooks carry no session; they are verified by signature.
///
/// # Routes
/// - `POST /payments` - All providers, scheme inferred from headers
pub fn webhook_routes() -> Router<SubscriptionAppState> {
    Router::new().route("/payments", post(handle_payment_webhook))
}

/// Create the complete subscription module router, suitable for mounting at `/api`.
pub fn subscription_router() -> Router<SubscriptionAppState> {
    Router::new()
        .nest("/subscription", subscription_routes())
        .nest("/admin/subscriptions", admin_routes())
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::{InMemoryAccountRepository, InMemoryManualReviewQueue};
    use crate::adapters::payments::PaymentGateways;
    use crate::application::handlers::subscription::{PlanPricing, WebhookVerifiers};

    fn test_state() -> SubscriptionAppState {
        SubscriptionAppState::new(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemoryManualReviewQueue::new()),
            PaymentGateways::new(),
            WebhookVerifiers::default(),
            PlanPricing {
                amount_minor_units: 100,
                currency: "INR".to_string(),
                order_expiry_minutes: 30,
            },
        )
    }

    #[test]
    fn subscription_routes_creates_router() {
        let _: Router<()> = subscription_routes().with_state(test_state());
    }

    #[test]
    fn admin_routes_creates_router() {
        let _: Router<()> = admin_routes().with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let _: Router<()> = webhook_routes().with_state(test_state());
    }

    #[test]
    fn subscription_router_combines_all_routes() {
        let _: Router<()> = subscription_router().with_state(test_state());
    }
}
