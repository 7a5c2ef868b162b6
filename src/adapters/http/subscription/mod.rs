//! HTTP adapter for subscription endpoints.
//!
//! - `POST /api/subscription/orders` - Create a payment order
//! - `POST /api/subscription/verify` - Verify a payment on client return
//! - `GET /api/subscription/status` - Subscription status
//! - `GET /api/admin/subscriptions/monitor` - Aggregate counts (admin)
//! - `GET /api/admin/subscriptions/manual-reviews` - Pending reviews (admin)
//! - `POST /api/admin/subscriptions/manual-reviews/:order_id/{approve,reject}` (admin)
//! - `POST /api/webhooks/payments` - Provider webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{
    AdminAccess, AuthenticatedAccount, SubscriptionApiError, SubscriptionAppState, WebhookApiError,
    ACCOUNT_ID_HEADER,
};
pub use routes::{admin_routes, subscription_router, subscription_routes, webhook_routes};
