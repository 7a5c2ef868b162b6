//! Subscription handlers.
//!
//! ## Commands
//! - Creating payment orders
//! - Verifying payments on client return
//! - Processing provider webhooks
//! - Resolving manual reviews (admin)
//!
//! ## Queries
//! - Subscription status, with read-triggered expiry
//! - Subscription monitor (admin)
//! - Pending manual reviews (admin)

mod activator;
mod create_order;
mod get_monitor;
mod get_status;
mod manual_reviews;
mod process_webhook;
mod verify_payment;

pub use activator::SubscriptionActivator;

// Commands
pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult, PlanPricing};
pub use manual_reviews::{
    ResolveManualReviewCommand, ResolveManualReviewHandler, ResolveManualReviewResult,
};
pub use process_webhook::{
    ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult, WebhookVerifiers,
};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};

// Queries
pub use get_monitor::GetSubscriptionMonitorHandler;
pub use get_status::{GetSubscriptionStatusHandler, GetSubscriptionStatusQuery};
pub use manual_reviews::ListManualReviewsHandler;
