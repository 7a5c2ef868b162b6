//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers (write) are kept apart from query handlers (read).

pub mod handlers;

pub use handlers::subscription::{
    // Commands
    CreateOrderCommand, CreateOrderHandler, CreateOrderResult, PlanPricing,
    ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult, WebhookVerifiers,
    ResolveManualReviewCommand, ResolveManualReviewHandler, ResolveManualReviewResult,
    VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult,
    // Queries
    GetSubscriptionMonitorHandler, GetSubscriptionStatusHandler, GetSubscriptionStatusQuery,
    ListManualReviewsHandler,
    // Shared
    SubscriptionActivator,
};
