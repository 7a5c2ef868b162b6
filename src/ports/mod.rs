//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AccountRepository` - Subscription columns of an account, conditional writes
//! - `ManualReviewQueue` - Payments awaiting operator confirmation
//! - `PaymentGateway` - One payment provider's order and verification API

mod account_repository;
mod manual_review_queue;
mod payment_gateway;

pub use account_repository::{AccountRepository, StatusCount, SubscriptionOverview};
pub use manual_review_queue::ManualReviewQueue;
pub use payment_gateway::{
    CheckoutTarget, GatewayError, GatewayErrorKind, OrderResult, PaymentGateway, PaymentOutcome,
};
