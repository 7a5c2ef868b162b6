//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresAccountRepository` - Subscription columns of `accounts`
//! - `PostgresManualReviewQueue` - Payments awaiting operator confirmation

mod account_repository;
mod manual_review_repository;

pub use account_repository::PostgresAccountRepository;
pub use manual_review_repository::PostgresManualReviewQueue;
