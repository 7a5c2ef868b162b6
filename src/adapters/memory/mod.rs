//! In-memory adapters.
//!
//! Used when no database is configured and by tests. State is lost on restart.

mod account_repository;
mod manual_review_queue;

pub use account_repository::InMemoryAccountRepository;
pub use manual_review_queue::InMemoryManualReviewQueue;
