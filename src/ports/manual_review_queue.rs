//! Manual review queue port.
//!
//! Holds payments that only an operator can confirm.

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::subscription::{ManualReview, OrderId, ReviewDecision};
use async_trait::async_trait;

#[async_trait]
pub trait ManualReviewQueue: Send + Sync {
    /// Open a review for the order.
    ///
    /// Enqueueing an order that already has a review returns the existing
    /// one unchanged.
    async fn enqueue(&self, review: ManualReview) -> Result<ManualReview, DomainError>;

    /// Reviews still awaiting a decision, oldest first.
    async fn list_pending(&self) -> Result<Vec<ManualReview>, DomainError>;

    /// Record a decision on a pending review.
    ///
    /// Returns `None` if no pending review exists for the order.
    async fn resolve(
        &self,
        order_id: &OrderId,
        decision: ReviewDecision,
        now: Timestamp,
    ) -> Result<Option<ManualReview>, DomainError>;
}
