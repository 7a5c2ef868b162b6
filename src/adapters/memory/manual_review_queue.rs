//! In-memory manual review queue.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::subscription::{ManualReview, OrderId, ReviewDecision, ReviewState};
use crate::ports::ManualReviewQueue;

#[derive(Default)]
pub struct InMemoryManualReviewQueue {
    reviews: RwLock<HashMap<OrderId, ManualReview>>,
}

impl InMemoryManualReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every review regardless of state, oldest first.
    pub fn all(&self) -> Vec<ManualReview> {
        let mut reviews: Vec<ManualReview> = self
            .reviews
            .read()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default();
        sort_oldest_first(&mut reviews);
        reviews
    }
}

fn poisoned() -> DomainError {
    DomainError::database("review queue lock poisoned")
}

fn sort_oldest_first(reviews: &mut [ManualReview]) {
    reviews.sort_by(|a, b| {
        a.requested_at
            .cmp(&b.requested_at)
            .then_with(|| a.order_id.to_string().cmp(&b.order_id.to_string()))
    });
}

#[async_trait]
impl ManualReviewQueue for InMemoryManualReviewQueue {
    async fn enqueue(&self, review: ManualReview) -> Result<ManualReview, DomainError> {
        let mut reviews = self.reviews.write().map_err(|_| poisoned())?;
        Ok(reviews
            .entry(review.order_id.clone())
            .or_insert(review)
            .clone())
    }

    async fn list_pending(&self) -> Result<Vec<ManualReview>, DomainError> {
        let reviews = self.reviews.read().map_err(|_| poisoned())?;
        let mut pending: Vec<ManualReview> = reviews
            .values()
            .filter(|r| r.state == ReviewState::Pending)
            .cloned()
            .collect();
        sort_oldest_first(&mut pending);
        Ok(pending)
    }

    async fn resolve(
        &self,
        order_id: &OrderId,
        decision: ReviewDecision,
        now: Timestamp,
    ) -> Result<Option<ManualReview>, DomainError> {
        let mut reviews = self.reviews.write().map_err(|_| poisoned())?;
        let Some(review) = reviews.get_mut(order_id) else {
            return Ok(None);
        };
        if review.state != ReviewState::Pending {
            return Ok(None);
        }
        review.resolve(decision, now)?;
        Ok(Some(review.clone()))
    }
}
