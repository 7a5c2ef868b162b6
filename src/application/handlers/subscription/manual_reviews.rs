//! Manual review handlers - Operator confirmation for unverifiable payments.
//!
//! Approval is the only way a manual-provider payment activates. The review
//! is claimed first; a second approval of the same order finds nothing
//! pending and cannot grant a second period.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{
    ActivationGuard, ActivationOutcome, ManualReview, OrderId, ReviewDecision, SubscriptionError,
};
use crate::ports::ManualReviewQueue;

use super::SubscriptionActivator;

pub struct ListManualReviewsHandler {
    reviews: Arc<dyn ManualReviewQueue>,
}

impl ListManualReviewsHandler {
    pub fn new(reviews: Arc<dyn ManualReviewQueue>) -> Self {
        Self { reviews }
    }

    pub async fn handle(&self) -> Result<Vec<ManualReview>, SubscriptionError> {
        Ok(self.reviews.list_pending().await?)
    }
}

/// Command to approve or reject a pending review.
#[derive(Debug, Clone)]
pub struct ResolveManualReviewCommand {
    pub order_id: String,
    pub decision: ReviewDecision,
}

#[derive(Debug, Clone)]
pub struct ResolveManualReviewResult {
    pub review: ManualReview,
    /// Set when the decision activated the subscription.
    pub subscription_end_date: Option<Timestamp>,
}

pub struct ResolveManualReviewHandler {
    reviews: Arc<dyn ManualReviewQueue>,
    activator: SubscriptionActivator,
}

impl ResolveManualReviewHandler {
    pub fn new(reviews: Arc<dyn ManualReviewQueue>, activator: SubscriptionActivator) -> Self {
        Self { reviews, activator }
    }

    pub async fn handle(
        &self,
        cmd: ResolveManualReviewCommand,
    ) -> Result<ResolveManualReviewResult, SubscriptionError> {
        let order_id = OrderId::parse(cmd.order_id.trim())?;
        let now = Timestamp::now();

        let review = self
            .reviews
            .resolve(&order_id, cmd.decision, now)
            .await?
            .ok_or_else(|| SubscriptionError::review_not_found(order_id.to_string()))?;

        tracing::info!(
            order_id = %review.order_id,
            account_id = %review.account_id,
            decision = %review.state,
            "Manual review resolved"
        );

        let subscription_end_date = match cmd.decision {
            ReviewDecision::Reject => None,
            ReviewDecision::Approve => {
                let outcome = self
                    .activator
                    .activate(
                        review.account_id,
                        review.provider,
                        ActivationGuard::Unconditional,
                        now,
                    )
                    .await?;
                match outcome {
                    ActivationOutcome::Activated { end_date } => Some(end_date),
                    ActivationOutcome::AlreadyActive { end_date } => end_date,
                }
            }
        };

        Ok(ResolveManualReviewResult {
            review,
            subscription_end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountRepository, InMemoryManualReviewQueue};
    use crate::domain::foundation::AccountId;
    use crate::domain::subscription::{Account, ReviewState, SubscriptionStatus};
    use crate::ports::AccountRepository;

    const ORDER: &str = "RP_42_1700000000000";

    fn id(n: i64) -> AccountId {
        AccountId::new(n).unwrap()
    }

    async fn setup() -> (
        ResolveManualReviewHandler,
        Arc<InMemoryAccountRepository>,
        Arc<InMemoryManualReviewQueue>,
    ) {
        let accounts = Arc::new(InMemoryAccountRepository::new().with_account(Account::free(id(42))));
        let reviews = Arc::new(InMemoryManualReviewQueue::new());
        reviews
            .enqueue(ManualReview::open(OrderId::parse(ORDER).unwrap(), Timestamp::now()))
            .await
            .unwrap();
        let handler =
            ResolveManualReviewHandler::new(reviews.clone(), SubscriptionActivator::new(accounts.clone()));
        (handler, accounts, reviews)
    }

    #[tokio::test]
    async fn approve_activates_account() {
        let (handler, accounts, reviews) = setup().await;

        let result = handler
            .handle(ResolveManualReviewCommand {
                order_id: ORDER.to_string(),
                decision: ReviewDecision::Approve,
            })
            .await
            .unwrap();

        assert_eq!(result.review.state, ReviewState::Approved);
        assert!(result.subscription_end_date.is_some());
        let stored = accounts.find_by_id(id(42)).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(reviews.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reject_leaves_account_untouched() {
        let (handler, accounts, _) = setup().await;

        let result = handler
            .handle(ResolveManualReviewCommand {
                order_id: ORDER.to_string(),
                decision: ReviewDecision::Reject,
            })
            .await
            .unwrap();

        assert_eq!(result.review.state, ReviewState::Rejected);
        assert!(result.subscription_end_date.is_none());
        let stored = accounts.find_by_id(id(42)).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Free);
    }

    #[tokio::test]
    async fn second_approval_finds_nothing_pending() {
        let (handler, _, _) = setup().await;
        let cmd = ResolveManualReviewCommand {
            order_id: ORDER.to_string(),
            decision: ReviewDecision::Approve,
        };

        handler.handle(cmd.clone()).await.unwrap();
        let err = handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::ReviewNotFound { .. }));
    }

    #[tokio::test]
    async fn list_returns_pending_reviews() {
        let (_, _, reviews) = setup().await;
        let handler = ListManualReviewsHandler::new(reviews);

        let pending = handler.handle().await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id.to_string(), ORDER);
    }
}
