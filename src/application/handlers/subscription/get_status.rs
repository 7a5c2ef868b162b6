//! GetSubscriptionStatusHandler - Query handler with read-triggered expiry.
//!
//! A read that finds a stored `active` row past its end date persists
//! `expired` before answering. The write is conditional, so concurrent
//! reads and a racing activation cannot clobber each other.

use std::sync::Arc;

use crate::domain::foundation::{AccountId, Timestamp};
use crate::domain::subscription::{Account, SubscriptionError, SubscriptionSnapshot};
use crate::ports::AccountRepository;

/// Query for an account's subscription.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub account_id: AccountId,
}

pub struct GetSubscriptionStatusHandler {
    repository: Arc<dyn AccountRepository>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetSubscriptionStatusQuery) -> Result<SubscriptionSnapshot, SubscriptionError> {
        let now = Timestamp::now();
        let mut account = self.load(query.account_id).await?;

        if account.needs_expiry_write(now) {
            if self.repository.expire_if_due(account.id, now).await? {
                tracing::info!(account_id = %account.id, "Subscription marked expired");
                account.expire_if_due(now);
            } else {
                // Row changed since the read; answer from what is stored now
                account = self.load(query.account_id).await?;
            }
        }

        Ok(account.snapshot(now))
    }

    async fn load(&self, account_id: AccountId) -> Result<Account, SubscriptionError> {
        self.repository
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| SubscriptionError::account_not_found(account_id))
    }
}
