//! In-memory account repository.
//!
//! Backs the service when no database is configured, and the HTTP tests.
//! A single write lock around each operation stands in for the conditional
//! `UPDATE` of the PostgreSQL adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::domain::subscription::{
    Account, ActivationGuard, ActivationOutcome, SubscriptionStatus,
};
use crate::ports::{AccountRepository, StatusCount, SubscriptionOverview};

/// Accounts keyed by id.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // === Seeding ===

    /// Inserts or replaces `account`.
    pub fn insert(&self, account: Account) -> Result<(), DomainError> {
        self.accounts
            .write()
            .map_err(|_| poisoned())?
            .insert(account.id, account);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_account(self, account: Account) -> Self {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(account.id, account);
        }
        self
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> DomainError {
    DomainError::database("account store lock poisoned")
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        Ok(self.accounts.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn activate(
        &self,
        id: AccountId,
        end_date: Timestamp,
        guard: ActivationGuard,
        now: Timestamp,
    ) -> Result<Option<ActivationOutcome>, DomainError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        if !guard.permits(account, now) {
            return Ok(Some(ActivationOutcome::AlreadyActive {
                end_date: account.subscription_end_date,
            }));
        }

        account.status = SubscriptionStatus::Active;
        account.subscription_end_date = Some(end_date);
        Ok(Some(ActivationOutcome::Activated { end_date }))
    }

    async fn expire_if_due(&self, id: AccountId, now: Timestamp) -> Result<bool, DomainError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        Ok(accounts
            .get_mut(&id)
            .map(|account| account.expire_if_due(now))
            .unwrap_or(false))
    }

    async fn subscription_overview(&self, now: Timestamp) -> Result<SubscriptionOverview, DomainError> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        let week_ahead = now.add_days(7);
        let day_ago = now.minus_days(1);

        let mut overview = SubscriptionOverview::default();
        for account in accounts.values() {
            match overview
                .status_counts
                .iter_mut()
                .find(|c| c.status == account.status)
            {
                Some(existing) => existing.count += 1,
                None => overview.status_counts.push(StatusCount {
                    status: account.status,
                    count: 1,
                }),
            }

            let Some(end) = account.subscription_end_date else {
                continue;
            };
            let stored_active = account.status == SubscriptionStatus::Active;

            if stored_active && !end.is_after(&now) {
                overview.expired_but_unmarked += 1;
            }
            if stored_active && end.is_after(&now) && !end.is_after(&week_ahead) {
                overview.expiring_within_7_days += 1;
            }
            if account.status.tracks_end_date() && !end.is_after(&now) && end.is_after(&day_ago) {
                overview.expired_last_24_hours += 1;
            }
        }
        overview.status_counts.sort_by_key(|c| c.status.as_str());

        Ok(overview)
    }
}
