//! Account repository port.
//!
//! Every write is a single conditional statement so that lazy expiry and
//! webhook activation cannot overwrite each other. Implementations must
//! not read-then-write across two round trips.

use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::domain::subscription::{Account, ActivationGuard, ActivationOutcome, SubscriptionStatus};
use async_trait::async_trait;
use serde::Serialize;

/// Repository port for the subscription columns of an account.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by id.
    ///
    /// Returns `None` if the account does not exist.
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DomainError>;

    /// Set `status = active, end_date = end_date` if `guard` permits it at `now`.
    ///
    /// Returns `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn activate(
        &self,
        id: AccountId,
        end_date: Timestamp,
        guard: ActivationGuard,
        now: Timestamp,
    ) -> Result<Option<ActivationOutcome>, DomainError>;

    /// Persist `expired` if the stored status is `active` and the end date
    /// is not after `now`.
    ///
    /// Returns true if a row changed.
    async fn expire_if_due(&self, id: AccountId, now: Timestamp) -> Result<bool, DomainError>;

    /// Aggregate view of subscription state for operators.
    async fn subscription_overview(&self, now: Timestamp) -> Result<SubscriptionOverview, DomainError>;
}

/// Operator-facing counts, all computed at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionOverview {
    /// Accounts per stored status.
    pub status_counts: Vec<StatusCount>,

    /// Stored as active but with an end date not after now.
    pub expired_but_unmarked: i64,

    /// Entitled accounts whose end date falls within the next 7 days.
    pub expiring_within_7_days: i64,

    /// Active or expired accounts whose end date fell within the last 24 hours.
    pub expired_last_24_hours: i64,
}

/// Count of accounts in one stored status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: SubscriptionStatus,
    pub count: i64,
}

impl SubscriptionOverview {
    /// Number of accounts stored with `status`.
    pub fn count_for(&self, status: SubscriptionStatus) -> i64 {
        self.status_counts
            .iter()
            .filter(|c| c.status == status)
            .map(|c| c.count)
            .sum()
    }
}
