//! Account aggregate, as seen by the subscription subsystem.
//!
//! # Design Decisions
//!
//! - **End date is the source of truth**: status is a cache that reads correct lazily
//! - **Overwrite renewal**: a new purchase sets `now + 365 days`, remaining time is discarded
//! - **Fail-secure**: a `free` account is never entitled, whatever its end date says

use serde::Serialize;

use crate::domain::foundation::{AccountId, StateMachine, Timestamp};

use super::SubscriptionStatus;

/// Length of one paid subscription period.
pub const ONE_YEAR_DAYS: i64 = 365;

/// Subscription-relevant slice of an account.
///
/// # Invariants
///
/// - `id` never changes
/// - `subscription_end_date` is meaningful only for `active` and `expired`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub status: SubscriptionStatus,
    pub subscription_end_date: Option<Timestamp>,
}

impl Account {
    /// Account that has never purchased.
    pub fn free(id: AccountId) -> Self {
        Self {
            id,
            status: SubscriptionStatus::Free,
            subscription_end_date: None,
        }
    }

    /// Account with a paid subscription ending at `end_date`.
    pub fn active_until(id: AccountId, end_date: Timestamp) -> Self {
        Self {
            id,
            status: SubscriptionStatus::Active,
            subscription_end_date: Some(end_date),
        }
    }

    /// True when the end date has passed for a status that tracks one.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.status.tracks_end_date()
            && self
                .subscription_end_date
                .map(|end| !now.is_before(&end))
                .unwrap_or(false)
    }

    /// True only for an active subscription whose end date is still ahead.
    pub fn is_entitled(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active
            && self
                .subscription_end_date
                .map(|end| end.is_after(&now))
                .unwrap_or(false)
    }

    /// True when storage still says `active` but the end date has passed.
    pub fn needs_expiry_write(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.is_expired(now)
    }

    /// Status with lazy expiry applied, without touching storage.
    pub fn effective_status(&self, now: Timestamp) -> SubscriptionStatus {
        if self.needs_expiry_write(now) {
            SubscriptionStatus::Expired
        } else {
            self.status
        }
    }

    /// End date a purchase confirmed at `now` grants.
    pub fn renewal_end_date(now: Timestamp) -> Timestamp {
        now.add_days(ONE_YEAR_DAYS)
    }

    /// Persists lazy expiry in memory. Returns true if anything changed.
    pub fn expire_if_due(&mut self, now: Timestamp) -> bool {
        if !self.needs_expiry_write(now) {
            return false;
        }
        self.status = self
            .status
            .transition_to(SubscriptionStatus::Expired)
            .unwrap_or(SubscriptionStatus::Expired);
        true
    }

    /// Read model returned by status queries.
    pub fn snapshot(&self, now: Timestamp) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            account_id: self.id,
            status: self.effective_status(now),
            subscription_end_date: self.subscription_end_date,
            is_expired: self.is_expired(now),
            is_entitled: self.is_entitled(now),
        }
    }
}

/// Point-in-time view of an account's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSnapshot {
    pub account_id: AccountId,
    pub status: SubscriptionStatus,
    pub subscription_end_date: Option<Timestamp>,
    pub is_expired: bool,
    pub is_entitled: bool,
}
