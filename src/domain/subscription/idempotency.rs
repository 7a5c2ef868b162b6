//! Idempotency guard for webhook-driven activations.
//!
//! Providers redeliver webhooks. A delivery for an account that is already
//! entitled is acknowledged as "already processed" and not applied again,
//! so a retried SUCCESS never pushes the end date forward a second time.
//!
//! The guard is account-level: it cannot tell a redelivery apart from a
//! genuine early renewal paid through the webhook path. Synchronous
//! verification and operator approval use [`ActivationGuard::Unconditional`]
//! and so still renew.
//!
//! Storage adapters must evaluate the guard in the same statement that
//! performs the write. The predicate is mirrored in SQL as
//! `NOT (subscription_status IN ('active','paid') AND subscription_end_date > $now)`.

use crate::domain::foundation::Timestamp;

use super::Account;

/// Precondition attached to an activation write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationGuard {
    /// Always activate. Used when the caller has just confirmed a fresh payment.
    Unconditional,

    /// Skip if the account is already entitled at `now`.
    SkipIfEntitled,
}

impl ActivationGuard {
    /// Whether the activation should be applied to `account` at `now`.
    pub fn permits(&self, account: &Account, now: Timestamp) -> bool {
        match self {
            ActivationGuard::Unconditional => true,
            ActivationGuard::SkipIfEntitled => !account.is_entitled(now),
        }
    }
}

/// Result of an activation attempt against storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The write happened; the account is active until `end_date`.
    Activated { end_date: Timestamp },

    /// The guard rejected the write; the account stays active until `end_date`.
    AlreadyActive { end_date: Option<Timestamp> },
}

impl ActivationOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, ActivationOutcome::Activated { .. })
    }
}
