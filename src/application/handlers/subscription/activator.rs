//! SubscriptionActivator - The single entry point for granting a paid period.
//!
//! Synchronous verification, webhooks and operator approval all end here,
//! so every path applies the same overwrite-style renewal.

use std::sync::Arc;

use crate::domain::foundation::{AccountId, Timestamp};
use crate::domain::subscription::{
    Account, ActivationGuard, ActivationOutcome, PaymentProvider, SubscriptionError,
};
use crate::ports::AccountRepository;

/// Applies trusted payment successes to accounts.
#[derive(Clone)]
pub struct SubscriptionActivator {
    repository: Arc<dyn AccountRepository>,
}

impl SubscriptionActivator {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    /// Sets the account active until `now + 365 days` if `guard` permits.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `Infrastructure` on storage failure
    pub async fn activate(
        &self,
        account_id: AccountId,
        provider: PaymentProvider,
        guard: ActivationGuard,
        now: Timestamp,
    ) -> Result<ActivationOutcome, SubscriptionError> {
        let end_date = Account::renewal_end_date(now);

        let outcome = self
            .repository
            .activate(account_id, end_date, guard, now)
            .await?
            .ok_or_else(|| SubscriptionError::account_not_found(account_id))?;

        if outcome.was_applied() {
            tracing::info!(
                account_id = %account_id,
                provider = %provider,
                guard = ?guard,
                subscription_end_date = %end_date.to_rfc3339(),
                "Subscription activated"
            );
        } else {
            tracing::info!(
                account_id = %account_id,
                provider = %provider,
                "Subscription already active; activation skipped"
            );
        }

        Ok(outcome)
    }
}
