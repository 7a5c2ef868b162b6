//! GetSubscriptionMonitorHandler - Admin query for subscription health.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::SubscriptionError;
use crate::ports::{AccountRepository, SubscriptionOverview};

pub struct GetSubscriptionMonitorHandler {
    repository: Arc<dyn AccountRepository>,
}

impl GetSubscriptionMonitorHandler {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self) -> Result<SubscriptionOverview, SubscriptionError> {
        let overview = self.repository.subscription_overview(Timestamp::now()).await?;
        if overview.expired_but_unmarked > 0 {
            tracing::debug!(
                expired_but_unmarked = overview.expired_but_unmarked,
                "Accounts awaiting lazy expiry"
            );
        }
        Ok(overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountRepository;
    use crate::domain::foundation::AccountId;
    use crate::domain::subscription::{Account, SubscriptionStatus};

    #[tokio::test]
    async fn reports_unmarked_expiries() {
        let repo = InMemoryAccountRepository::new()
            .with_account(Account::active_until(
                AccountId::new(1).unwrap(),
                Timestamp::now().minus_days(3),
            ))
            .with_account(Account::free(AccountId::new(2).unwrap()));
        let handler = GetSubscriptionMonitorHandler::new(Arc::new(repo));

        let overview = handler.handle().await.unwrap();

        assert_eq!(overview.expired_but_unmarked, 1);
        assert_eq!(overview.count_for(SubscriptionStatus::Free), 1);
    }
}
