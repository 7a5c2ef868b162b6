//! PostgreSQL implementation of AccountRepository.
//!
//! Only the subscription columns of `accounts` are touched. Every write is a
//! single conditional `UPDATE`, so concurrent webhook deliveries and lazy
//! expiry cannot interleave between a read and a write.

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::domain::subscription::{
    Account, ActivationGuard, ActivationOutcome, SubscriptionStatus,
};
use crate::ports::{AccountRepository, StatusCount, SubscriptionOverview};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the AccountRepository port.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an account's subscription columns.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    subscription_status: String,
    subscription_end_date: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let id = AccountId::new(row.id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid account id: {}", e))
        })?;
        Ok(Account {
            id,
            status: parse_status(&row.subscription_status)?,
            subscription_end_date: row.subscription_end_date.map(Timestamp::from_datetime),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusCountRow {
    subscription_status: String,
    count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewCountsRow {
    expired_but_unmarked: i64,
    expiring_within_7_days: i64,
    expired_last_24_hours: i64,
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse::<SubscriptionStatus>().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status value: {}", s),
        )
    })
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, subscription_status, subscription_end_date
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn activate(
        &self,
        id: AccountId,
        end_date: Timestamp,
        guard: ActivationGuard,
        now: Timestamp,
    ) -> Result<Option<ActivationOutcome>, DomainError> {
        let skip_if_entitled = guard == ActivationGuard::SkipIfEntitled;

        let updated: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            r#"
            UPDATE accounts SET
                subscription_status = 'active',
                subscription_end_date = $2,
                updated_at = $3
            WHERE id = $1
              AND (
                  NOT $4
                  OR NOT (
                      subscription_status IN ('active', 'paid')
                      AND subscription_end_date > $3
                  )
              )
            RETURNING subscription_end_date
            "#,
        )
        .bind(id.as_i64())
        .bind(end_date.as_datetime())
        .bind(now.as_datetime())
        .bind(skip_if_entitled)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to activate subscription", e))?;

        if let Some((stored_end,)) = updated {
            let end_date = stored_end.map(Timestamp::from_datetime).unwrap_or(end_date);
            return Ok(Some(ActivationOutcome::Activated { end_date }));
        }

        // Nothing written: either the guard held or the account is missing.
        Ok(self
            .find_by_id(id)
            .await?
            .map(|account| ActivationOutcome::AlreadyActive {
                end_date: account.subscription_end_date,
            }))
    }

    async fn expire_if_due(&self, id: AccountId, now: Timestamp) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                subscription_status = 'expired',
                updated_at = $2
            WHERE id = $1
              AND subscription_status IN ('active', 'paid')
              AND subscription_end_date IS NOT NULL
              AND subscription_end_date <= $2
            "#,
        )
        .bind(id.as_i64())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to expire subscription", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn subscription_overview(&self, now: Timestamp) -> Result<SubscriptionOverview, DomainError> {
        let rows: Vec<StatusCountRow> = sqlx::query_as(
            r#"
            SELECT subscription_status, COUNT(*) AS count
            FROM accounts
            GROUP BY subscription_status
            ORDER BY subscription_status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count subscriptions", e))?;

        let mut status_counts: Vec<StatusCount> = Vec::new();
        for row in rows {
            let status = parse_status(&row.subscription_status)?;
            match status_counts.iter_mut().find(|c| c.status == status) {
                Some(existing) => existing.count += row.count,
                None => status_counts.push(StatusCount {
                    status,
                    count: row.count,
                }),
            }
        }

        let counts: OverviewCountsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (
                    WHERE subscription_status IN ('active', 'paid')
                      AND subscription_end_date <= $1
                ) AS expired_but_unmarked,
                COUNT(*) FILTER (
                    WHERE subscription_status IN ('active', 'paid')
                      AND subscription_end_date > $1
                      AND subscription_end_date <= $1 + INTERVAL '7 days'
                ) AS expiring_within_7_days,
                COUNT(*) FILTER (
                    WHERE subscription_status IN ('active', 'paid', 'expired')
                      AND subscription_end_date <= $1
                      AND subscription_end_date > $1 - INTERVAL '24 hours'
                ) AS expired_last_24_hours
            FROM accounts
            "#,
        )
        .bind(now.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to compute subscription overview", e))?;

        Ok(SubscriptionOverview {
            status_counts,
            expired_but_unmarked: counts.expired_but_unmarked,
            expiring_within_7_days: counts.expiring_within_7_days,
            expired_last_24_hours: counts.expired_last_24_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_paid_status_reads_as_active() {
        let row = AccountRow {
            id: 9,
            subscription_status: "paid".to_string(),
            subscription_end_date: None,
        };
        let account = Account::try_from(row).unwrap();
        assert_eq!(account.status, SubscriptionStatus::Active);
    }

    #[test]
    fn row_with_unknown_status_is_database_error() {
        let row = AccountRow {
            id: 9,
            subscription_status: "trialing".to_string(),
            subscription_end_date: None,
        };
        let err = Account::try_from(row).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn row_with_non_positive_id_is_rejected() {
        let row = AccountRow {
            id: 0,
            subscription_status: "free".to_string(),
            subscription_end_date: None,
        };
        assert!(Account::try_from(row).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Against a live database
    // ══════════════════════════════════════════════════════════════

    async fn live_repository() -> (PgPool, PostgresAccountRepository) {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        (pool.clone(), PostgresAccountRepository::new(pool))
    }

    #[tokio::test]
    #[ignore] // Run with: DATABASE_URL=... cargo test -- --ignored
    async fn expiry_from_stale_read_keeps_later_activation() {
        let (pool, repo) = live_repository().await;
        let id = AccountId::new(910_001).unwrap();
        let now = Timestamp::now();
        let lapsed = now.minus_days(1);
        sqlx::query(
            r#"
            INSERT INTO accounts (id, subscription_status, subscription_end_date)
            VALUES ($1, 'active', $2)
            ON CONFLICT (id) DO UPDATE SET
                subscription_status = EXCLUDED.subscription_status,
                subscription_end_date = EXCLUDED.subscription_end_date
            "#,
        )
        .bind(id.as_i64())
        .bind(lapsed.as_datetime())
        .execute(&pool)
        .await
        .unwrap();

        // Status read loads the lapsed row
        let stale = repo.find_by_id(id).await.unwrap().unwrap();
        assert!(stale.needs_expiry_write(now));

        // Webhook activation commits before the read's expiry write
        let outcome = repo
            .activate(id, now.add_days(365), ActivationGuard::SkipIfEntitled, now)
            .await
            .unwrap()
            .unwrap();
        let ActivationOutcome::Activated { end_date } = outcome else {
            panic!("expected activation, got {:?}", outcome);
        };

        assert!(!repo.expire_if_due(stale.id, now).await.unwrap());

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(stored.subscription_end_date, Some(end_date));
    }
}
