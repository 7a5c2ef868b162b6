//! PostgreSQL implementation of ManualReviewQueue.

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::subscription::{
    ManualReview, OrderId, PaymentProvider, ReviewDecision, ReviewState,
};
use crate::ports::ManualReviewQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Reviews stored in `manual_payment_reviews`, keyed by order id.
pub struct PostgresManualReviewQueue {
    pool: PgPool,
}

impl PostgresManualReviewQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    order_id: String,
    provider: String,
    state: String,
    requested_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReviewRow> for ManualReview {
    type Error = DomainError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let order_id = OrderId::parse(&row.order_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored order id: {}", e))
        })?;
        let provider = row.provider.parse::<PaymentProvider>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored provider: {}", e))
        })?;
        let state = row.state.parse::<ReviewState>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid review state: {}", e))
        })?;

        Ok(ManualReview {
            account_id: order_id.account_id(),
            order_id,
            provider,
            requested_at: Timestamp::from_datetime(row.requested_at),
            state,
            resolved_at: row.resolved_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_COLUMNS: &str = "order_id, provider, state, requested_at, resolved_at";

#[async_trait]
impl ManualReviewQueue for PostgresManualReviewQueue {
    async fn enqueue(&self, review: ManualReview) -> Result<ManualReview, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO manual_payment_reviews (
                order_id, account_id, provider, state, requested_at, resolved_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(review.order_id.to_string())
        .bind(review.account_id.as_i64())
        .bind(review.provider.as_str())
        .bind(review.state.as_str())
        .bind(review.requested_at.as_datetime())
        .bind(review.resolved_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to enqueue manual review: {}", e)))?;

        let row: ReviewRow = sqlx::query_as(&format!(
            "SELECT {} FROM manual_payment_reviews WHERE order_id = $1",
            SELECT_COLUMNS
        ))
        .bind(review.order_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to read manual review: {}", e)))?;

        ManualReview::try_from(row)
    }

    async fn list_pending(&self) -> Result<Vec<ManualReview>, DomainError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {} FROM manual_payment_reviews WHERE state = 'pending' ORDER BY requested_at ASC, order_id ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list manual reviews: {}", e)))?;

        rows.into_iter().map(ManualReview::try_from).collect()
    }

    async fn resolve(
        &self,
        order_id: &OrderId,
        decision: ReviewDecision,
        now: Timestamp,
    ) -> Result<Option<ManualReview>, DomainError> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            r#"
            UPDATE manual_payment_reviews SET
                state = $2,
                resolved_at = $3
            WHERE order_id = $1 AND state = 'pending'
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(order_id.to_string())
        .bind(decision.target_state().as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve manual review: {}", e)))?;

        row.map(ManualReview::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_derives_account_from_order_id() {
        let row = ReviewRow {
            order_id: "RP_42_1700000000000".to_string(),
            provider: "rupeepayments".to_string(),
            state: "pending".to_string(),
            requested_at: Utc::now(),
            resolved_at: None,
        };
        let review = ManualReview::try_from(row).unwrap();
        assert_eq!(review.account_id.as_i64(), 42);
        assert_eq!(review.provider, PaymentProvider::RupeePayments);
    }

    #[test]
    fn row_with_corrupt_order_id_is_database_error() {
        let row = ReviewRow {
            order_id: "garbage".to_string(),
            provider: "rupeepayments".to_string(),
            state: "pending".to_string(),
            requested_at: Utc::now(),
            resolved_at: None,
        };
        let err = ManualReview::try_from(row).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
