//! Order identity scheme.
//!
//! Orders are not stored. The order id string `<PREFIX>_<accountId>_<epochMillis>`
//! carries everything needed to route a payment back to its account, so it is
//! the single source of truth for which account a payment belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AccountId, Timestamp};

use super::{PaymentProvider, SubscriptionError};

const SEPARATOR: char = '_';

/// Default lifetime of an order at the provider.
pub const DEFAULT_ORDER_EXPIRY_MINUTES: i64 = 30;

/// Validated order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct OrderId {
    provider: PaymentProvider,
    account_id: AccountId,
    created_at_millis: i64,
}

impl OrderId {
    /// Mints a new order id for `account_id` at `now`.
    pub fn generate(provider: PaymentProvider, account_id: AccountId, now: Timestamp) -> Self {
        Self {
            provider,
            account_id,
            created_at_millis: now.as_unix_millis(),
        }
    }

    /// Parses an order id received from a client or a provider.
    pub fn parse(raw: &str) -> Result<Self, SubscriptionError> {
        let (prefix, account_id, millis) = split_segments(raw)?;

        let provider = PaymentProvider::from_order_prefix(prefix).ok_or_else(|| {
            SubscriptionError::invalid_order_id(raw, format!("unknown prefix '{}'", prefix))
        })?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SubscriptionError::invalid_order_id(
                raw,
                "timestamp segment is not numeric",
            ));
        }
        let created_at_millis = millis.parse::<i64>().map_err(|_| {
            SubscriptionError::invalid_order_id(raw, "timestamp segment is out of range")
        })?;

        Ok(Self {
            provider,
            account_id,
            created_at_millis,
        })
    }

    pub fn provider(&self) -> PaymentProvider {
        self.provider
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.provider.order_prefix(),
            self.account_id,
            self.created_at_millis,
            sep = SEPARATOR
        )
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.to_string()
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        OrderId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Recovers the account id from an order id.
///
/// Exactly three underscore-separated segments are required, and the
/// second must be a positive integer. Anything else is rejected; there is
/// no fallback account.
pub fn parse_account_id(order_id: &str) -> Result<AccountId, SubscriptionError> {
    split_segments(order_id).map(|(_, account_id, _)| account_id)
}

fn split_segments(raw: &str) -> Result<(&str, AccountId, &str), SubscriptionError> {
    if raw.is_empty() {
        return Err(SubscriptionError::invalid_order_id(raw, "order id is empty"));
    }

    let segments: Vec<&str> = raw.split(SEPARATOR).collect();
    if segments.len() != 3 {
        return Err(SubscriptionError::invalid_order_id(
            raw,
            format!("expected 3 segments, found {}", segments.len()),
        ));
    }

    let account_id = segments[1]
        .parse::<AccountId>()
        .map_err(|e| SubscriptionError::invalid_order_id(raw, e.to_string()))?;

    Ok((segments[0], account_id, segments[2]))
}

/// A payment order for the single subscription plan.
///
/// Built once when the client starts a purchase and handed to the
/// provider adapter. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub provider: PaymentProvider,
    pub account_id: AccountId,
    pub amount_minor_units: i64,
    pub currency: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Order {
    /// Creates an order for `account_id` priced at the plan amount.
    pub fn new(
        provider: PaymentProvider,
        account_id: AccountId,
        amount_minor_units: i64,
        currency: impl Into<String>,
        expiry_minutes: i64,
        now: Timestamp,
    ) -> Result<Self, SubscriptionError> {
        if amount_minor_units <= 0 {
            return Err(SubscriptionError::validation(
                "amount_minor_units",
                "must be positive",
            ));
        }
        if expiry_minutes <= 0 {
            return Err(SubscriptionError::validation(
                "order_expiry_minutes",
                "must be positive",
            ));
        }

        Ok(Self {
            order_id: OrderId::generate(provider, account_id, now),
            provider,
            account_id,
            amount_minor_units,
            currency: currency.into(),
            created_at: now,
            expires_at: now.add_minutes(expiry_minutes),
        })
    }

    /// Amount in major units with two decimals, as some providers expect.
    pub fn amount_major(&self) -> f64 {
        self.amount_minor_units as f64 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn at_millis(millis: i64) -> Timestamp {
        Timestamp::from_unix_millis(millis).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // parse_account_id
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_account_id_reads_second_segment() {
        assert_eq!(
            parse_account_id("ORDER_42_1700000000000").unwrap(),
            account(42)
        );
    }

    #[test]
    fn parse_account_id_rejects_garbage() {
        let err = parse_account_id("garbage").unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidOrderId { .. }));
    }

    #[test]
    fn parse_account_id_rejects_extra_segments() {
        assert!(parse_account_id("ORDER_42_1700000000000_x").is_err());
    }

    #[test]
    fn parse_account_id_rejects_missing_segments() {
        assert!(parse_account_id("ORDER_42").is_err());
        assert!(parse_account_id("").is_err());
    }

    #[test]
    fn parse_account_id_rejects_non_numeric_account() {
        assert!(parse_account_id("ORDER_abc_1700000000000").is_err());
        assert!(parse_account_id("ORDER__1700000000000").is_err());
        assert!(parse_account_id("ORDER_-4_1700000000000").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // OrderId
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn generate_uses_provider_prefix() {
        let now = at_millis(1_700_000_000_000);
        assert_eq!(
            OrderId::generate(PaymentProvider::Cashfree, account(7), now).to_string(),
            "ORDER_7_1700000000000"
        );
        assert_eq!(
            OrderId::generate(PaymentProvider::PhonePe, account(7), now).to_string(),
            "TXN_7_1700000000000"
        );
        assert_eq!(
            OrderId::generate(PaymentProvider::RupeePayments, account(7), now).to_string(),
            "RP_7_1700000000000"
        );
    }

    #[test]
    fn parse_recovers_generated_fields() {
        let parsed = OrderId::parse("TXN_99_1700000000123").unwrap();
        assert_eq!(parsed.provider(), PaymentProvider::PhonePe);
        assert_eq!(parsed.account_id(), account(99));
        assert_eq!(parsed.to_string(), "TXN_99_1700000000123");
    }

    #[test]
    fn parse_rejects_unknown_prefix() {
        let err = OrderId::parse("PAY_42_1700000000000").unwrap_err();
        assert!(err.message().contains("unknown prefix"));
    }

    #[test]
    fn parse_rejects_non_numeric_timestamp() {
        assert!(OrderId::parse("ORDER_42_soon").is_err());
        assert!(OrderId::parse("ORDER_42_").is_err());
    }

    #[test]
    fn order_id_serializes_as_string() {
        let id = OrderId::parse("RP_5_1700000000000").unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"RP_5_1700000000000\""
        );
        let back: OrderId = serde_json::from_str("\"RP_5_1700000000000\"").unwrap();
        assert_eq!(back, id);
    }

    // ══════════════════════════════════════════════════════════════
    // Order
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn order_expires_after_configured_minutes() {
        let now = at_millis(1_700_000_000_000);
        let order = Order::new(
            PaymentProvider::Cashfree,
            account(3),
            49_900,
            "INR",
            DEFAULT_ORDER_EXPIRY_MINUTES,
            now,
        )
        .unwrap();
        assert_eq!(order.expires_at, now.add_minutes(30));
        assert_eq!(order.order_id.account_id(), account(3));
        assert!((order.amount_major() - 499.0).abs() < f64::EPSILON);
    }

    #[test]
    fn order_rejects_non_positive_amount() {
        let result = Order::new(
            PaymentProvider::Cashfree,
            account(3),
            0,
            "INR",
            30,
            Timestamp::now(),
        );
        assert!(matches!(
            result,
            Err(SubscriptionError::ValidationFailed { .. })
        ));
    }
}
