//! Payment provider identity.
//!
//! A closed set of providers. Adding one means adding a variant here, and
//! every `match` over providers then has to handle it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SubscriptionError;

/// Payment providers the subscription flow can route an order through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Hosted checkout with a pollable payment lookup API and HMAC-signed webhooks.
    Cashfree,

    /// Signed pay-page requests; outcomes arrive via hashed-payload callbacks.
    #[serde(rename = "phonepe")]
    PhonePe,

    /// Static confirmation page; every payment needs an operator to confirm it.
    #[serde(rename = "rupeepayments")]
    RupeePayments,
}

impl PaymentProvider {
    /// All providers, in a stable order.
    pub const ALL: [PaymentProvider; 3] = [
        PaymentProvider::Cashfree,
        PaymentProvider::PhonePe,
        PaymentProvider::RupeePayments,
    ];

    /// Wire name used in requests, storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Cashfree => "cashfree",
            PaymentProvider::PhonePe => "phonepe",
            PaymentProvider::RupeePayments => "rupeepayments",
        }
    }

    /// Leading segment of every order id minted for this provider.
    pub fn order_prefix(&self) -> &'static str {
        match self {
            PaymentProvider::Cashfree => "ORDER",
            PaymentProvider::PhonePe => "TXN",
            PaymentProvider::RupeePayments => "RP",
        }
    }

    /// Resolves an order id prefix back to its provider.
    pub fn from_order_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.order_prefix() == prefix)
    }

    /// Whether a success report from this provider may activate a
    /// subscription without an operator in the loop.
    pub fn supports_automatic_activation(&self) -> bool {
        match self {
            PaymentProvider::Cashfree | PaymentProvider::PhonePe => true,
            PaymentProvider::RupeePayments => false,
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = SubscriptionError;

    /// Parses a provider name. Unknown names are rejected rather than
    /// falling back to a default provider.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| SubscriptionError::invalid_provider(s))
    }
}
