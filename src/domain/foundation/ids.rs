//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Stable primary identity of an account.
///
/// Accounts are owned by the host application; this subsystem only ever
/// reads the id back out of the session or out of an order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Creates an AccountId, rejecting non-positive values.
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::invalid_format(
                "account_id",
                format!("must be a positive integer, got {}", id),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the raw integer id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        // i64::from_str accepts a leading '+', which never appears in ids we mint
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "account_id",
                format!("'{}' is not numeric", s),
            ));
        }
        let id = s.parse::<i64>().map_err(|_| {
            ValidationError::invalid_format("account_id", format!("'{}' is out of range", s))
        })?;
        Self::new(id)
    }
}
