//! Subscription status state machine.
//!
//! The status column is a cache of what the end date already says. Reads
//! correct it lazily; entitlement checks never trust it alone.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored subscription status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Never purchased. Not entitled regardless of any end date.
    Free,

    /// Purchase in flight. Never written to storage.
    Pending,

    /// Paid and, while the end date is in the future, entitled.
    #[serde(alias = "paid")]
    Active,

    /// End date has passed.
    Expired,

    /// Cancelled by the account owner or an operator.
    Cancelled,
}

impl SubscriptionStatus {
    /// Storage representation. `Active` is always written as `active`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the end date carries meaning in this status.
    pub fn tracks_end_date(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Expired)
    }

    /// Whether a purchase can start from here and end in `Active`,
    /// either directly or by way of `Pending`.
    pub fn can_activate(&self) -> bool {
        self.can_transition_to(&SubscriptionStatus::Active)
            || (self.can_transition_to(&SubscriptionStatus::Pending)
                && SubscriptionStatus::Pending.can_transition_to(&SubscriptionStatus::Active))
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    /// Parses a stored status. `paid` is read as `active`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionStatus::Free),
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" | "paid" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Free, Pending)
                | (Pending, Active)
                | (Active, Active) // Renewal
                | (Active, Expired)
                | (Active, Cancelled)
                | (Expired, Active)
                | (Cancelled, Pending) // Re-purchase
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Free => vec![Pending],
            Pending => vec![Active],
            Active => vec![Active, Expired, Cancelled],
            Expired => vec![Active],
            Cancelled => vec![Pending],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    #[test]
    fn free_goes_through_pending() {
        assert!(Free.can_transition_to(&Pending));
        assert!(!Free.can_transition_to(&Active));
        assert!(Free.can_activate());
    }

    #[test]
    fn active_can_renew_expire_or_cancel() {
        assert_eq!(Active.transition_to(Active), Ok(Active));
        assert_eq!(Active.transition_to(Expired), Ok(Expired));
        assert_eq!(Active.transition_to(Cancelled), Ok(Cancelled));
    }

    #[test]
    fn expired_reactivates_directly() {
        assert_eq!(Expired.transition_to(Active), Ok(Active));
        assert!(Expired.can_activate());
    }

    #[test]
    fn cancelled_repurchases_via_pending() {
        assert!(!Cancelled.can_transition_to(&Active));
        assert!(Cancelled.can_transition_to(&Pending));
        assert!(Cancelled.can_activate());
    }

    #[test]
    fn free_cannot_expire() {
        assert!(Free.transition_to(Expired).is_err());
    }

    #[test]
    fn no_status_is_terminal() {
        for status in [Free, Pending, Active, Expired, Cancelled] {
            assert!(!status.is_terminal(), "{:?} should not be terminal", status);
        }
    }

    #[test]
    fn paid_is_read_as_active() {
        assert_eq!("paid".parse::<SubscriptionStatus>().unwrap(), Active);
        let parsed: SubscriptionStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(parsed, Active);
    }

    #[test]
    fn active_is_written_as_active() {
        assert_eq!(Active.as_str(), "active");
        assert_eq!(serde_json::to_string(&Active).unwrap(), "\"active\"");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("trial".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn only_active_and_expired_track_end_date() {
        assert!(Active.tracks_end_date());
        assert!(Expired.tracks_end_date());
        assert!(!Free.tracks_end_date());
        assert!(!Cancelled.tracks_end_date());
    }
}
