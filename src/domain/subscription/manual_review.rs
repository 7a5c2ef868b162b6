//! Operator confirmation for payments no API can verify.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AccountId, StateMachine, Timestamp, ValidationError};

use super::{OrderId, PaymentProvider};

/// Lifecycle of a manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Pending,
    Approved,
    Rejected,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Pending => "pending",
            ReviewState::Approved => "approved",
            ReviewState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewState::Pending),
            "approved" => Ok(ReviewState::Approved),
            "rejected" => Ok(ReviewState::Rejected),
            other => Err(ValidationError::invalid_format(
                "review_state",
                format!("unknown state '{}'", other),
            )),
        }
    }
}

impl StateMachine for ReviewState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ReviewState::*;
        matches!((self, target), (Pending, Approved) | (Pending, Rejected))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ReviewState::*;
        match self {
            Pending => vec![Approved, Rejected],
            Approved | Rejected => vec![],
        }
    }
}

/// Operator decision on a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn target_state(&self) -> ReviewState {
        match self {
            ReviewDecision::Approve => ReviewState::Approved,
            ReviewDecision::Reject => ReviewState::Rejected,
        }
    }
}

/// A payment awaiting operator confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualReview {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub provider: PaymentProvider,
    pub requested_at: Timestamp,
    pub state: ReviewState,
    pub resolved_at: Option<Timestamp>,
}

impl ManualReview {
    /// Opens a review for `order_id`.
    pub fn open(order_id: OrderId, now: Timestamp) -> Self {
        Self {
            account_id: order_id.account_id(),
            provider: order_id.provider(),
            order_id,
            requested_at: now,
            state: ReviewState::Pending,
            resolved_at: None,
        }
    }

    /// Records the operator's decision.
    pub fn resolve(&mut self, decision: ReviewDecision, now: Timestamp) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(decision.target_state())?;
        self.resolved_at = Some(now);
        Ok(())
    }
}
