//! VerifyPaymentHandler - Command handler for client-initiated payment checks.
//!
//! The client returns from the provider's page and asks whether its order
//! was paid. Only a provider-confirmed success activates; anything the
//! provider cannot confirm yet is reported as pending. Providers without
//! automatic activation always go to the manual review queue.

use std::sync::Arc;

use crate::adapters::payments::PaymentGateways;
use crate::domain::foundation::{AccountId, Timestamp};
use crate::domain::subscription::{
    ActivationGuard, ActivationOutcome, ManualReview, OrderId, PaymentProvider, SubscriptionError,
};
use crate::ports::{ManualReviewQueue, PaymentOutcome};

use super::SubscriptionActivator;

/// Command to verify a payment.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    /// Authenticated caller.
    pub account_id: AccountId,
    /// Order id as sent by the client. Untrusted.
    pub order_id: String,
    pub provider: PaymentProvider,
}

/// Result of payment verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyPaymentResult {
    /// Payment confirmed; subscription active until the given date.
    Activated { subscription_end_date: Timestamp },

    /// Cannot decide yet.
    Pending {
        manual_verification_required: bool,
        reason: String,
    },

    /// Provider reports the payment did not succeed.
    Rejected { reason: String },
}

/// Handler for verifying payments synchronously.
pub struct VerifyPaymentHandler {
    gateways: PaymentGateways,
    activator: SubscriptionActivator,
    reviews: Arc<dyn ManualReviewQueue>,
}

impl VerifyPaymentHandler {
    pub fn new(
        gateways: PaymentGateways,
        activator: SubscriptionActivator,
        reviews: Arc<dyn ManualReviewQueue>,
    ) -> Self {
        Self {
            gateways,
            activator,
            reviews,
        }
    }

    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<VerifyPaymentResult, SubscriptionError> {
        // 1. The order id decides provider and owner
        let order_id = OrderId::parse(cmd.order_id.trim())?;

        if order_id.provider() != cmd.provider {
            return Err(SubscriptionError::validation(
                "order_id",
                format!("order does not belong to provider '{}'", cmd.provider),
            ));
        }
        if order_id.account_id() != cmd.account_id {
            tracing::warn!(
                account_id = %cmd.account_id,
                order_id = %order_id,
                "Verification attempted for another account's order"
            );
            return Err(SubscriptionError::forbidden(order_id.to_string()));
        }

        // 2. Ask the provider
        let gateway = self.gateways.get(cmd.provider)?;
        let outcome = match gateway.verify_order(&order_id.to_string()).await? {
            PaymentOutcome::Succeeded { .. } if !cmd.provider.supports_automatic_activation() => {
                tracing::warn!(
                    account_id = %cmd.account_id,
                    order_id = %order_id,
                    provider = %cmd.provider,
                    "Success reported by a manually confirmed provider; holding for review"
                );
                PaymentOutcome::ManualReviewRequired
            }
            outcome => outcome,
        };

        // 3. Only a confirmed success mutates state
        match outcome {
            PaymentOutcome::Succeeded {
                provider_transaction_id,
            } => {
                tracing::info!(
                    account_id = %cmd.account_id,
                    order_id = %order_id,
                    provider_transaction_id = provider_transaction_id.as_deref().unwrap_or(""),
                    "Payment verified"
                );
                let outcome = self
                    .activator
                    .activate(
                        cmd.account_id,
                        cmd.provider,
                        ActivationGuard::Unconditional,
                        Timestamp::now(),
                    )
                    .await?;
                match outcome {
                    ActivationOutcome::Activated { end_date } => Ok(VerifyPaymentResult::Activated {
                        subscription_end_date: end_date,
                    }),
                    ActivationOutcome::AlreadyActive { end_date } => end_date
                        .map(|subscription_end_date| VerifyPaymentResult::Activated {
                            subscription_end_date,
                        })
                        .ok_or_else(|| {
                            SubscriptionError::infrastructure("activation skipped without end date")
                        }),
                }
            }
            PaymentOutcome::Failed { reason } => {
                tracing::warn!(
                    account_id = %cmd.account_id,
                    order_id = %order_id,
                    reason = %reason,
                    "Payment not successful"
                );
                Ok(VerifyPaymentResult::Rejected { reason })
            }
            PaymentOutcome::Inconclusive { reason } => {
                tracing::info!(
                    account_id = %cmd.account_id,
                    order_id = %order_id,
                    reason = %reason,
                    "Payment verification inconclusive"
                );
                Ok(VerifyPaymentResult::Pending {
                    manual_verification_required: false,
                    reason,
                })
            }
            PaymentOutcome::ManualReviewRequired => {
                let review = self
                    .reviews
                    .enqueue(ManualReview::open(order_id, Timestamp::now()))
                    .await?;
                tracing::info!(
                    account_id = %cmd.account_id,
                    order_id = %review.order_id,
                    "Payment queued for manual review"
                );
                Ok(VerifyPaymentResult::Pending {
                    manual_verification_required: true,
                    reason: "awaiting operator confirmation".to_string(),
                })
            }
        }
    }
}
