//! ProcessWebhookHandler - Command handler for provider payment callbacks.
//!
//! Signature first, then parsing. The provider is the one implied by the
//! signature scheme; the order id prefix must agree with it.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::PaymentConfig;
use crate::domain::foundation::{AccountId, Timestamp};
use crate::domain::subscription::{
    ActivationGuard, ActivationOutcome, HmacWebhookVerifier, OrderId, PaymentProvider,
    SaltedChecksumVerifier, SubscriptionError, VerifiedWebhook, WebhookError, WebhookHeaders,
    WebhookPaymentStatus, WebhookScheme,
};

use super::SubscriptionActivator;

/// Server-side secrets for each signature scheme.
///
/// A missing verifier means the scheme's provider is not configured.
#[derive(Default)]
pub struct WebhookVerifiers {
    hmac: Option<HmacWebhookVerifier>,
    checksum: Option<SaltedChecksumVerifier>,
}

impl WebhookVerifiers {
    pub fn new(hmac: Option<HmacWebhookVerifier>, checksum: Option<SaltedChecksumVerifier>) -> Self {
        Self { hmac, checksum }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        let hmac = config
            .cashfree
            .as_ref()
            .and_then(|c| c.webhook_signing_secret())
            .map(|secret| {
                HmacWebhookVerifier::new(secret.expose_secret().clone())
                    .with_max_age(config.max_webhook_age_secs)
            });

        let checksum = config
            .phonepe
            .as_ref()
            .filter(|p| p.is_complete())
            .and_then(|p| {
                p.salt_key.as_ref().map(|key| {
                    SaltedChecksumVerifier::new(key.expose_secret().clone(), p.salt_index.clone())
                })
            });

        Self { hmac, checksum }
    }
}

/// Command to process a webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    pub headers: WebhookHeaders,
    /// Raw request body, exactly as received.
    pub body: Vec<u8>,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessWebhookResult {
    /// Payment succeeded and the subscription was activated.
    Activated {
        account_id: AccountId,
        subscription_end_date: Timestamp,
    },
    /// Account already entitled; nothing written.
    AlreadyProcessed { account_id: AccountId },
    /// Provider reported a failed payment; nothing written.
    PaymentFailed { order_id: String },
    /// Status carries no action.
    Ignored { payment_status: String },
}

/// Handler for provider webhooks.
pub struct ProcessWebhookHandler {
    verifiers: Arc<WebhookVerifiers>,
    activator: SubscriptionActivator,
}

impl ProcessWebhookHandler {
    pub fn new(verifiers: Arc<WebhookVerifiers>, activator: SubscriptionActivator) -> Self {
        Self {
            verifiers,
            activator,
        }
    }

    pub async fn handle(&self, cmd: ProcessWebhookCommand) -> Result<ProcessWebhookResult, WebhookError> {
        let now = Timestamp::now();
        let scheme = WebhookScheme::detect(&cmd.headers)?;

        let event = match self.verify(scheme, &cmd, now) {
            Ok(event) => event,
            Err(err) => {
                if let WebhookError::InvalidSignature { expected, received } = &err {
                    tracing::warn!(
                        target: "security",
                        provider = %scheme.provider(),
                        expected_signature = %expected,
                        received_signature = %received,
                        "Webhook signature mismatch"
                    );
                } else if err.is_security_event() {
                    tracing::warn!(
                        target: "security",
                        provider = %scheme.provider(),
                        error = %err,
                        "Webhook rejected"
                    );
                } else if let WebhookError::NotConfigured(provider) = &err {
                    tracing::error!(provider = %provider, "Webhook received but no secret configured");
                }
                return Err(err);
            }
        };

        self.apply(event, now).await
    }

    /// Checks the signature and parses the payload it covers.
    fn verify(
        &self,
        scheme: WebhookScheme,
        cmd: &ProcessWebhookCommand,
        now: Timestamp,
    ) -> Result<VerifiedWebhook, WebhookError> {
        match scheme {
            WebhookScheme::HmacTimestamped => {
                let verifier = self
                    .verifiers
                    .hmac
                    .as_ref()
                    .ok_or(WebhookError::NotConfigured(PaymentProvider::Cashfree))?;
                let signature = cmd
                    .headers
                    .signature
                    .as_deref()
                    .ok_or(WebhookError::MissingHeader("x-webhook-signature"))?;
                let timestamp = cmd
                    .headers
                    .timestamp
                    .as_deref()
                    .ok_or(WebhookError::MissingHeader("x-webhook-timestamp"))?;

                verifier.verify(&cmd.body, timestamp, signature, now)?;
                VerifiedWebhook::from_hmac_payload(&cmd.body)
            }
            WebhookScheme::SaltedChecksum => {
                let verifier = self
                    .verifiers
                    .checksum
                    .as_ref()
                    .ok_or(WebhookError::NotConfigured(PaymentProvider::PhonePe))?;
                let x_verify = cmd
                    .headers
                    .x_verify
                    .as_deref()
                    .ok_or(WebhookError::MissingHeader("x-verify"))?;

                let decoded = verifier.verify_and_decode(&cmd.body, x_verify)?;
                VerifiedWebhook::from_checksum_payload(&decoded)
            }
        }
    }

    async fn apply(&self, event: VerifiedWebhook, now: Timestamp) -> Result<ProcessWebhookResult, WebhookError> {
        let order_id =
            OrderId::parse(&event.order_id).map_err(|_| WebhookError::InvalidOrderId(event.order_id.clone()))?;

        if order_id.provider() != event.provider {
            return Err(WebhookError::ProviderMismatch {
                provider: event.provider,
                order_id: event.order_id,
            });
        }
        let account_id = order_id.account_id();

        match event.payment_status {
            WebhookPaymentStatus::Success => {
                let outcome = self
                    .activator
                    .activate(account_id, event.provider, ActivationGuard::SkipIfEntitled, now)
                    .await
                    .map_err(|e| match e {
                        SubscriptionError::AccountNotFound(_) => {
                            tracing::warn!(account_id = %account_id, order_id = %order_id, "Webhook for unknown account");
                            WebhookError::AccountNotFound
                        }
                        other => WebhookError::Database(other.to_string()),
                    })?;

                Ok(match outcome {
                    ActivationOutcome::Activated { end_date } => ProcessWebhookResult::Activated {
                        account_id,
                        subscription_end_date: end_date,
                    },
                    ActivationOutcome::AlreadyActive { .. } => {
                        ProcessWebhookResult::AlreadyProcessed { account_id }
                    }
                })
            }
            WebhookPaymentStatus::Failed => {
                tracing::warn!(
                    account_id = %account_id,
                    order_id = %order_id,
                    provider = %event.provider,
                    provider_transaction_id = event.provider_transaction_id.as_deref().unwrap_or(""),
                    "Payment failed at provider"
                );
                Ok(ProcessWebhookResult::PaymentFailed {
                    order_id: order_id.to_string(),
                })
            }
            WebhookPaymentStatus::Other(status) => {
                tracing::info!(
                    order_id = %order_id,
                    payment_status = %status,
                    "Webhook status ignored"
                );
                Ok(ProcessWebhookResult::Ignored {
                    payment_status: status,
                })
            }
        }
    }
}
