//! Subscription domain module.
//!
//! Handles payment provider identity, order routing, the subscription
//! lifecycle, and webhook trust.
//!
//! # Module Structure
//!
//! - `account` - Account aggregate and subscription snapshot
//! - `status` - SubscriptionStatus state machine
//! - `provider` - PaymentProvider closed set
//! - `order` - Order identity scheme
//! - `idempotency` - Activation guard for redelivered webhooks
//! - `manual_review` - Operator confirmation for manual providers
//! - `webhook_signature` - Scheme A / Scheme B verifiers
//! - `webhook_event` - Scheme detection and verified payload parsing

mod account;
mod errors;
mod idempotency;
mod manual_review;
mod order;
mod provider;
mod status;
pub mod webhook_errors;
pub mod webhook_event;
pub mod webhook_signature;

pub use account::{Account, SubscriptionSnapshot, ONE_YEAR_DAYS};
pub use errors::SubscriptionError;
pub use idempotency::{ActivationGuard, ActivationOutcome};
pub use manual_review::{ManualReview, ReviewDecision, ReviewState};
pub use order::{parse_account_id, Order, OrderId, DEFAULT_ORDER_EXPIRY_MINUTES};
pub use provider::PaymentProvider;
pub use status::SubscriptionStatus;
pub use webhook_errors::WebhookError;
pub use webhook_event::{VerifiedWebhook, WebhookHeaders, WebhookPaymentStatus, WebhookScheme};
pub use webhook_signature::{HmacWebhookVerifier, SaltedChecksumVerifier};
