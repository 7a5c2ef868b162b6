//! RupeePayments adapter.
//!
//! RupeePayments has no order API. The user is sent to a static payment
//! page tagged with the order id, and an operator confirms receipt.

use async_trait::async_trait;

use crate::config::RupeePaymentsConfig;
use crate::domain::subscription::{Order, PaymentProvider};
use crate::ports::{CheckoutTarget, GatewayError, OrderResult, PaymentGateway, PaymentOutcome};

const PROVIDER: PaymentProvider = PaymentProvider::RupeePayments;

/// Static-page gateway.
pub struct RupeePaymentsGateway {
    checkout_url: String,
}

impl RupeePaymentsGateway {
    pub fn new(checkout_url: impl Into<String>) -> Self {
        Self {
            checkout_url: checkout_url.into(),
        }
    }

    /// Returns `None` when no checkout page is configured.
    pub fn from_app_config(config: &RupeePaymentsConfig) -> Option<Self> {
        config
            .is_complete()
            .then(|| Self::new(config.checkout_url.trim()))
    }

    fn link_for(&self, order_id: &str) -> String {
        let separator = if self.checkout_url.contains('?') { '&' } else { '?' };
        format!("{}{}order_id={}", self.checkout_url, separator, order_id)
    }
}

#[async_trait]
impl PaymentGateway for RupeePaymentsGateway {
    fn provider(&self) -> PaymentProvider {
        PROVIDER
    }

    async fn create_order(&self, order: &Order) -> Result<OrderResult, GatewayError> {
        let order_id = order.order_id.to_string();
        Ok(OrderResult {
            checkout: CheckoutTarget::PaymentLink {
                url: self.link_for(&order_id),
            },
            order_id,
        })
    }

    async fn verify_order(&self, _order_id: &str) -> Result<PaymentOutcome, GatewayError> {
        Ok(PaymentOutcome::ManualReviewRequired)
    }
}
