//! Mock payment gateway for testing.
//!
//! Lets handlers and HTTP tests run without calling a real provider.
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockPaymentGateway::new(PaymentProvider::Cashfree)
//!     .with_outcome(PaymentOutcome::Succeeded { provider_transaction_id: None });
//!
//! let outcome = gateway.verify_order("ORDER_1_1700000000000").await?;
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::subscription::{Order, PaymentProvider};
use crate::ports::{CheckoutTarget, GatewayError, OrderResult, PaymentGateway, PaymentOutcome};

/// Configurable in-process gateway.
///
/// Queued results are consumed in order. Once a queue is empty the gateway
/// falls back to a payment session for orders and `Inconclusive` for
/// verification.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    provider: PaymentProvider,
    create_results: Arc<Mutex<VecDeque<Result<CheckoutTarget, GatewayError>>>>,
    outcomes: Arc<Mutex<VecDeque<Result<PaymentOutcome, GatewayError>>>>,
    created: Arc<Mutex<Vec<Order>>>,
    verified: Arc<Mutex<Vec<String>>>,
}

impl MockPaymentGateway {
    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            create_results: Arc::new(Mutex::new(VecDeque::new())),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            verified: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues the checkout target for the next `create_order`.
    pub fn with_checkout(self, checkout: CheckoutTarget) -> Self {
        self.create_results.lock().unwrap().push_back(Ok(checkout));
        self
    }

    /// Queues a failure for the next `create_order`.
    pub fn with_create_error(self, error: GatewayError) -> Self {
        self.create_results.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queues the outcome for the next `verify_order`.
    pub fn with_outcome(self, outcome: PaymentOutcome) -> Self {
        self.outcomes.lock().unwrap().push_back(Ok(outcome));
        self
    }

    /// Queues a failure for the next `verify_order`.
    pub fn with_verify_error(self, error: GatewayError) -> Self {
        self.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    /// Orders passed to `create_order`, in call order.
    pub fn created_orders(&self) -> Vec<Order> {
        self.created.lock().unwrap().clone()
    }

    /// Order ids passed to `verify_order`, in call order.
    pub fn verified_orders(&self) -> Vec<String> {
        self.verified.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn create_order(&self, order: &Order) -> Result<OrderResult, GatewayError> {
        self.created.lock().unwrap().push(order.clone());

        let order_id = order.order_id.to_string();
        let next = self.create_results.lock().unwrap().pop_front();
        let checkout = match next {
            Some(result) => result?,
            None => CheckoutTarget::PaymentSession {
                payment_session_id: format!("mock_session_{}", order_id),
            },
        };

        Ok(OrderResult { order_id, checkout })
    }

    async fn verify_order(&self, order_id: &str) -> Result<PaymentOutcome, GatewayError> {
        self.verified.lock().unwrap().push(order_id.to_string());

        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(PaymentOutcome::Inconclusive {
                reason: "mock has no queued outcome".to_string(),
            })
        })
    }
}
