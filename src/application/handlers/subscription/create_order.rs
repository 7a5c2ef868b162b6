//! CreateOrderHandler - Command handler for starting a subscription purchase.

use std::sync::Arc;

use crate::adapters::payments::PaymentGateways;
use crate::domain::foundation::{AccountId, Timestamp};
use crate::domain::subscription::{Order, PaymentProvider, SubscriptionError};
use crate::ports::{AccountRepository, CheckoutTarget};

/// Price and lifetime applied to every order.
#[derive(Debug, Clone)]
pub struct PlanPricing {
    pub amount_minor_units: i64,
    pub currency: String,
    pub order_expiry_minutes: i64,
}

/// Command to create a payment order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub account_id: AccountId,
    pub provider: PaymentProvider,
}

/// Result of order creation.
#[derive(Debug, Clone)]
pub struct CreateOrderResult {
    pub order: Order,
    pub checkout: CheckoutTarget,
}

/// Handler for creating payment orders.
pub struct CreateOrderHandler {
    repository: Arc<dyn AccountRepository>,
    gateways: PaymentGateways,
    pricing: PlanPricing,
}

impl CreateOrderHandler {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        gateways: PaymentGateways,
        pricing: PlanPricing,
    ) -> Self {
        Self {
            repository,
            gateways,
            pricing,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, SubscriptionError> {
        let gateway = self.gateways.get(cmd.provider).map_err(|e| {
            tracing::error!(provider = %cmd.provider, "Payment provider not configured");
            e
        })?;

        // 1. The account must exist and be able to reach `active`
        let account = self
            .repository
            .find_by_id(cmd.account_id)
            .await?
            .ok_or_else(|| SubscriptionError::account_not_found(cmd.account_id))?;

        if !account.status.can_activate() {
            return Err(SubscriptionError::invalid_state(
                account.status.as_str(),
                "purchase",
            ));
        }

        // 2. Mint the order; its id carries the account for later routing
        let order = Order::new(
            cmd.provider,
            cmd.account_id,
            self.pricing.amount_minor_units,
            self.pricing.currency.clone(),
            self.pricing.order_expiry_minutes,
            Timestamp::now(),
        )?;

        // 3. Register with the provider
        let result = gateway.create_order(&order).await.map_err(|e| {
            tracing::error!(
                account_id = %cmd.account_id,
                order_id = %order.order_id,
                provider = %cmd.provider,
                retryable = e.is_retryable(),
                error = %e,
                "Payment order creation failed"
            );
            SubscriptionError::from(e)
        })?;

        tracing::info!(
            account_id = %cmd.account_id,
            order_id = %order.order_id,
            provider = %cmd.provider,
            "Payment order created"
        );

        Ok(CreateOrderResult {
            order,
            checkout: result.checkout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAccountRepository;
    use crate::adapters::payments::MockPaymentGateway;
    use crate::domain::subscription::{Account, OrderId};
    use crate::ports::GatewayError;

    fn id(n: i64) -> AccountId {
        AccountId::new(n).unwrap()
    }

    fn pricing() -> PlanPricing {
        PlanPricing {
            amount_minor_units: 49_900,
            currency: "INR".to_string(),
            order_expiry_minutes: 30,
        }
    }

    fn handler(gateway: MockPaymentGateway) -> CreateOrderHandler {
        let repo = InMemoryAccountRepository::new().with_account(Account::free(id(42)));
        CreateOrderHandler::new(
            Arc::new(repo),
            PaymentGateways::new().with_gateway(Arc::new(gateway)),
            pricing(),
        )
    }

    #[tokio::test]
    async fn creates_order_routed_to_account() {
        let gateway = MockPaymentGateway::new(PaymentProvider::Cashfree);
        let handler = handler(gateway.clone());

        let result = handler
            .handle(CreateOrderCommand {
                account_id: id(42),
                provider: PaymentProvider::Cashfree,
            })
            .await
            .unwrap();

        let parsed = OrderId::parse(&result.order.order_id.to_string()).unwrap();
        assert_eq!(parsed.account_id(), id(42));
        assert_eq!(parsed.provider(), PaymentProvider::Cashfree);
        assert_eq!(result.order.amount_minor_units, 49_900);
        assert_eq!(
            result.order.expires_at,
            result.order.created_at.add_minutes(30)
        );
        assert_eq!(gateway.created_orders().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let handler = handler(MockPaymentGateway::new(PaymentProvider::Cashfree));

        let err = handler
            .handle(CreateOrderCommand {
                account_id: id(42),
                provider: PaymentProvider::PhonePe,
            })
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::ProviderUnavailable(PaymentProvider::PhonePe));
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let handler = handler(MockPaymentGateway::new(PaymentProvider::Cashfree));

        let err = handler
            .handle(CreateOrderCommand {
                account_id: id(7),
                provider: PaymentProvider::Cashfree,
            })
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::AccountNotFound(id(7)));
    }

    #[tokio::test]
    async fn gateway_failure_is_normalized() {
        let gateway = MockPaymentGateway::new(PaymentProvider::Cashfree).with_create_error(
            GatewayError::ambiguous(PaymentProvider::Cashfree, "read timed out"),
        );
        let handler = handler(gateway);

        let err = handler
            .handle(CreateOrderCommand {
                account_id: id(42),
                provider: PaymentProvider::Cashfree,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::AmbiguousProviderFailure { .. }));
        assert!(!err.is_retryable());
    }
}
