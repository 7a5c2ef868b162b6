//! Provider lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PaymentConfig;
use crate::domain::subscription::{PaymentProvider, SubscriptionError};
use crate::ports::{GatewayError, PaymentGateway};

use super::{
    CashfreeGateway, CashfreeGatewayConfig, PhonePeGateway, PhonePeGatewayConfig,
    RupeePaymentsGateway,
};

/// Configured gateways keyed by provider.
///
/// A provider absent from the set is reported as unavailable rather than
/// failing startup.
#[derive(Clone, Default)]
pub struct PaymentGateways {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
}

impl PaymentGateways {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every provider whose credentials are complete.
    pub fn from_config(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let mut gateways = Self::new();

        match config
            .cashfree
            .as_ref()
            .and_then(|c| CashfreeGatewayConfig::from_app_config(config, c))
        {
            Some(cf) => gateways = gateways.with_gateway(Arc::new(CashfreeGateway::new(cf)?)),
            None => tracing::warn!(provider = "cashfree", "Provider credentials missing; provider disabled"),
        }

        match config
            .phonepe
            .as_ref()
            .and_then(|p| PhonePeGatewayConfig::from_app_config(config, p))
        {
            Some(pp) => gateways = gateways.with_gateway(Arc::new(PhonePeGateway::new(pp)?)),
            None => tracing::warn!(provider = "phonepe", "Provider credentials missing; provider disabled"),
        }

        match config
            .rupeepayments
            .as_ref()
            .and_then(RupeePaymentsGateway::from_app_config)
        {
            Some(rp) => gateways = gateways.with_gateway(Arc::new(rp)),
            None => tracing::warn!(provider = "rupeepayments", "Checkout URL missing; provider disabled"),
        }

        Ok(gateways)
    }

    /// Registers `gateway` under its own provider, replacing any previous one.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.provider(), gateway);
        self
    }

    pub fn get(&self, provider: PaymentProvider) -> Result<Arc<dyn PaymentGateway>, SubscriptionError> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| SubscriptionError::provider_unavailable(provider))
    }

    pub fn is_available(&self, provider: PaymentProvider) -> bool {
        self.gateways.contains_key(&provider)
    }

    /// Providers with a registered gateway, in declaration order.
    pub fn available(&self) -> Vec<PaymentProvider> {
        PaymentProvider::ALL
            .into_iter()
            .filter(|p| self.is_available(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::payments::MockPaymentGateway;
    use crate::config::{CashfreeConfig, RupeePaymentsConfig};
    use secrecy::SecretString;

    #[test]
    fn missing_provider_is_unavailable() {
        let gateways = PaymentGateways::new()
            .with_gateway(Arc::new(MockPaymentGateway::new(PaymentProvider::Cashfree)));

        assert!(gateways.get(PaymentProvider::Cashfree).is_ok());
        assert_eq!(
            gateways.get(PaymentProvider::PhonePe).err(),
            Some(SubscriptionError::ProviderUnavailable(PaymentProvider::PhonePe))
        );
    }

    #[test]
    fn from_config_skips_incomplete_providers() {
        let config = PaymentConfig {
            client_base_url: "https://app.example.in".to_string(),
            cashfree: Some(CashfreeConfig {
                app_id: "app".to_string(),
                secret_key: Some(SecretString::new("secret".to_string())),
                webhook_secret: None,
                api_version: "2023-08-01".to_string(),
            }),
            phonepe: None,
            rupeepayments: Some(RupeePaymentsConfig {
                checkout_url: String::new(),
            }),
            ..Default::default()
        };

        let gateways = PaymentGateways::from_config(&config).unwrap();

        assert_eq!(gateways.available(), vec![PaymentProvider::Cashfree]);
    }
}
