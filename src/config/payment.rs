//! Payment configuration
//!
//! Provider sections are optional. A provider whose section is missing or
//! incomplete is reported as unavailable at runtime; the service still starts.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Path providers call back on.
pub const WEBHOOK_PATH: &str = "/api/webhooks/payments";

/// Payment configuration shared by all providers
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Which provider endpoints to call
    #[serde(default)]
    pub environment: PaymentEnvironment,

    /// Public URL of the client application (return/redirect target)
    #[serde(default)]
    pub client_base_url: String,

    /// Public URL of this service, for provider callbacks. Defaults to `client_base_url`.
    pub api_base_url: Option<String>,

    /// Plan price in minor units (paise)
    #[serde(default = "default_amount")]
    pub amount_minor_units: i64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_order_expiry")]
    pub order_expiry_minutes: i64,

    /// Timeout for every outbound provider call, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Replay window for timestamped webhooks. Disabled when unset.
    pub max_webhook_age_secs: Option<i64>,

    /// Phone number sent where a provider requires one and the account has none
    #[serde(default = "default_customer_phone")]
    pub default_customer_phone: String,

    pub cashfree: Option<CashfreeConfig>,
    pub phonepe: Option<PhonePeConfig>,
    pub rupeepayments: Option<RupeePaymentsConfig>,
}

/// Provider endpoint set
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentEnvironment {
    #[default]
    Sandbox,
    Production,
}

/// Cashfree credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CashfreeConfig {
    #[serde(default)]
    pub app_id: String,

    pub secret_key: Option<SecretString>,

    /// Webhook signing secret. Cashfree signs with the API secret unless overridden.
    pub webhook_secret: Option<SecretString>,

    #[serde(default = "default_cashfree_api_version")]
    pub api_version: String,
}

/// PhonePe credentials
#[derive(Debug, Clone, Deserialize)]
pub struct PhonePeConfig {
    #[serde(default)]
    pub merchant_id: String,

    pub salt_key: Option<SecretString>,

    #[serde(default = "default_salt_index")]
    pub salt_index: String,
}

/// RupeePayments settings
#[derive(Debug, Clone, Deserialize)]
pub struct RupeePaymentsConfig {
    /// Static payment page the user is sent to
    #[serde(default)]
    pub checkout_url: String,
}

impl CashfreeConfig {
    /// True when both API credentials are present.
    pub fn is_complete(&self) -> bool {
        !self.app_id.trim().is_empty() && is_present(self.secret_key.as_ref())
    }

    /// Secret used to verify webhook signatures.
    pub fn webhook_signing_secret(&self) -> Option<&SecretString> {
        self.webhook_secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
            .or(self.secret_key.as_ref())
            .filter(|s| !s.expose_secret().trim().is_empty())
    }
}

impl PhonePeConfig {
    /// True when merchant id, salt key and salt index are all present.
    pub fn is_complete(&self) -> bool {
        !self.merchant_id.trim().is_empty()
            && is_present(self.salt_key.as_ref())
            && !self.salt_index.trim().is_empty()
    }
}

impl RupeePaymentsConfig {
    pub fn is_complete(&self) -> bool {
        !self.checkout_url.trim().is_empty()
    }
}

impl PaymentConfig {
    /// Callback URL registered with providers.
    pub fn notify_url(&self) -> String {
        let base = self
            .api_base_url
            .as_deref()
            .unwrap_or(&self.client_base_url)
            .trim_end_matches('/');
        format!("{}{}", base, WEBHOOK_PATH)
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.client_base_url.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__CLIENT_BASE_URL"));
        }
        check_url(&self.client_base_url, "client_base_url", environment)?;
        if let Some(api_base_url) = &self.api_base_url {
            check_url(api_base_url, "api_base_url", environment)?;
        }

        if self.amount_minor_units <= 0 {
            return Err(ValidationError::InvalidAmount);
        }
        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if !(1..=1440).contains(&self.order_expiry_minutes) {
            return Err(ValidationError::InvalidOrderExpiry);
        }
        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if matches!(self.max_webhook_age_secs, Some(age) if age <= 0) {
            return Err(ValidationError::InvalidWebhookAge);
        }

        if let Some(rupee) = &self.rupeepayments {
            if rupee.is_complete() {
                check_url(&rupee.checkout_url, "rupeepayments.checkout_url", environment)?;
            }
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            environment: PaymentEnvironment::default(),
            client_base_url: String::new(),
            api_base_url: None,
            amount_minor_units: default_amount(),
            currency: default_currency(),
            order_expiry_minutes: default_order_expiry(),
            provider_timeout_secs: default_provider_timeout(),
            max_webhook_age_secs: None,
            default_customer_phone: default_customer_phone(),
            cashfree: None,
            phonepe: None,
            rupeepayments: None,
        }
    }
}

fn is_present(secret: Option<&SecretString>) -> bool {
    secret
        .map(|s| !s.expose_secret().trim().is_empty())
        .unwrap_or(false)
}

fn check_url(url: &str, name: &'static str, environment: Environment) -> Result<(), ValidationError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::InvalidUrl(name));
    }
    if environment == Environment::Production && !url.starts_with("https://") {
        return Err(ValidationError::MustBeHttps(name));
    }
    Ok(())
}

fn default_amount() -> i64 {
    49_900
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_order_expiry() -> i64 {
    30
}

fn default_provider_timeout() -> u64 {
    15
}

fn default_customer_phone() -> String {
    "9999999999".to_string()
}

fn default_cashfree_api_version() -> String {
    "2023-08-01".to_string()
}

fn default_salt_index() -> String {
    "1".to_string()
}
