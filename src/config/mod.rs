//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `SUBSCRIPTION_PAYMENTS`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use subscription_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod admin;
mod database;
mod error;
mod payment;
mod server;

pub use admin::AdminConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{
    CashfreeConfig, PaymentConfig, PaymentEnvironment, PhonePeConfig, RupeePaymentsConfig,
    WEBHOOK_PATH,
};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SUBSCRIPTION_PAYMENTS";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection. In-memory storage is used when absent.
    pub database: Option<DatabaseConfig>,

    /// Plan pricing, URLs and provider credentials
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Operator endpoints
    #[serde(default)]
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `SUBSCRIPTION_PAYMENTS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_PAYMENTS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SUBSCRIPTION_PAYMENTS__PAYMENT__CASHFREE__APP_ID=...` -> `payment.cashfree.app_id = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Provider credentials are not required here. Missing ones make that
    /// provider unavailable instead of stopping the process.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.payment.validate(self.server.environment)?;
        self.admin.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "SUBSCRIPTION_PAYMENTS__PAYMENT__CLIENT_BASE_URL",
        "SUBSCRIPTION_PAYMENTS__PAYMENT__CASHFREE__APP_ID",
        "SUBSCRIPTION_PAYMENTS__PAYMENT__CASHFREE__SECRET_KEY",
        "SUBSCRIPTION_PAYMENTS__PAYMENT__MAX_WEBHOOK_AGE_SECS",
        "SUBSCRIPTION_PAYMENTS__DATABASE__URL",
        "SUBSCRIPTION_PAYMENTS__SERVER__PORT",
        "SUBSCRIPTION_PAYMENTS__SERVER__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        env::set_var(
            "SUBSCRIPTION_PAYMENTS__PAYMENT__CLIENT_BASE_URL",
            "http://localhost:5173",
        );
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.payment.client_base_url, "http://localhost:5173");
        assert!(config.database.is_none());
        assert!(config.payment.cashfree.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nested_provider_credentials() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_PAYMENTS__PAYMENT__CASHFREE__APP_ID", "cf-app");
        env::set_var("SUBSCRIPTION_PAYMENTS__PAYMENT__CASHFREE__SECRET_KEY", "cf-secret");
        env::set_var("SUBSCRIPTION_PAYMENTS__PAYMENT__MAX_WEBHOOK_AGE_SECS", "300");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let cashfree = config.payment.cashfree.expect("cashfree section");
        assert_eq!(cashfree.app_id, "cf-app");
        assert_eq!(
            cashfree.secret_key.as_ref().map(|s| s.expose_secret().as_str()),
            Some("cf-secret")
        );
        assert!(cashfree.is_complete());
        assert_eq!(config.payment.max_webhook_age_secs, Some(300));
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_PAYMENTS__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        // http client URL is not allowed in production
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_section_is_validated_when_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_PAYMENTS__DATABASE__URL", "mysql://nope");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.validate(), Err(ValidationError::InvalidDatabaseUrl));
    }
}
