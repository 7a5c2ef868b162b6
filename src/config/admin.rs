//! Admin API configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

const MIN_API_KEY_LEN: usize = 32;

/// Admin endpoint access. The endpoints are disabled when no key is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Bearer token operators present on `/api/admin/*`
    pub api_key: Option<SecretString>,
}

impl AdminConfig {
    /// Configured key, ignoring blank values.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
    }

    /// Validate admin configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = self.api_key() {
            if key.expose_secret().len() < MIN_API_KEY_LEN {
                return Err(ValidationError::AdminKeyTooShort);
            }
        }
        Ok(())
    }
}
