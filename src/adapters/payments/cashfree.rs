//! Cashfree payment gateway adapter.
//!
//! Orders are registered with `POST {base}/orders` and verified by listing
//! `GET {base}/orders/{order_id}/payments`. An order counts as paid when any
//! of its payment records reports `SUCCESS`.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{CashfreeConfig, PaymentConfig, PaymentEnvironment};
use crate::domain::subscription::{Order, PaymentProvider};
use crate::ports::{CheckoutTarget, GatewayError, OrderResult, PaymentGateway, PaymentOutcome};

use super::{
    build_http_client, classify_error_status, classify_send_error, inconclusive_from_send_error,
};

const SANDBOX_BASE_URL: &str = "https://sandbox.cashfree.com/pg";
const PRODUCTION_BASE_URL: &str = "https://api.cashfree.com/pg";

const PROVIDER: PaymentProvider = PaymentProvider::Cashfree;

/// Cashfree API configuration.
#[derive(Clone)]
pub struct CashfreeGatewayConfig {
    app_id: String,
    secret_key: SecretString,
    api_version: String,
    api_base_url: String,
    notify_url: String,
    client_base_url: String,
    customer_phone: String,
    timeout: Duration,
}

impl CashfreeGatewayConfig {
    /// Create a configuration pointing at the sandbox.
    pub fn new(app_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            secret_key: SecretString::new(secret_key.into()),
            api_version: "2023-08-01".to_string(),
            api_base_url: SANDBOX_BASE_URL.to_string(),
            notify_url: String::new(),
            client_base_url: String::new(),
            customer_phone: "9999999999".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Build from application configuration.
    ///
    /// Returns `None` when credentials are incomplete.
    pub fn from_app_config(payment: &PaymentConfig, cashfree: &CashfreeConfig) -> Option<Self> {
        if !cashfree.is_complete() {
            return None;
        }
        let secret = cashfree.secret_key.as_ref()?;
        let base = match payment.environment {
            PaymentEnvironment::Sandbox => SANDBOX_BASE_URL,
            PaymentEnvironment::Production => PRODUCTION_BASE_URL,
        };
        Some(Self {
            app_id: cashfree.app_id.clone(),
            secret_key: secret.clone(),
            api_version: cashfree.api_version.clone(),
            api_base_url: base.to_string(),
            notify_url: payment.notify_url(),
            client_base_url: payment.client_base_url.clone(),
            customer_phone: payment.default_customer_phone.clone(),
            timeout: Duration::from_secs(payment.provider_timeout_secs),
        })
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_urls(mut self, client_base_url: impl Into<String>, notify_url: impl Into<String>) -> Self {
        self.client_base_url = client_base_url.into();
        self.notify_url = notify_url.into();
        self
    }

    fn return_url(&self, order_id: &str) -> String {
        format!(
            "{}/subscription/return?order_id={}",
            self.client_base_url.trim_end_matches('/'),
            order_id
        )
    }
}

/// Cashfree gateway.
pub struct CashfreeGateway {
    config: CashfreeGatewayConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    order_id: String,
    order_amount: f64,
    order_currency: &'a str,
    customer_details: CustomerDetails,
    order_meta: OrderMeta,
    order_expiry_time: String,
}

#[derive(Debug, Serialize)]
struct CustomerDetails {
    customer_id: String,
    customer_phone: String,
}

#[derive(Debug, Serialize)]
struct OrderMeta {
    return_url: String,
    notify_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    order_id: Option<String>,
    payment_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentRecord {
    cf_payment_id: Option<serde_json::Value>,
    payment_status: Option<String>,
}

impl CashfreeGateway {
    /// Create a new adapter.
    pub fn new(config: CashfreeGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = build_http_client(PROVIDER, config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-client-id", &self.config.app_id)
            .header("x-client-secret", self.config.secret_key.expose_secret())
            .header("x-api-version", &self.config.api_version)
            .header("accept", "application/json")
    }

    fn build_request<'a>(&self, order: &'a Order) -> CreateOrderRequest<'a> {
        let order_id = order.order_id.to_string();
        CreateOrderRequest {
            order_amount: order.amount_major(),
            order_currency: &order.currency,
            customer_details: CustomerDetails {
                customer_id: format!("acct_{}", order.account_id),
                customer_phone: self.config.customer_phone.clone(),
            },
            order_meta: OrderMeta {
                return_url: self.config.return_url(&order_id),
                notify_url: self.config.notify_url.clone(),
            },
            order_expiry_time: order.expires_at.to_rfc3339(),
            order_id,
        }
    }
}

/// Reduces a payment list to one outcome.
fn outcome_from_payments(payments: &[PaymentRecord]) -> PaymentOutcome {
    if let Some(success) = payments
        .iter()
        .find(|p| p.payment_status.as_deref() == Some("SUCCESS"))
    {
        let provider_transaction_id = success.cf_payment_id.as_ref().map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        return PaymentOutcome::Succeeded {
            provider_transaction_id,
        };
    }

    if payments.is_empty() {
        return PaymentOutcome::Inconclusive {
            reason: "no payment attempts recorded yet".to_string(),
        };
    }

    let still_open = payments.iter().any(|p| {
        matches!(
            p.payment_status.as_deref(),
            Some("PENDING") | Some("NOT_ATTEMPTED") | None
        )
    });
    if still_open {
        return PaymentOutcome::Inconclusive {
            reason: "payment still pending at provider".to_string(),
        };
    }

    let last_status = payments
        .last()
        .and_then(|p| p.payment_status.clone())
        .unwrap_or_default();
    PaymentOutcome::Failed {
        reason: format!("no successful payment (last status {})", last_status),
    }
}

#[async_trait]
impl PaymentGateway for CashfreeGateway {
    fn provider(&self) -> PaymentProvider {
        PROVIDER
    }

    async fn create_order(&self, order: &Order) -> Result<OrderResult, GatewayError> {
        let url = format!("{}/orders", self.config.api_base_url);
        let request = self.build_request(order);

        let response = self
            .authorized(self.http_client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let err = classify_send_error(PROVIDER, &e);
                tracing::warn!(
                    order_id = %order.order_id,
                    kind = ?err.kind,
                    error = %e,
                    "Cashfree create order request failed"
                );
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<ErrorResponse> = response.json().await.ok();
            let message = body
                .as_ref()
                .and_then(|b| b.message.clone())
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!(
                order_id = %order.order_id,
                status = status.as_u16(),
                error = %message,
                "Cashfree rejected order"
            );
            let mut err = classify_error_status(PROVIDER, status, message);
            if let Some(code) = body.and_then(|b| b.code) {
                err = err.with_provider_code(code);
            }
            return Err(err);
        }

        let created: CreateOrderResponse = response.json().await.map_err(|e| {
            GatewayError::ambiguous(PROVIDER, format!("unreadable order response: {}", e))
        })?;

        let payment_session_id = created.payment_session_id.ok_or_else(|| {
            GatewayError::ambiguous(PROVIDER, "order response missing payment_session_id")
        })?;

        Ok(OrderResult {
            order_id: created.order_id.unwrap_or_else(|| order.order_id.to_string()),
            checkout: CheckoutTarget::PaymentSession { payment_session_id },
        })
    }

    async fn verify_order(&self, order_id: &str) -> Result<PaymentOutcome, GatewayError> {
        let url = format!("{}/orders/{}/payments", self.config.api_base_url, order_id);

        let response = match self.authorized(self.http_client.get(&url)).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Cashfree verification request failed");
                return Ok(inconclusive_from_send_error(&e));
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(PaymentOutcome::Failed {
                reason: "order not found at provider".to_string(),
            });
        }
        if !status.is_success() {
            tracing::warn!(order_id, status = status.as_u16(), "Cashfree verification returned error status");
            return Ok(PaymentOutcome::Inconclusive {
                reason: format!("provider returned HTTP {}", status.as_u16()),
            });
        }

        match response.json::<Vec<PaymentRecord>>().await {
            Ok(payments) => Ok(outcome_from_payments(&payments)),
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Cashfree payments response unreadable");
                Ok(PaymentOutcome::Inconclusive {
                    reason: "provider response could not be read".to_string(),
                })
            }
        }
    }
}
