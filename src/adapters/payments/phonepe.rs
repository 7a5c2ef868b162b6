//! PhonePe payment gateway adapter.
//!
//! Pay requests are a base64 JSON payload wrapped as `{"request": ...}` and
//! signed with the salted checksum over `payload + "/pg/v1/pay"`. The
//! payment outcome arrives by webhook; there is no synchronous check here.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{PaymentConfig, PaymentEnvironment, PhonePeConfig};
use crate::domain::subscription::webhook_signature::salted_checksum;
use crate::domain::subscription::{Order, PaymentProvider};
use crate::ports::{CheckoutTarget, GatewayError, OrderResult, PaymentGateway, PaymentOutcome};

use super::{build_http_client, classify_error_status, classify_send_error};

const SANDBOX_BASE_URL: &str = "https://api-preprod.phonepe.com/apis/pg-sandbox";
const PRODUCTION_BASE_URL: &str = "https://api.phonepe.com/apis/hermes";
const PAY_PATH: &str = "/pg/v1/pay";

const PROVIDER: PaymentProvider = PaymentProvider::PhonePe;

/// PhonePe API configuration.
#[derive(Clone)]
pub struct PhonePeGatewayConfig {
    merchant_id: String,
    salt_key: SecretString,
    salt_index: String,
    api_base_url: String,
    notify_url: String,
    client_base_url: String,
    timeout: Duration,
}

impl PhonePeGatewayConfig {
    /// Create a configuration pointing at the sandbox.
    pub fn new(
        merchant_id: impl Into<String>,
        salt_key: impl Into<String>,
        salt_index: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            salt_key: SecretString::new(salt_key.into()),
            salt_index: salt_index.into(),
            api_base_url: SANDBOX_BASE_URL.to_string(),
            notify_url: String::new(),
            client_base_url: String::new(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Build from application configuration.
    ///
    /// Returns `None` when credentials are incomplete.
    pub fn from_app_config(payment: &PaymentConfig, phonepe: &PhonePeConfig) -> Option<Self> {
        if !phonepe.is_complete() {
            return None;
        }
        let salt_key = phonepe.salt_key.as_ref()?;
        let base = match payment.environment {
            PaymentEnvironment::Sandbox => SANDBOX_BASE_URL,
            PaymentEnvironment::Production => PRODUCTION_BASE_URL,
        };
        Some(Self {
            merchant_id: phonepe.merchant_id.clone(),
            salt_key: salt_key.clone(),
            salt_index: phonepe.salt_index.clone(),
            api_base_url: base.to_string(),
            notify_url: payment.notify_url(),
            client_base_url: payment.client_base_url.clone(),
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
}

/// PhonePe gateway.
pub struct PhonePeGateway {
    config: PhonePeGatewayConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayPayload {
    merchant_id: String,
    merchant_transaction_id: String,
    merchant_user_id: String,
    amount: i64,
    redirect_url: String,
    redirect_mode: &'static str,
    callback_url: String,
    payment_instrument: PaymentInstrument,
}

#[derive(Debug, Serialize)]
struct PaymentInstrument {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct PayRequest {
    request: String,
}

#[derive(Debug, Deserialize)]
struct PayResponse {
    #[serde(default)]
    success: bool,
    code: Option<String>,
    message: Option<String>,
    data: Option<PayResponseData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayResponseData {
    instrument_response: Option<InstrumentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentResponse {
    redirect_info: Option<RedirectInfo>,
}

#[derive(Debug, Deserialize)]
struct RedirectInfo {
    url: Option<String>,
}

impl PhonePeGateway {
    /// Create a new adapter.
    pub fn new(config: PhonePeGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = build_http_client(PROVIDER, config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Encodes the pay payload and its `X-VERIFY` header.
    fn signed_request(&self, order: &Order) -> Result<(PayRequest, String), GatewayError> {
        let order_id = order.order_id.to_string();
        let payload = PayPayload {
            merchant_id: self.config.merchant_id.clone(),
            merchant_user_id: format!("MUID{}", order.account_id),
            amount: order.amount_minor_units,
            redirect_url: format!(
                "{}/subscription/return?order_id={}",
                self.config.client_base_url.trim_end_matches('/'),
                order_id
            ),
            redirect_mode: "REDIRECT",
            callback_url: self.config.notify_url.clone(),
            payment_instrument: PaymentInstrument { kind: "PAY_PAGE" },
            merchant_transaction_id: order_id,
        };

        let json = serde_json::to_vec(&payload).map_err(|e| {
            GatewayError::order_creation_failed(PROVIDER, format!("payload encoding: {}", e))
        })?;
        let encoded = BASE64.encode(json);
        let x_verify = salted_checksum(
            &format!("{}{}", encoded, PAY_PATH),
            self.config.salt_key.expose_secret(),
            &self.config.salt_index,
        );

        Ok((PayRequest { request: encoded }, x_verify))
    }
}

#[async_trait]
impl PaymentGateway for PhonePeGateway {
    fn provider(&self) -> PaymentProvider {
        PROVIDER
    }

    async fn create_order(&self, order: &Order) -> Result<OrderResult, GatewayError> {
        let (request, x_verify) = self.signed_request(order)?;
        let url = format!("{}{}", self.config.api_base_url, PAY_PATH);

        let response = self
            .http_client
            .post(&url)
            .header("X-VERIFY", x_verify)
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let err = classify_send_error(PROVIDER, &e);
                tracing::warn!(
                    order_id = %order.order_id,
                    kind = ?err.kind,
                    error = %e,
                    "PhonePe pay request failed"
                );
                err
            })?;

        let status = response.status();
        let body: Result<PayResponse, _> = response.json().await;

        let body = match body {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(GatewayError::ambiguous(
                    PROVIDER,
                    format!("unreadable pay response: {}", e),
                ));
            }
            Err(_) => {
                tracing::error!(order_id = %order.order_id, status = status.as_u16(), "PhonePe rejected pay request");
                return Err(classify_error_status(PROVIDER, status, format!("HTTP {}", status)));
            }
        };

        if !status.is_success() || !body.success {
            let message = body.message.unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!(
                order_id = %order.order_id,
                status = status.as_u16(),
                error = %message,
                "PhonePe rejected pay request"
            );
            let mut err = classify_error_status(PROVIDER, status, message);
            if let Some(code) = body.code {
                err = err.with_provider_code(code);
            }
            return Err(err);
        }

        let url = body
            .data
            .and_then(|d| d.instrument_response)
            .and_then(|i| i.redirect_info)
            .and_then(|r| r.url)
            .ok_or_else(|| GatewayError::ambiguous(PROVIDER, "pay response missing redirect url"))?;

        Ok(OrderResult {
            order_id: order.order_id.to_string(),
            checkout: CheckoutTarget::Redirect { url },
        })
    }

    async fn verify_order(&self, order_id: &str) -> Result<PaymentOutcome, GatewayError> {
        tracing::debug!(order_id, "PhonePe outcome is delivered by webhook");
        Ok(PaymentOutcome::Inconclusive {
            reason: "awaiting webhook confirmation".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::payments::test_support;
    use crate::domain::foundation::{AccountId, Timestamp};
    use crate::ports::GatewayErrorKind;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    const SALT_KEY: &str = "099eb0cd-02cf-4e2a-8aca-3e6c6aff0399";

    fn order() -> Order {
        Order::new(
            PaymentProvider::PhonePe,
            AccountId::new(7).unwrap(),
            49_900,
            "INR",
            30,
            Timestamp::from_unix_millis(1_700_000_000_000).unwrap(),
        )
        .unwrap()
    }

    fn gateway(base: &str) -> PhonePeGateway {
        let config = PhonePeGatewayConfig::new("MERCHANTUAT", SALT_KEY, "1")
            .with_base_url(base)
            .with_urls("https://app.example.in", "https://api.example.in/api/webhooks/payments")
            .with_timeout(Duration::from_millis(300));
        PhonePeGateway::new(config).unwrap()
    }

    #[test]
    fn signed_request_checksum_covers_payload_and_path() {
        let gateway = gateway("http://unused");
        let (request, x_verify) = gateway.signed_request(&order()).unwrap();

        let expected = salted_checksum(&format!("{}/pg/v1/pay", request.request), SALT_KEY, "1");
        assert_eq!(x_verify, expected);
        assert!(x_verify.ends_with("###1"));

        let decoded: Value =
            serde_json::from_slice(&BASE64.decode(&request.request).unwrap()).unwrap();
        assert_eq!(decoded["merchantId"], "MERCHANTUAT");
        assert_eq!(decoded["merchantTransactionId"], "TXN_7_1700000000000");
        assert_eq!(decoded["merchantUserId"], "MUID7");
        assert_eq!(decoded["amount"], 49_900);
        assert_eq!(decoded["redirectMode"], "REDIRECT");
        assert_eq!(
            decoded["callbackUrl"],
            "https://api.example.in/api/webhooks/payments"
        );
        assert_eq!(decoded["paymentInstrument"]["type"], "PAY_PAGE");
    }

    #[tokio::test]
    async fn create_order_returns_redirect() {
        let router = Router::new().route(
            "/pg/v1/pay",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert!(headers.contains_key("x-verify"));
                assert!(body["request"].is_string());
                Json(json!({
                    "success": true,
                    "code": "PAYMENT_INITIATED",
                    "data": {
                        "instrumentResponse": {
                            "type": "PAY_PAGE",
                            "redirectInfo": {"url": "https://mercury.phonepe.com/pay/abc", "method": "GET"}
                        }
                    }
                }))
            }),
        );
        let base = test_support::serve(router).await;

        let result = gateway(&base).create_order(&order()).await.unwrap();

        assert_eq!(
            result.checkout,
            CheckoutTarget::Redirect {
                url: "https://mercury.phonepe.com/pay/abc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn create_order_unsuccessful_response_fails_with_code() {
        let router = Router::new().route(
            "/pg/v1/pay",
            post(|| async {
                Json(json!({"success": false, "code": "BAD_REQUEST", "message": "Invalid merchant"}))
            }),
        );
        let base = test_support::serve(router).await;

        let err = gateway(&base).create_order(&order()).await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::OrderCreationFailed);
        assert_eq!(err.provider_code.as_deref(), Some("BAD_REQUEST"));
    }

    #[tokio::test]
    async fn create_order_gateway_timeout_status_is_ambiguous() {
        let router = Router::new().route(
            "/pg/v1/pay",
            post(|| async {
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(json!({"success": false, "code": "INTERNAL_SERVER_ERROR"})),
                )
            }),
        );
        let base = test_support::serve(router).await;

        let err = gateway(&base).create_order(&order()).await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Ambiguous);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn create_order_server_error_without_body_is_ambiguous() {
        let router = Router::new().route("/pg/v1/pay", post(|| async { StatusCode::BAD_GATEWAY }));
        let base = test_support::serve(router).await;

        let err = gateway(&base).create_order(&order()).await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Ambiguous);
    }

    #[tokio::test]
    async fn create_order_timeout_is_ambiguous() {
        let base = test_support::black_hole().await;

        let err = gateway(&base).create_order(&order()).await.unwrap_err();

        assert_eq!(err.kind, GatewayErrorKind::Ambiguous);
    }

    #[tokio::test]
    async fn verify_order_awaits_webhook() {
        let outcome = gateway("http://unused")
            .verify_order("TXN_7_1700000000000")
            .await
            .unwrap();
        assert!(matches!(outcome, PaymentOutcome::Inconclusive { .. }));
    }
}
