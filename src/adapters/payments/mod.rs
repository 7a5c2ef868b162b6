//! Payment provider adapters.
//!
//! Implements the `PaymentGateway` port for each supported provider:
//! - `cashfree` - hosted checkout with a pollable payments API
//! - `phonepe` - signed pay-page requests, outcome via webhook
//! - `rupeepayments` - static payment page, operator confirmation
//!
//! # Failure normalization
//!
//! Transport failures are classified before leaving the adapter:
//! - connect refused or timed out, or the provider answered 4xx:
//!   `OrderCreationFailed`, safe to retry
//! - timeout after connecting, failure after the request was sent, a 5xx,
//!   or a success status with an unreadable body: `Ambiguous`, not safe to retry
//!
//! # Security
//!
//! - Credentials are held as `secrecy::SecretString`
//! - Every outbound call has a finite timeout

mod cashfree;
mod mock_gateway;
mod phonepe;
mod registry;
mod rupeepayments;

pub use cashfree::{CashfreeGateway, CashfreeGatewayConfig};
pub use mock_gateway::MockPaymentGateway;
pub use phonepe::{PhonePeGateway, PhonePeGatewayConfig};
pub use registry::PaymentGateways;
pub use rupeepayments::RupeePaymentsGateway;

use std::time::Duration;

use crate::domain::subscription::PaymentProvider;
use crate::ports::{GatewayError, PaymentOutcome};

/// Builds the shared HTTP client for one provider.
pub(crate) fn build_http_client(
    provider: PaymentProvider,
    timeout: Duration,
) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| GatewayError::configuration(provider, format!("HTTP client: {}", e)))
}

/// Classifies a failed order-creation send.
pub(crate) fn classify_send_error(provider: PaymentProvider, err: &reqwest::Error) -> GatewayError {
    if err.is_connect() {
        GatewayError::order_creation_failed(provider, format!("connection failed: {}", err))
    } else if err.is_timeout() {
        GatewayError::ambiguous(provider, format!("request timed out: {}", err))
    } else {
        GatewayError::ambiguous(provider, format!("request failed after send: {}", err))
    }
}

/// Classifies an error status answered to an order-creation request.
///
/// A 5xx may arrive after the provider already created the order.
pub(crate) fn classify_error_status(
    provider: PaymentProvider,
    status: reqwest::StatusCode,
    message: impl Into<String>,
) -> GatewayError {
    if status.is_server_error() {
        GatewayError::ambiguous(provider, message)
    } else {
        GatewayError::order_creation_failed(provider, message)
    }
}

/// Maps a failed verification call to an inconclusive outcome.
pub(crate) fn inconclusive_from_send_error(err: &reqwest::Error) -> PaymentOutcome {
    let reason = if err.is_timeout() {
        "provider verification timed out".to_string()
    } else {
        format!("provider verification unavailable: {}", err)
    };
    PaymentOutcome::Inconclusive { reason }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorKind;
    use reqwest::StatusCode;

    #[test]
    fn client_error_status_is_retry_safe() {
        let err = classify_error_status(PaymentProvider::Cashfree, StatusCode::BAD_REQUEST, "bad");
        assert_eq!(err.kind, GatewayErrorKind::OrderCreationFailed);
    }

    #[test]
    fn server_error_status_is_ambiguous() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            let err = classify_error_status(PaymentProvider::PhonePe, status, "upstream");
            assert_eq!(err.kind, GatewayErrorKind::Ambiguous, "{}", status);
        }
    }

    #[tokio::test]
    async fn connect_timeout_is_retry_safe() {
        // Non-routable address: the TCP handshake never completes.
        let client = build_http_client(PaymentProvider::Cashfree, std::time::Duration::from_millis(50))
            .unwrap();
        let err = client.post("http://10.255.255.1:81/orders").send().await.unwrap_err();

        assert!(err.is_connect(), "{}", err);
        let classified = classify_send_error(PaymentProvider::Cashfree, &err);
        assert_eq!(classified.kind, GatewayErrorKind::OrderCreationFailed);
    }
}
