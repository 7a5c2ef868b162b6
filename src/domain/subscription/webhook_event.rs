//! Verified webhook events.
//!
//! Scheme detection looks only at which signature headers are present.
//! Payload fields are parsed after the signature has been checked, and the
//! provider is always the one implied by the scheme, never by the payload.

use serde::Deserialize;
use serde_json::Value;

use super::webhook_errors::WebhookError;
use super::PaymentProvider;

/// Scheme A signature header.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";
/// Scheme A timestamp header.
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";
/// Scheme B checksum header.
pub const VERIFY_HEADER: &str = "x-verify";

/// Signature-relevant headers lifted off an inbound webhook request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub signature: Option<Vec<u8>>,
    pub timestamp: Option<String>,
    pub x_verify: Option<Vec<u8>>,
}

/// Signature scheme, and by extension the provider, of a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookScheme {
    /// HMAC over timestamp and raw body.
    HmacTimestamped,
    /// Salted SHA-256 over a base64 payload.
    SaltedChecksum,
}

impl WebhookScheme {
    /// Picks the scheme from the headers present.
    pub fn detect(headers: &WebhookHeaders) -> Result<Self, WebhookError> {
        match (headers.signature.is_some(), headers.x_verify.is_some()) {
            (true, false) => Ok(WebhookScheme::HmacTimestamped),
            (false, true) => Ok(WebhookScheme::SaltedChecksum),
            (true, true) => Err(WebhookError::ConflictingSchemes),
            (false, false) => Err(WebhookError::UnrecognizedProvider),
        }
    }

    pub fn provider(&self) -> PaymentProvider {
        match self {
            WebhookScheme::HmacTimestamped => PaymentProvider::Cashfree,
            WebhookScheme::SaltedChecksum => PaymentProvider::PhonePe,
        }
    }
}

/// Payment result carried by a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPaymentStatus {
    Success,
    Failed,
    Other(String),
}

impl WebhookPaymentStatus {
    fn from_cashfree(status: &str) -> Self {
        match status {
            "SUCCESS" => WebhookPaymentStatus::Success,
            "FAILED" => WebhookPaymentStatus::Failed,
            other => WebhookPaymentStatus::Other(other.to_string()),
        }
    }

    fn from_phonepe(code: &str) -> Self {
        match code {
            "PAYMENT_SUCCESS" => WebhookPaymentStatus::Success,
            "PAYMENT_ERROR" | "PAYMENT_DECLINED" => WebhookPaymentStatus::Failed,
            other => WebhookPaymentStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookPaymentStatus::Success => "SUCCESS",
            WebhookPaymentStatus::Failed => "FAILED",
            WebhookPaymentStatus::Other(s) => s,
        }
    }
}

/// A webhook whose signature has been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedWebhook {
    pub provider: PaymentProvider,
    pub order_id: String,
    pub payment_status: WebhookPaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub raw_payload: Value,
}

// Scheme A payload: {"type": ..., "data": {"order": {...}, "payment": {...}}}

#[derive(Debug, Deserialize)]
struct HmacPayload {
    data: HmacPayloadData,
}

#[derive(Debug, Deserialize)]
struct HmacPayloadData {
    order: Option<HmacPayloadOrder>,
    payment: Option<HmacPayloadPayment>,
}

#[derive(Debug, Deserialize)]
struct HmacPayloadOrder {
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HmacPayloadPayment {
    payment_status: Option<String>,
    cf_payment_id: Option<Value>,
}

// Scheme B decoded payload: {"code": ..., "data": {"merchantTransactionId": ..., "transactionId": ...}}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChecksumPayload {
    code: Option<String>,
    data: Option<ChecksumPayloadData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChecksumPayloadData {
    merchant_transaction_id: Option<String>,
    transaction_id: Option<String>,
}

impl VerifiedWebhook {
    /// Parses a verified Scheme A body.
    pub fn from_hmac_payload(body: &[u8]) -> Result<Self, WebhookError> {
        let raw_payload: Value =
            serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let payload: HmacPayload = serde_json::from_value(raw_payload.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let order_id = payload
            .data
            .order
            .and_then(|o| o.order_id)
            .filter(|id| !id.is_empty())
            .ok_or(WebhookError::MissingField("data.order.order_id"))?;

        let payment = payload
            .data
            .payment
            .ok_or(WebhookError::MissingField("data.payment"))?;
        let status = payment
            .payment_status
            .ok_or(WebhookError::MissingField("data.payment.payment_status"))?;

        Ok(Self {
            provider: PaymentProvider::Cashfree,
            order_id,
            payment_status: WebhookPaymentStatus::from_cashfree(&status),
            provider_transaction_id: payment.cf_payment_id.map(value_to_id),
            raw_payload,
        })
    }

    /// Parses a verified, base64-decoded Scheme B payload.
    pub fn from_checksum_payload(decoded: &[u8]) -> Result<Self, WebhookError> {
        let raw_payload: Value = serde_json::from_slice(decoded)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let payload: ChecksumPayload = serde_json::from_value(raw_payload.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let code = payload.code.ok_or(WebhookError::MissingField("code"))?;
        let data = payload.data.ok_or(WebhookError::MissingField("data"))?;
        let order_id = data
            .merchant_transaction_id
            .filter(|id| !id.is_empty())
            .ok_or(WebhookError::MissingField("data.merchantTransactionId"))?;

        Ok(Self {
            provider: PaymentProvider::PhonePe,
            order_id,
            payment_status: WebhookPaymentStatus::from_phonepe(&code),
            provider_transaction_id: data.transaction_id,
            raw_payload,
        })
    }
}

fn value_to_id(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(sig: bool, ts: bool, verify: bool) -> WebhookHeaders {
        WebhookHeaders {
            signature: sig.then(|| b"sig".to_vec()),
            timestamp: ts.then(|| "1700000000".to_string()),
            x_verify: verify.then(|| b"abc###1".to_vec()),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Scheme detection
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn detects_hmac_scheme_from_signature_header() {
        let scheme = WebhookScheme::detect(&headers(true, true, false)).unwrap();
        assert_eq!(scheme, WebhookScheme::HmacTimestamped);
        assert_eq!(scheme.provider(), PaymentProvider::Cashfree);
    }

    #[test]
    fn detects_checksum_scheme_from_x_verify() {
        let scheme = WebhookScheme::detect(&headers(false, false, true)).unwrap();
        assert_eq!(scheme, WebhookScheme::SaltedChecksum);
        assert_eq!(scheme.provider(), PaymentProvider::PhonePe);
    }

    #[test]
    fn no_signature_headers_is_unrecognized() {
        let result = WebhookScheme::detect(&headers(false, true, false));
        assert!(matches!(result, Err(WebhookError::UnrecognizedProvider)));
    }

    #[test]
    fn both_schemes_conflict() {
        let result = WebhookScheme::detect(&headers(true, true, true));
        assert!(matches!(result, Err(WebhookError::ConflictingSchemes)));
    }

    // ══════════════════════════════════════════════════════════════
    // Scheme A payload
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_hmac_success_payload() {
        let body = br#"{
            "type": "PAYMENT_SUCCESS_WEBHOOK",
            "data": {
                "order": {"order_id": "ORDER_42_1700000000000", "order_amount": 499.0},
                "payment": {"cf_payment_id": 885412, "payment_status": "SUCCESS"}
            }
        }"#;

        let event = VerifiedWebhook::from_hmac_payload(body).unwrap();

        assert_eq!(event.provider, PaymentProvider::Cashfree);
        assert_eq!(event.order_id, "ORDER_42_1700000000000");
        assert_eq!(event.payment_status, WebhookPaymentStatus::Success);
        assert_eq!(event.provider_transaction_id.as_deref(), Some("885412"));
    }

    #[test]
    fn hmac_payload_unknown_status_is_other() {
        let body = br#"{"data":{"order":{"order_id":"ORDER_1_1"},"payment":{"payment_status":"USER_DROPPED"}}}"#;
        let event = VerifiedWebhook::from_hmac_payload(body).unwrap();
        assert_eq!(
            event.payment_status,
            WebhookPaymentStatus::Other("USER_DROPPED".to_string())
        );
    }

    #[test]
    fn hmac_payload_missing_order_id_fails() {
        let body = br#"{"data":{"payment":{"payment_status":"SUCCESS"}}}"#;
        let result = VerifiedWebhook::from_hmac_payload(body);
        assert!(matches!(
            result,
            Err(WebhookError::MissingField("data.order.order_id"))
        ));
    }

    #[test]
    fn hmac_payload_not_json_fails() {
        let result = VerifiedWebhook::from_hmac_payload(b"<xml/>");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Scheme B payload
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_checksum_success_payload() {
        let decoded = br#"{
            "success": true,
            "code": "PAYMENT_SUCCESS",
            "data": {"merchantTransactionId": "TXN_7_1700000000000", "transactionId": "T2311"}
        }"#;

        let event = VerifiedWebhook::from_checksum_payload(decoded).unwrap();

        assert_eq!(event.provider, PaymentProvider::PhonePe);
        assert_eq!(event.order_id, "TXN_7_1700000000000");
        assert_eq!(event.payment_status, WebhookPaymentStatus::Success);
        assert_eq!(event.provider_transaction_id.as_deref(), Some("T2311"));
    }

    #[test]
    fn checksum_payment_error_is_failed() {
        let decoded = br#"{"code":"PAYMENT_ERROR","data":{"merchantTransactionId":"TXN_7_1"}}"#;
        let event = VerifiedWebhook::from_checksum_payload(decoded).unwrap();
        assert_eq!(event.payment_status, WebhookPaymentStatus::Failed);
    }

    #[test]
    fn checksum_payload_missing_transaction_fails() {
        let decoded = br#"{"code":"PAYMENT_SUCCESS","data":{}}"#;
        let result = VerifiedWebhook::from_checksum_payload(decoded);
        assert!(matches!(
            result,
            Err(WebhookError::MissingField("data.merchantTransactionId"))
        ));
    }
}
