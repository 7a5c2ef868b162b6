//! Webhook signature verification.
//!
//! Two schemes, selected by which headers the request carries:
//!
//! - Scheme A (`x-webhook-signature` + `x-webhook-timestamp`):
//!   `base64(HMAC-SHA256(secret, timestamp || raw_body))`
//! - Scheme B (`x-verify`):
//!   `hex(SHA256(base64_payload || salt_key)) + "###" + salt_index`,
//!   where the body is `{"response": "<base64_payload>"}`
//!
//! Both compare in constant time and operate on the raw request bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;

use super::webhook_errors::WebhookError;

/// Separator between checksum and salt index in Scheme B headers.
const SALT_INDEX_SEPARATOR: &str = "###";

/// Maximum allowed clock skew for future timestamps (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Verifier for Scheme A (HMAC-SHA256, base64) signatures.
pub struct HmacWebhookVerifier {
    secret: String,
    max_age_secs: Option<i64>,
}

impl HmacWebhookVerifier {
    /// Creates a verifier with no replay window.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            max_age_secs: None,
        }
    }

    /// Rejects signed timestamps older than `max_age_secs`.
    pub fn with_max_age(mut self, max_age_secs: Option<i64>) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Verifies `signature` against `timestamp || payload`.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - Signature does not match
    /// - `TimestampOutOfRange` - Replay window configured and exceeded
    /// - `ParseError` - Replay window configured and timestamp is not numeric
    pub fn verify(
        &self,
        payload: &[u8],
        timestamp: &str,
        signature: &[u8],
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        if let Some(max_age) = self.max_age_secs {
            validate_timestamp(timestamp, max_age, now)?;
        }

        let expected = self.compute_signature(timestamp, payload);

        if !constant_time_compare(expected.as_bytes(), signature) {
            return Err(WebhookError::InvalidSignature {
                expected,
                received: String::from_utf8_lossy(signature).into_owned(),
            });
        }

        Ok(())
    }

    /// Computes the base64 HMAC-SHA256 over `timestamp || payload`.
    fn compute_signature(&self, timestamp: &str, payload: &[u8]) -> String {
        hmac_base64(self.secret.as_bytes(), timestamp.as_bytes(), payload)
    }
}

/// Verifier for Scheme B (salted SHA-256) signatures.
pub struct SaltedChecksumVerifier {
    salt_key: String,
    salt_index: String,
}

#[derive(Debug, Deserialize)]
struct EncodedEnvelope {
    response: String,
}

impl SaltedChecksumVerifier {
    pub fn new(salt_key: impl Into<String>, salt_index: impl Into<String>) -> Self {
        Self {
            salt_key: salt_key.into(),
            salt_index: salt_index.into(),
        }
    }

    /// Verifies the `x-verify` header against the body's base64 payload and
    /// returns the decoded JSON bytes.
    ///
    /// Nothing inside the decoded payload is read before the checksum matches.
    pub fn verify_and_decode(
        &self,
        body: &[u8],
        x_verify: &[u8],
    ) -> Result<Vec<u8>, WebhookError> {
        let envelope: EncodedEnvelope = serde_json::from_slice(body)
            .map_err(|e| WebhookError::ParseError(format!("invalid envelope: {}", e)))?;

        if envelope.response.is_empty() {
            return Err(WebhookError::MissingField("response"));
        }

        let expected = salted_checksum(&envelope.response, &self.salt_key, &self.salt_index);

        if !constant_time_compare(expected.as_bytes(), x_verify) {
            return Err(WebhookError::InvalidSignature {
                expected,
                received: String::from_utf8_lossy(x_verify).into_owned(),
            });
        }

        BASE64
            .decode(envelope.response.as_bytes())
            .map_err(|e| WebhookError::ParseError(format!("invalid base64 payload: {}", e)))
    }
}

/// `hex(SHA256(message || salt_key)) + "###" + salt_index`.
///
/// Also used to sign outbound pay requests, with the API path appended to
/// the message.
pub fn salted_checksum(message: &str, salt_key: &str, salt_index: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(salt_key.as_bytes());
    format!(
        "{}{}{}",
        hex::encode(hasher.finalize()),
        SALT_INDEX_SEPARATOR,
        salt_index
    )
}

/// `base64(HMAC-SHA256(key, prefix || payload))`.
pub fn hmac_base64(key: &[u8], prefix: &[u8], payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key");
    mac.update(prefix);
    mac.update(payload);
    BASE64.encode(mac.finalize().into_bytes())
}

fn validate_timestamp(timestamp: &str, max_age_secs: i64, now: Timestamp) -> Result<(), WebhookError> {
    let raw: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| WebhookError::ParseError("invalid webhook timestamp".to_string()))?;
    let signed_at_secs = if raw > MILLIS_THRESHOLD { raw / 1000 } else { raw };

    let age = now.as_unix_secs() - signed_at_secs;
    if age > max_age_secs || age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }
    Ok(())
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a Scheme B webhook body and its `x-verify` header for test fixtures.
#[cfg(test)]
pub fn compute_test_scheme_b(json: &str, salt_key: &str, salt_index: &str) -> (String, String) {
    let encoded = BASE64.encode(json.as_bytes());
    let header = salted_checksum(&encoded, salt_key, salt_index);
    (format!(r#"{{"response":"{}"}}"#, encoded), header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "cf_webhook_secret_12345";
    const SALT_KEY: &str = "099eb0cd-02cf-4e2a-8aca-3e6c6aff0399";
    const SALT_INDEX: &str = "1";

    fn now() -> Timestamp {
        Timestamp::from_unix_millis(1_700_000_000_000).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Scheme A
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn scheme_a_accepts_valid_signature() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET);
        let body = br#"{"data":{"order":{"order_id":"ORDER_42_1700000000000"}}}"#;
        let signature = hmac_base64(TEST_SECRET.as_bytes(), b"1700000000", body);

        let result = verifier.verify(body, "1700000000", signature.as_bytes(), now());

        assert!(result.is_ok());
    }

    #[test]
    fn scheme_a_signs_timestamp_and_body_concatenated() {
        let a = hmac_base64(b"k", b"12", b"3body");
        let b = hmac_base64(b"k", b"123", b"body");
        assert_eq!(a, b);
    }

    #[test]
    fn scheme_a_rejects_wrong_secret() {
        let verifier = HmacWebhookVerifier::new("other");
        let body = b"{}";
        let signature = hmac_base64(TEST_SECRET.as_bytes(), b"1", body);

        let result = verifier.verify(body, "1", signature.as_bytes(), now());

        assert!(matches!(result, Err(WebhookError::InvalidSignature { .. })));
    }

    #[test]
    fn scheme_a_rejects_tampered_body() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET);
        let signature = hmac_base64(TEST_SECRET.as_bytes(), b"1", br#"{"a":1}"#);

        let result = verifier.verify(br#"{"a":2}"#, "1", signature.as_bytes(), now());

        assert!(matches!(result, Err(WebhookError::InvalidSignature { .. })));
    }

    #[test]
    fn scheme_a_mismatch_reports_expected_and_received() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET);
        let body = b"{}";
        let expected = hmac_base64(TEST_SECRET.as_bytes(), b"1", body);

        match verifier.verify(body, "1", b"bogus", now()) {
            Err(WebhookError::InvalidSignature {
                expected: e,
                received: r,
            }) => {
                assert_eq!(e, expected);
                assert_eq!(r, "bogus");
                assert!(!e.contains(TEST_SECRET));
            }
            other => panic!("expected InvalidSignature, got {:?}", other),
        }
    }

    #[test]
    fn scheme_a_ignores_timestamp_age_without_window() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET);
        let signature = hmac_base64(TEST_SECRET.as_bytes(), b"1000", b"{}");

        assert!(verifier.verify(b"{}", "1000", signature.as_bytes(), now()).is_ok());
    }

    #[test]
    fn scheme_a_window_rejects_old_timestamp() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET).with_max_age(Some(300));
        let ts = (now().as_unix_secs() - 301).to_string();
        let signature = hmac_base64(TEST_SECRET.as_bytes(), ts.as_bytes(), b"{}");

        let result = verifier.verify(b"{}", &ts, signature.as_bytes(), now());

        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn scheme_a_window_accepts_millisecond_timestamps() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET).with_max_age(Some(300));
        let ts = (now().as_unix_millis() - 10_000).to_string();
        let signature = hmac_base64(TEST_SECRET.as_bytes(), ts.as_bytes(), b"{}");

        assert!(verifier.verify(b"{}", &ts, signature.as_bytes(), now()).is_ok());
    }

    #[test]
    fn scheme_a_window_rejects_future_beyond_skew() {
        let verifier = HmacWebhookVerifier::new(TEST_SECRET).with_max_age(Some(300));
        let ts = (now().as_unix_secs() + 120).to_string();
        let signature = hmac_base64(TEST_SECRET.as_bytes(), ts.as_bytes(), b"{}");

        let result = verifier.verify(b"{}", &ts, signature.as_bytes(), now());

        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    // ══════════════════════════════════════════════════════════════
    // Scheme B
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn scheme_b_accepts_valid_checksum_and_decodes() {
        let verifier = SaltedChecksumVerifier::new(SALT_KEY, SALT_INDEX);
        let json = r#"{"code":"PAYMENT_SUCCESS"}"#;
        let (body, header) = compute_test_scheme_b(json, SALT_KEY, SALT_INDEX);

        let decoded = verifier
            .verify_and_decode(body.as_bytes(), header.as_bytes())
            .unwrap();

        assert_eq!(decoded, json.as_bytes());
    }

    #[test]
    fn scheme_b_header_ends_with_salt_index() {
        let checksum = salted_checksum("abc", SALT_KEY, "7");
        assert!(checksum.ends_with("###7"));
        assert_eq!(checksum.len(), 64 + 3 + 1);
    }

    #[test]
    fn scheme_b_rejects_wrong_salt_index() {
        let verifier = SaltedChecksumVerifier::new(SALT_KEY, "2");
        let (body, header) = compute_test_scheme_b("{}", SALT_KEY, "1");

        let result = verifier.verify_and_decode(body.as_bytes(), header.as_bytes());

        assert!(matches!(result, Err(WebhookError::InvalidSignature { .. })));
    }

    #[test]
    fn scheme_b_rejects_malformed_envelope() {
        let verifier = SaltedChecksumVerifier::new(SALT_KEY, SALT_INDEX);

        let result = verifier.verify_and_decode(b"not json", b"whatever###1");

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn scheme_b_rejects_empty_response() {
        let verifier = SaltedChecksumVerifier::new(SALT_KEY, SALT_INDEX);

        let result = verifier.verify_and_decode(br#"{"response":""}"#, b"x###1");

        assert!(matches!(result, Err(WebhookError::MissingField("response"))));
    }

    // ══════════════════════════════════════════════════════════════
    // Bit-flip properties
    // ══════════════════════════════════════════════════════════════

    fn flip(bytes: &[u8], index: usize, bit: u8) -> Vec<u8> {
        let mut out = bytes.to_vec();
        let i = index % out.len();
        out[i] ^= 1 << (bit % 8);
        out
    }

    proptest! {
        #[test]
        fn scheme_a_any_signature_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 0..256),
            index in any::<usize>(),
            bit in 0u8..8,
        ) {
            let verifier = HmacWebhookVerifier::new(TEST_SECRET);
            let signature = hmac_base64(TEST_SECRET.as_bytes(), b"1700000000", &body);
            let mutated = flip(signature.as_bytes(), index, bit);

            let result = verifier.verify(&body, "1700000000", &mutated, now());

            let rejected = matches!(result, Err(WebhookError::InvalidSignature { .. }));
            prop_assert!(rejected);
        }

        #[test]
        fn scheme_a_any_body_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<usize>(),
            bit in 0u8..8,
        ) {
            let verifier = HmacWebhookVerifier::new(TEST_SECRET);
            let signature = hmac_base64(TEST_SECRET.as_bytes(), b"1700000000", &body);
            let mutated = flip(&body, index, bit);

            let result = verifier.verify(&mutated, "1700000000", signature.as_bytes(), now());

            prop_assert!(result.is_err());
        }

        #[test]
        fn scheme_b_any_header_bit_flip_fails(
            order in "[A-Z]{3}_[1-9][0-9]{0,6}_[0-9]{13}",
            index in any::<usize>(),
            bit in 0u8..8,
        ) {
            let verifier = SaltedChecksumVerifier::new(SALT_KEY, SALT_INDEX);
            let json = format!(r#"{{"data":{{"merchantTransactionId":"{}"}}}}"#, order);
            let (body, header) = compute_test_scheme_b(&json, SALT_KEY, SALT_INDEX);
            let mutated = flip(header.as_bytes(), index, bit);

            let result = verifier.verify_and_decode(body.as_bytes(), &mutated);

            let rejected = matches!(result, Err(WebhookError::InvalidSignature { .. }));
            prop_assert!(rejected);
        }
    }
}
