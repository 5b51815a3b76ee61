//! Stripe webhook signature verification and event envelope types.
//!
//! Stripe signs each delivery with the `Stripe-Signature` header:
//! `t=<unix>,v1=<hex hmac>[,v1=...]` where the MAC covers the string
//! `"{t}.{raw body}"`. Verification is pure so it can be tested with
//! fabricated payloads and a pinned clock.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How far a delivery timestamp may drift from the server clock.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("timestamp outside tolerance window")]
    TimestampOutOfTolerance,

    #[error("no signature matched the payload")]
    SignatureMismatch,
}

/// Verify a webhook delivery against the signing secret.
///
/// `now_unix` is injected so callers (and tests) control the clock.
///
/// # Errors
///
/// Returns error when the header is malformed, the timestamp is stale,
/// or no `v1` signature matches.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader)?,
                );
            }
            "v1" => {
                let decoded = hex::decode(value).map_err(|_| WebhookError::MalformedHeader)?;
                signatures.push(decoded);
            }
            // v0 and unknown schemes are ignored
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    // Saturate: the timestamp is attacker-supplied and may sit at the i64
    // extremes, where a plain subtraction would overflow.
    let drift = now_unix
        .checked_sub(timestamp)
        .map_or(i64::MAX, i64::saturating_abs);
    if drift > tolerance_secs {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    for signature in &signatures {
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant-time
        if mac.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::SignatureMismatch)
}

/// Event envelope. `data.object` stays untyped until the event type is
/// known; handlers deserialize it into the matching resource.
#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// `checkout.session.completed` payload, trimmed to what attribution needs.
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionCompleted {
    pub id: String,
    pub client_reference_id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn header_for(payload: &[u8], timestamp: i64) -> String {
        format!("t={timestamp},v1={}", sign(payload, timestamp, SECRET))
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = br#"{"id":"evt_1","type":"customer.subscription.updated"}"#;
        let header = header_for(payload, NOW - 10);
        verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).unwrap();
    }

    #[test]
    fn test_tampered_payload_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = header_for(payload, NOW);
        let result = verify_signature(
            br#"{"id":"evt_2"}"#,
            &header,
            SECRET,
            DEFAULT_TOLERANCE_SECS,
            NOW,
        );
        assert_eq!(result, Err(WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = b"{}";
        let header = header_for(payload, NOW);
        let result = verify_signature(payload, &header, "whsec_other", 300, NOW);
        assert_eq!(result, Err(WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let header = header_for(payload, NOW - 301);
        let result = verify_signature(payload, &header, SECRET, 300, NOW);
        assert_eq!(result, Err(WebhookError::TimestampOutOfTolerance));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let payload = b"{}";
        let header = header_for(payload, NOW + 400);
        let result = verify_signature(payload, &header, SECRET, 300, NOW);
        assert_eq!(result, Err(WebhookError::TimestampOutOfTolerance));
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        // A `t=` near the i64 bounds must not overflow the drift check.
        let payload = b"{}";
        for timestamp in [i64::MIN, i64::MIN + 1, i64::MAX] {
            let header = format!("t={timestamp},v1={}", sign(payload, timestamp, SECRET));
            let result = verify_signature(payload, &header, SECRET, 300, NOW);
            assert_eq!(result, Err(WebhookError::TimestampOutOfTolerance), "{timestamp}");
        }
    }

    #[test]
    fn test_second_v1_signature_accepted() {
        // Stripe sends two v1 entries during secret rotation.
        let payload = b"{}";
        let header = format!(
            "t={NOW},v1={},v1={}",
            sign(payload, NOW, "whsec_retired"),
            sign(payload, NOW, SECRET)
        );
        verify_signature(payload, &header, SECRET, 300, NOW).unwrap();
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let payload = b"{}";
        for header in ["", "v1=abcd", "t=notanumber,v1=00", "t=100"] {
            let result = verify_signature(payload, header, SECRET, i64::MAX, NOW);
            assert_eq!(result, Err(WebhookError::MalformedHeader), "{header:?}");
        }
    }

    #[test]
    fn test_event_envelope_parses() {
        let json = r#"{
            "id": "evt_99",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "client_reference_id": "42",
                                "customer": "cus_9", "subscription": "sub_9"}}
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");

        let session: CheckoutSessionCompleted =
            serde_json::from_value(event.data.object).unwrap();
        assert_eq!(session.client_reference_id.as_deref(), Some("42"));
        assert_eq!(session.subscription.as_deref(), Some("sub_9"));
    }

    #[test]
    fn test_malformed_hex_rejected() {
        let payload = b"{}";
        let result = verify_signature(payload, "t=100,v1=zzzz", SECRET, i64::MAX, NOW);
        assert_eq!(result, Err(WebhookError::MalformedHeader));
    }
}
