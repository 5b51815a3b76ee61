//! Integration tests for Stripe webhook signature verification.
//!
//! These tests build signed deliveries the way Stripe does (HMAC-SHA256
//! over `"{t}.{body}"`) and drive verification with a pinned clock, so no
//! Stripe account or network access is needed.

#![allow(clippy::unwrap_used)]

use hmac::{Hmac, Mac};
use sha2::Sha256;

use lineup_server::services::stripe::webhook::{
    DEFAULT_TOLERANCE_SECS, Event, WebhookError, verify_signature,
};

type HmacSha256 = Hmac<Sha256>;

const SECRET: &str = "whsec_integration_secret";
const NOW: i64 = 1_750_000_000;

fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn header(payload: &[u8], timestamp: i64, secret: &str) -> String {
    format!("t={timestamp},v1={}", sign(payload, timestamp, secret))
}

// =============================================================================
// Signature Verification Tests
// =============================================================================

#[test]
fn test_valid_delivery_verifies() {
    let payload = br#"{"id":"evt_1","type":"customer.subscription.updated"}"#;
    let header = header(payload, NOW, SECRET);

    let result = verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW);
    assert!(result.is_ok());
}

#[test]
fn test_body_tampering_is_rejected() {
    let payload = br#"{"id":"evt_1","amount":100}"#;
    let header = header(payload, NOW, SECRET);
    let tampered = br#"{"id":"evt_1","amount":999}"#;

    let result = verify_signature(tampered, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW);
    assert_eq!(result, Err(WebhookError::SignatureMismatch));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = header(payload, NOW, "whsec_other");

    let result = verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW);
    assert_eq!(result, Err(WebhookError::SignatureMismatch));
}

#[test]
fn test_replayed_delivery_outside_tolerance_is_rejected() {
    let payload = br#"{"id":"evt_1"}"#;
    let stale = NOW - DEFAULT_TOLERANCE_SECS - 1;
    let header = header(payload, stale, SECRET);

    let result = verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW);
    assert_eq!(result, Err(WebhookError::TimestampOutOfTolerance));
}

#[test]
fn test_secret_rotation_accepts_second_signature() {
    // During rotation Stripe sends one v1 per active secret.
    let payload = br#"{"id":"evt_1"}"#;
    let old = sign(payload, NOW, "whsec_retired");
    let new = sign(payload, NOW, SECRET);
    let header = format!("t={NOW},v1={old},v1={new}");

    let result = verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW);
    assert!(result.is_ok());
}

#[test]
fn test_header_without_signatures_is_malformed() {
    let result = verify_signature(
        b"{}",
        &format!("t={NOW}"),
        SECRET,
        DEFAULT_TOLERANCE_SECS,
        NOW,
    );
    assert_eq!(result, Err(WebhookError::MalformedHeader));
}

// =============================================================================
// Event Envelope Tests
// =============================================================================

#[test]
fn test_event_envelope_parses() {
    let body = r#"{
        "id": "evt_123",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_123",
                "client_reference_id": "7",
                "customer": "cus_9",
                "subscription": "sub_9"
            }
        }
    }"#;

    let event: Event = serde_json::from_str(body).unwrap();
    assert_eq!(event.id, "evt_123");
    assert_eq!(event.event_type, "checkout.session.completed");
    assert_eq!(event.data.object["client_reference_id"], "7");
}
