//! Integration tests for the identifiers the public share surface accepts.
//!
//! Share links and feedback submissions are the only unauthenticated inputs,
//! so slug and email parsing get checked from outside the crate.

#![allow(clippy::unwrap_used)]

use lineup_core::{Email, Slug};

// =============================================================================
// Slug Tests
// =============================================================================

#[test]
fn test_generated_style_slugs_parse() {
    for raw in ["ab3k9mqx2r", "spring2026", "fall-lineup"] {
        assert!(Slug::parse(raw).is_ok(), "{raw} should parse");
    }
}

#[test]
fn test_slug_length_bounds() {
    assert!(Slug::parse("abcd").is_ok());
    assert!(Slug::parse("abc").is_err());
    assert!(Slug::parse(&"a".repeat(64)).is_ok());
    assert!(Slug::parse(&"a".repeat(65)).is_err());
}

#[test]
fn test_slug_rejects_url_hostile_input() {
    for raw in [
        "Spring2026",
        "spring 2026",
        "spring_2026",
        "spring/2026",
        "-spring",
        "spring-",
        "../../etc",
    ] {
        assert!(Slug::parse(raw).is_err(), "{raw} should be rejected");
    }
}

#[test]
fn test_generated_charset_avoids_ambiguous_characters() {
    for ambiguous in [b'l', b'o', b'0', b'1'] {
        assert!(!Slug::GENERATED_CHARSET.contains(&ambiguous));
    }
}

// =============================================================================
// Responder Email Tests
// =============================================================================

#[test]
fn test_plausible_emails_parse() {
    for raw in [
        "buyer@example.com",
        "first.last@shop.example.co.uk",
        "buyer+spring@example.com",
    ] {
        assert!(Email::parse(raw).is_ok(), "{raw} should parse");
    }
}

#[test]
fn test_domain_accessor() {
    let email = Email::parse("buyer@example.com").unwrap();
    assert_eq!(email.domain(), "example.com");
}

#[test]
fn test_junk_emails_are_rejected() {
    for raw in ["", "buyer", "buyer@", "@example.com", "buyer example.com"] {
        assert!(Email::parse(raw).is_err(), "{raw} should be rejected");
    }
}
