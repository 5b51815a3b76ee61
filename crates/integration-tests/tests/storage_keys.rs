//! Integration tests for object key ownership and lifecycle rules.
//!
//! Keys are the tenancy boundary in object storage, so these rules get
//! exercised from outside the crate the way route handlers use them.

#![allow(clippy::unwrap_used)]

use lineup_core::UserId;
use lineup_server::services::storage::{
    extension_for_content_type, owner_prefix, product_key_from_unprocessed, unprocessed_key,
    validate_owned_key,
};

const OWNER: UserId = UserId::new(42);
const OTHER: UserId = UserId::new(7);

// =============================================================================
// Key Layout Tests
// =============================================================================

#[test]
fn test_owner_prefix_shape() {
    assert_eq!(owner_prefix(OWNER), "users/42/");
}

#[test]
fn test_unprocessed_keys_live_under_the_owner() {
    let key = unprocessed_key(OWNER, "jpg");
    assert!(key.starts_with("users/42/unprocessed/"));
    assert!(key.ends_with(".jpg"));
    assert!(validate_owned_key(&key, OWNER).is_ok());
}

#[test]
fn test_unprocessed_keys_are_unique() {
    let a = unprocessed_key(OWNER, "png");
    let b = unprocessed_key(OWNER, "png");
    assert_ne!(a, b);
}

#[test]
fn test_promotion_moves_only_the_directory() {
    let key = "users/42/unprocessed/abc123.webp";
    let moved = product_key_from_unprocessed(key, OWNER).unwrap();
    assert_eq!(moved, "users/42/products/abc123.webp");
}

#[test]
fn test_promotion_rejects_foreign_keys() {
    let key = "users/7/unprocessed/abc123.webp";
    assert!(product_key_from_unprocessed(key, OWNER).is_err());
}

#[test]
fn test_promotion_rejects_nested_paths() {
    let key = "users/42/unprocessed/deep/abc123.webp";
    assert!(product_key_from_unprocessed(key, OWNER).is_err());
}

// =============================================================================
// Ownership Validation Tests
// =============================================================================

#[test]
fn test_foreign_prefix_is_rejected() {
    let key = unprocessed_key(OTHER, "jpg");
    assert!(validate_owned_key(&key, OWNER).is_err());
}

#[test]
fn test_path_traversal_is_rejected() {
    for key in [
        "users/42/../7/products/a.jpg",
        "users/42//products/a.jpg",
        "users/42/products/",
    ] {
        assert!(validate_owned_key(key, OWNER).is_err(), "{key} should fail");
    }
}

// =============================================================================
// Content Type Tests
// =============================================================================

#[test]
fn test_accepted_image_types() {
    assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
    assert_eq!(extension_for_content_type("image/png"), Some("png"));
    assert_eq!(extension_for_content_type("image/webp"), Some("webp"));
    assert_eq!(extension_for_content_type("image/gif"), Some("gif"));
}

#[test]
fn test_everything_else_is_rejected() {
    for content_type in ["image/svg+xml", "application/pdf", "text/html", ""] {
        assert_eq!(extension_for_content_type(content_type), None);
    }
}
