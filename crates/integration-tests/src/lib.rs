//! Integration tests for Lineup.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lineup-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `webhook_signatures` - Stripe webhook verification against fabricated
//!   deliveries with a pinned clock
//! - `plan_entitlements` - Plan table and effective-plan resolution
//! - `storage_keys` - Object key ownership and lifecycle rules
//! - `share_identifiers` - Slug and email validation as the public share
//!   surface sees them
//!
//! Everything here exercises library logic directly; no running server,
//! database, or network access is required.
