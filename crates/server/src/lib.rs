//! Lineup API server library.
//!
//! Multi-tenant product catalog backend: wholesalers upload product
//! images, organize them into shareable catalogs, and collect customer
//! feedback through public share links. Billing runs on Stripe
//! subscriptions; images live in S3-compatible object storage.
//!
//! The binary in `main.rs` wires this together; the library exists so
//! integration tests can exercise the pieces directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
