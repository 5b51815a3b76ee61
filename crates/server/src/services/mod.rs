//! Application services.
//!
//! - [`auth`] - Registration and login (argon2 password hashing)
//! - [`entitlements`] - Plan usage summaries and downgrade archival
//! - [`storage`] - S3-compatible object storage client (SigV4 over reqwest)
//! - [`stripe`] - Stripe REST client and webhook signature verification

pub mod auth;
pub mod entitlements;
pub mod storage;
pub mod stripe;
