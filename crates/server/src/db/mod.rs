//! Database operations for the Lineup `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `app_user` - Account authentication
//! - `session` - Tower-sessions storage
//! - `product` / `unprocessed_product` - Uploaded images and their metadata
//! - `catalog` / `catalog_product` - Shareable catalogs and membership
//! - `customer_response` - Public feedback submissions
//! - `company_profile` - Per-account branding
//! - `subscription` / `stripe_event` - Billing state and webhook ledger
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p lineup-cli -- migrate
//! ```
//!
//! All queries are runtime-checked (`query_as`/`query`), so building the
//! workspace does not require a database connection.

pub mod catalogs;
pub mod company;
pub mod products;
pub mod responses;
pub mod subscriptions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalogs::{CatalogRepository, CatalogSummary, CatalogUpdate, NewCatalog};
pub use company::{CompanyProfileInput, CompanyProfileRepository};
pub use products::{NewProduct, ProductFilter, ProductRepository, ProductUpdate};
pub use responses::{LikeCount, ResponseRepository};
pub use subscriptions::{SubscriptionRepository, SubscriptionUpsert};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A plan limit would be exceeded by the operation.
    #[error("plan limit reached: {0}")]
    LimitReached(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
