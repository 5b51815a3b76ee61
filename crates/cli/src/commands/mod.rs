//! CLI command implementations.

pub mod migrate;
pub mod user;
pub mod wipe;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Authentication service error (registration).
    #[error("Auth error: {0}")]
    Auth(#[from] lineup_server::services::auth::AuthError),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] lineup_server::db::RepositoryError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] lineup_server::config::ConfigError),

    /// Object storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] lineup_server::services::storage::StorageError),

    /// Referenced user does not exist.
    #[error("No user with id {0}")]
    UserNotFound(i32),
}

/// Connect to the database named by `LINEUP_DATABASE_URL` (or `DATABASE_URL`).
pub(crate) async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("LINEUP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("LINEUP_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = lineup_server::db::create_pool(&database_url).await?;
    Ok(pool)
}
