//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! lineup-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `LINEUP_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)

use super::CliError;

/// Run all pending database migrations.
///
/// Migration files are embedded from `crates/server/migrations/` at compile
/// time, so the binary carries them wherever it is deployed.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
