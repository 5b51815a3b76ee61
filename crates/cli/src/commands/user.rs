//! User account management commands.
//!
//! # Usage
//!
//! ```bash
//! lineup-cli user create -e owner@example.com -p "a strong password"
//! ```

use lineup_server::services::auth::AuthService;

use super::CliError;

/// Create a new user account.
///
/// Validation and hashing go through the same `AuthService` the server's
/// registration endpoint uses, so CLI-created accounts are indistinguishable
/// from self-registered ones.
///
/// # Errors
///
/// Returns `CliError::Auth` if the email is invalid, the password is too
/// weak, or the email is already registered.
pub async fn create(email: &str, password: &str) -> Result<(), CliError> {
    let pool = super::connect().await?;

    let auth = AuthService::new(&pool);
    let user = auth.register(email, password).await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}
