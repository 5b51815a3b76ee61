//! Account wipe command.
//!
//! # Usage
//!
//! ```bash
//! lineup-cli wipe --user-id 42
//! ```
//!
//! # Environment Variables
//!
//! - `LINEUP_DATABASE_URL` - `PostgreSQL` connection string
//! - `STORAGE_*` - object storage credentials (see server docs)

use lineup_core::UserId;
use lineup_server::config::StorageConfig;
use lineup_server::db::UserRepository;
use lineup_server::services::storage::{StorageClient, owner_prefix};

use super::CliError;

/// Delete an account, all rows it owns, and its stored objects.
///
/// Database rows go first (a single `DELETE` on the account cascades to
/// products, catalogs, responses, and subscription state), then every object
/// under the account's storage prefix is removed.
///
/// # Errors
///
/// Returns `CliError::UserNotFound` if no account has the given id, or a
/// database/storage error if either deletion fails.
pub async fn run(user_id: i32) -> Result<(), CliError> {
    let pool = super::connect().await?;
    let id = UserId::new(user_id);

    let users = UserRepository::new(&pool);
    let user = users
        .get_by_id(id)
        .await?
        .ok_or(CliError::UserNotFound(user_id))?;

    tracing::info!("Wiping account {} ({})", user.id, user.email);
    users.delete(id).await?;
    tracing::info!("Database rows deleted");

    let storage = StorageClient::new(&StorageConfig::from_env()?)?;
    let deleted = storage.delete_prefix(&owner_prefix(id)).await?;
    tracing::info!("Deleted {deleted} stored objects");

    Ok(())
}
