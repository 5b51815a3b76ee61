//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use lineup_core::{Email, UserId};

/// A Lineup account.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
