//! Company profile domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use lineup_core::UserId;

/// Display branding for an account, one-to-one with the user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CompanyProfile {
    /// Owning account (primary key).
    pub owner_id: UserId,
    /// Company display name.
    pub company_name: String,
    /// Contact email shown on public pages.
    pub contact_email: Option<String>,
    /// Contact phone shown on public pages.
    pub contact_phone: Option<String>,
    /// Company logo URL.
    pub logo_url: Option<String>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}
