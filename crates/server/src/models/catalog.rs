//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use lineup_core::{CatalogId, ResponseId, Slug, UserId};

/// A named, shareable subset of an account's products.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Catalog {
    /// Unique catalog ID.
    pub id: CatalogId,
    /// Owning account.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Brand name shown on the public page.
    pub brand_name: String,
    /// Optional logo shown on the public page.
    pub logo_url: Option<String>,
    /// Public share-link slug.
    pub slug: Slug,
    /// Set when the catalog was archived by a downgrade. Archived catalogs
    /// stop counting against the plan limit and disappear from the default
    /// dashboard listing, but existing share links keep working.
    pub archived_at: Option<DateTime<Utc>>,
    /// When the catalog was created.
    pub created_at: DateTime<Utc>,
}

/// A viewer's feedback submission for a catalog.
///
/// Append-only: the same viewer can submit repeatedly and every submission
/// is kept.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerResponse {
    /// Unique response ID.
    pub id: ResponseId,
    /// The catalog this feedback is for.
    pub catalog_id: CatalogId,
    /// Viewer-supplied name.
    pub responder_name: String,
    /// Viewer-supplied email, if given.
    pub responder_email: Option<String>,
    /// Product ids the viewer liked.
    pub liked_product_ids: Vec<i32>,
    /// When the feedback was submitted.
    pub created_at: DateTime<Utc>,
}
