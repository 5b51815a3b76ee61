//! Product domain types.
//!
//! An upload starts as an [`UnprocessedProduct`] (image only, not counted
//! against plan limits) and becomes a [`Product`] once required metadata is
//! supplied. A product can later be archived, which removes it from usage
//! counts without breaking catalogs that still reference it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use lineup_core::{ProductId, UnprocessedProductId, UserId};

/// A processed product: an image with complete metadata.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Owning account.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Merchant-facing product code (SKU or similar).
    pub code: String,
    /// Category label.
    pub category: String,
    /// Supplier label.
    pub supplier: String,
    /// Public URL of the display image.
    pub image_url: String,
    /// Public URL of the original upload.
    pub original_image_url: String,
    /// Object storage key of the display image.
    #[serde(skip)]
    pub storage_key: String,
    /// Whether the product is shown in catalogs.
    pub active: bool,
    /// Set when the product was archived (downgrade or manual).
    pub archived_at: Option<DateTime<Utc>>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether this product counts against the plan's image limit.
    #[must_use]
    pub const fn counts_against_limit(&self) -> bool {
        self.archived_at.is_none()
    }
}

/// An uploaded image awaiting metadata.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UnprocessedProduct {
    /// Unique ID.
    pub id: UnprocessedProductId,
    /// Owning account.
    pub owner_id: UserId,
    /// Public URL of the uploaded image.
    pub image_url: String,
    /// Public URL of the original upload (same as `image_url` until moved).
    pub original_image_url: String,
    /// Object storage key.
    #[serde(skip)]
    pub storage_key: String,
    /// When the upload happened.
    pub created_at: DateTime<Utc>,
}
