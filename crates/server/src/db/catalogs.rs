//! Catalog repository.
//!
//! Catalog creation and membership updates are single transactions: the
//! catalog row and its join rows commit together or not at all, and the
//! plan's catalog limit is checked under the owner's advisory lock.

use sqlx::{FromRow, PgPool};

use lineup_core::{CatalogId, ProductId, Slug, UserId};

use super::RepositoryError;
use super::products::lock_owner;
use crate::models::{Catalog, Product};

/// Fields for creating a catalog.
#[derive(Debug, Clone)]
pub struct NewCatalog {
    pub name: String,
    pub brand_name: String,
    pub logo_url: Option<String>,
    pub product_ids: Vec<ProductId>,
}

/// Partial update for a catalog; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CatalogUpdate {
    pub name: Option<String>,
    pub brand_name: Option<String>,
    pub logo_url: Option<Option<String>>,
    /// When set, replaces the catalog's product membership wholesale.
    pub product_ids: Option<Vec<ProductId>>,
}

/// A catalog with its member-product count, for the dashboard listing.
#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct CatalogSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub catalog: Catalog,
    pub product_count: i64,
}

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the owner's catalogs with product counts, newest first.
    /// Archived catalogs are included only when `include_archived` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        owner_id: UserId,
        include_archived: bool,
    ) -> Result<Vec<CatalogSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CatalogSummary>(
            r"
            SELECT c.id, c.owner_id, c.name, c.brand_name, c.logo_url, c.slug,
                   c.archived_at, c.created_at,
                   (SELECT COUNT(*) FROM catalog_product cp WHERE cp.catalog_id = c.id)
                       AS product_count
            FROM catalog c
            WHERE c.owner_id = $1 AND (c.archived_at IS NULL OR $2)
            ORDER BY c.created_at DESC, c.id DESC
            ",
        )
        .bind(owner_id)
        .bind(include_archived)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Get one of the owner's catalogs by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        owner_id: UserId,
        id: CatalogId,
    ) -> Result<Option<Catalog>, RepositoryError> {
        let catalog = sqlx::query_as::<_, Catalog>(
            r"
            SELECT id, owner_id, name, brand_name, logo_url, slug, archived_at, created_at
            FROM catalog
            WHERE id = $1 AND owner_id = $2
            ",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(catalog)
    }

    /// Resolve a public share link. No owner filter: slugs are global.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Catalog>, RepositoryError> {
        let catalog = sqlx::query_as::<_, Catalog>(
            r"
            SELECT id, owner_id, name, brand_name, logo_url, slug, archived_at, created_at
            FROM catalog
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(catalog)
    }

    /// Count the owner's non-archived catalogs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self, owner_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM catalog WHERE owner_id = $1 AND archived_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Create a catalog with its product membership in one transaction,
    /// enforcing the plan's catalog limit under the owner's advisory lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::LimitReached` if the owner is at the
    /// catalog limit.
    /// Returns `RepositoryError::Conflict` if the slug is already taken
    /// (caller generates a fresh slug and retries).
    /// Returns `RepositoryError::NotFound` if any product id is missing or
    /// owned by another account.
    pub async fn create(
        &self,
        owner_id: UserId,
        slug: &Slug,
        new: &NewCatalog,
        max_catalogs: i64,
    ) -> Result<Catalog, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_owner(&mut tx, owner_id).await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM catalog WHERE owner_id = $1 AND archived_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        if count >= max_catalogs {
            return Err(RepositoryError::LimitReached(format!(
                "plan allows {max_catalogs} catalogs"
            )));
        }

        let catalog = sqlx::query_as::<_, Catalog>(
            r"
            INSERT INTO catalog (owner_id, name, brand_name, logo_url, slug)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, brand_name, logo_url, slug, archived_at, created_at
            ",
        )
        .bind(owner_id)
        .bind(&new.name)
        .bind(&new.brand_name)
        .bind(new.logo_url.as_deref())
        .bind(slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("slug already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        set_membership(&mut tx, owner_id, catalog.id, &new.product_ids).await?;

        tx.commit().await?;

        Ok(catalog)
    }

    /// Apply a partial update; replaces product membership when provided.
    /// Archived catalogs cannot be updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the catalog does not exist,
    /// belongs to another owner, or is archived.
    pub async fn update(
        &self,
        owner_id: UserId,
        id: CatalogId,
        update: &CatalogUpdate,
    ) -> Result<Catalog, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // logo_url uses a sentinel: outer None = leave unchanged,
        // Some(None) = clear, Some(Some(url)) = set.
        let (set_logo, logo_value) = match &update.logo_url {
            None => (false, None),
            Some(value) => (true, value.as_deref()),
        };

        let catalog = sqlx::query_as::<_, Catalog>(
            r"
            UPDATE catalog SET
                name = COALESCE($3, name),
                brand_name = COALESCE($4, brand_name),
                logo_url = CASE WHEN $5 THEN $6 ELSE logo_url END
            WHERE id = $1 AND owner_id = $2 AND archived_at IS NULL
            RETURNING id, owner_id, name, brand_name, logo_url, slug, archived_at, created_at
            ",
        )
        .bind(id)
        .bind(owner_id)
        .bind(update.name.as_deref())
        .bind(update.brand_name.as_deref())
        .bind(set_logo)
        .bind(logo_value)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if let Some(product_ids) = &update.product_ids {
            sqlx::query("DELETE FROM catalog_product WHERE catalog_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            set_membership(&mut tx, owner_id, id, product_ids).await?;
        }

        tx.commit().await?;

        Ok(catalog)
    }

    /// Delete one of the owner's catalogs, returning the deleted row so the
    /// caller can invalidate the share-page cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the catalog does not exist or
    /// belongs to another owner.
    pub async fn delete(
        &self,
        owner_id: UserId,
        id: CatalogId,
    ) -> Result<Catalog, RepositoryError> {
        let catalog = sqlx::query_as::<_, Catalog>(
            r"
            DELETE FROM catalog
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, name, brand_name, logo_url, slug, archived_at, created_at
            ",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(catalog)
    }

    /// The catalog's member products in display order, active only.
    ///
    /// Archived products still render: archival removes them from plan
    /// counts, not from catalogs a customer already has a link to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&self, id: CatalogId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT p.id, p.owner_id, p.name, p.code, p.category, p.supplier,
                   p.image_url, p.original_image_url, p.storage_key, p.active,
                   p.archived_at, p.created_at
            FROM catalog_product cp
            JOIN product p ON p.id = cp.product_id
            WHERE cp.catalog_id = $1 AND p.active
            ORDER BY cp.position ASC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// The set of product ids belonging to a catalog (for validating liked
    /// ids on feedback submissions).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn member_product_ids(
        &self,
        id: CatalogId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let ids: Vec<ProductId> = sqlx::query_scalar(
            "SELECT product_id FROM catalog_product WHERE catalog_id = $1",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Archive catalogs beyond `max_catalogs`, newest first. Returns the
    /// slugs of the archived catalogs so share-page caches can be dropped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn archive_over_limit(
        &self,
        owner_id: UserId,
        max_catalogs: i64,
    ) -> Result<Vec<Slug>, RepositoryError> {
        let slugs: Vec<Slug> = sqlx::query_scalar(
            r"
            UPDATE catalog SET archived_at = now()
            WHERE id IN (
                SELECT id FROM catalog
                WHERE owner_id = $1 AND archived_at IS NULL
                ORDER BY created_at ASC, id ASC
                OFFSET $2
            )
            RETURNING slug
            ",
        )
        .bind(owner_id)
        .bind(max_catalogs)
        .fetch_all(self.pool)
        .await?;

        Ok(slugs)
    }

    /// Count all catalogs across all owners.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Insert join rows for `product_ids`, verifying every id belongs to the
/// owner. Positions follow the order of the input.
async fn set_membership(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    owner_id: UserId,
    catalog_id: CatalogId,
    product_ids: &[ProductId],
) -> Result<(), RepositoryError> {
    if product_ids.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = product_ids.iter().map(|id| id.as_i32()).collect();

    // INSERT..SELECT keeps this a single round trip and silently drops ids
    // the owner doesn't hold; the count check below turns that into an error.
    let result = sqlx::query(
        r"
        INSERT INTO catalog_product (catalog_id, product_id, position)
        SELECT $1, p.id, (ord.position - 1)::int4
        FROM unnest($2::int4[]) WITH ORDINALITY AS ord(product_id, position)
        JOIN product p ON p.id = ord.product_id AND p.owner_id = $3
        ",
    )
    .bind(catalog_id)
    .bind(&ids)
    .bind(owner_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() != ids.len() as u64 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}
