//! Product and unprocessed-product repository.
//!
//! Plan-limit gating happens here, inside the mutating transaction: the
//! owner's advisory lock serializes concurrent mutations, the live count is
//! taken under that lock, and the insert only happens when the count is
//! below the plan maximum. Two racing uploads cannot both pass the gate.

use sqlx::{PgPool, Postgres, QueryBuilder};

use lineup_core::{ProductId, UnprocessedProductId, UserId};

use super::RepositoryError;
use crate::models::{Product, UnprocessedProduct};

/// Namespace for per-owner advisory locks (shared with catalog creation so
/// image and catalog mutations for one owner serialize together).
pub(crate) const OWNER_LOCK_NAMESPACE: i32 = 0x4C4E_5550; // "LNUP"

/// Metadata required to process an upload into a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub code: String,
    pub category: String,
    pub supplier: String,
}

/// Partial update for a product; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub active: Option<bool>,
}

/// Listing filters for the dashboard product grid.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Substring match against name and code.
    pub q: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub include_archived: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List an owner's products with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        owner_id: UserId,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, owner_id, name, code, category, supplier, image_url, \
             original_image_url, storage_key, active, archived_at, created_at \
             FROM product WHERE owner_id = ",
        );
        builder.push_bind(owner_id);

        if !filter.include_archived {
            builder.push(" AND archived_at IS NULL");
        }
        if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(q));
            builder.push(" AND (name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR code ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            builder.push(" AND category = ");
            builder.push_bind(category.to_owned());
        }
        if let Some(supplier) = filter.supplier.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND supplier = ");
            builder.push_bind(supplier.to_owned());
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Get one of the owner's products by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        owner_id: UserId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, owner_id, name, code, category, supplier, image_url,
                   original_image_url, storage_key, active, archived_at, created_at
            FROM product
            WHERE id = $1 AND owner_id = $2
            ",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Count the owner's non-archived products (the number that counts
    /// against the plan's image limit).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self, owner_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM product WHERE owner_id = $1 AND archived_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Process an upload into a product, enforcing the plan image limit.
    ///
    /// Runs in one transaction: take the owner's advisory lock, consume the
    /// unprocessed row, re-count under the lock, insert. The unprocessed
    /// row's image becomes the product's display and original image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the unprocessed row does not
    /// exist or belongs to another owner.
    /// Returns `RepositoryError::LimitReached` if the owner is at the image
    /// limit.
    pub async fn create_from_unprocessed(
        &self,
        owner_id: UserId,
        unprocessed_id: UnprocessedProductId,
        new: &NewProduct,
        max_images: i64,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_owner(&mut tx, owner_id).await?;

        let source = sqlx::query_as::<_, UnprocessedProduct>(
            r"
            DELETE FROM unprocessed_product
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, image_url, original_image_url, storage_key, created_at
            ",
        )
        .bind(unprocessed_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM product WHERE owner_id = $1 AND archived_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        if count >= max_images {
            // Rolls back the unprocessed delete too.
            return Err(RepositoryError::LimitReached(format!(
                "plan allows {max_images} images"
            )));
        }

        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO product
                (owner_id, name, code, category, supplier,
                 image_url, original_image_url, storage_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, owner_id, name, code, category, supplier, image_url,
                      original_image_url, storage_key, active, archived_at, created_at
            ",
        )
        .bind(owner_id)
        .bind(&new.name)
        .bind(&new.code)
        .bind(&new.category)
        .bind(&new.supplier)
        .bind(&source.image_url)
        .bind(&source.original_image_url)
        .bind(&source.storage_key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Apply a partial update to one of the owner's products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another owner.
    pub async fn update(
        &self,
        owner_id: UserId,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            UPDATE product SET
                name = COALESCE($3, name),
                code = COALESCE($4, code),
                category = COALESCE($5, category),
                supplier = COALESCE($6, supplier),
                active = COALESCE($7, active)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, name, code, category, supplier, image_url,
                      original_image_url, storage_key, active, archived_at, created_at
            ",
        )
        .bind(id)
        .bind(owner_id)
        .bind(update.name.as_deref())
        .bind(update.code.as_deref())
        .bind(update.category.as_deref())
        .bind(update.supplier.as_deref())
        .bind(update.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(product)
    }

    /// Delete one of the owner's products, returning the deleted row so the
    /// caller can remove its stored objects. Catalog join rows cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or
    /// belongs to another owner.
    pub async fn delete(
        &self,
        owner_id: UserId,
        id: ProductId,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            DELETE FROM product
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, name, code, category, supplier, image_url,
                      original_image_url, storage_key, active, archived_at, created_at
            ",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(product)
    }

    /// Archive products beyond `max_images`, newest first.
    ///
    /// Keeps the owner's oldest `max_images` non-archived products and sets
    /// `archived_at` on the rest. Used when a downgrade shrinks the image
    /// limit. Returns the number of products archived.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn archive_over_limit(
        &self,
        owner_id: UserId,
        max_images: i64,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE product SET archived_at = now()
            WHERE id IN (
                SELECT id FROM product
                WHERE owner_id = $1 AND archived_at IS NULL
                ORDER BY created_at ASC, id ASC
                OFFSET $2
            )
            ",
        )
        .bind(owner_id)
        .bind(max_images)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Unprocessed products
    // =========================================================================

    /// Record a fresh upload awaiting metadata.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_unprocessed(
        &self,
        owner_id: UserId,
        image_url: &str,
        storage_key: &str,
    ) -> Result<UnprocessedProduct, RepositoryError> {
        let row = sqlx::query_as::<_, UnprocessedProduct>(
            r"
            INSERT INTO unprocessed_product
                (owner_id, image_url, original_image_url, storage_key)
            VALUES ($1, $2, $2, $3)
            RETURNING id, owner_id, image_url, original_image_url, storage_key, created_at
            ",
        )
        .bind(owner_id)
        .bind(image_url)
        .bind(storage_key)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// List the owner's unprocessed uploads, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_unprocessed(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<UnprocessedProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, UnprocessedProduct>(
            r"
            SELECT id, owner_id, image_url, original_image_url, storage_key, created_at
            FROM unprocessed_product
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete one of the owner's unprocessed uploads, returning the row so
    /// the caller can remove the stored object.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist or
    /// belongs to another owner.
    pub async fn delete_unprocessed(
        &self,
        owner_id: UserId,
        id: UnprocessedProductId,
    ) -> Result<UnprocessedProduct, RepositoryError> {
        let row = sqlx::query_as::<_, UnprocessedProduct>(
            r"
            DELETE FROM unprocessed_product
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, image_url, original_image_url, storage_key, created_at
            ",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row)
    }

    /// Re-key an image after an object-storage move: update any product or
    /// unprocessed row whose display image lives at `from_key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn rekey_image(
        &self,
        owner_id: UserId,
        from_key: &str,
        to_key: &str,
        new_url: &str,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let products = sqlx::query(
            r"
            UPDATE product SET storage_key = $3, image_url = $4
            WHERE owner_id = $1 AND storage_key = $2
            ",
        )
        .bind(owner_id)
        .bind(from_key)
        .bind(to_key)
        .bind(new_url)
        .execute(&mut *tx)
        .await?;

        let unprocessed = sqlx::query(
            r"
            UPDATE unprocessed_product SET storage_key = $3, image_url = $4
            WHERE owner_id = $1 AND storage_key = $2
            ",
        )
        .bind(owner_id)
        .bind(from_key)
        .bind(to_key)
        .bind(new_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(products.rows_affected() + unprocessed.rows_affected())
    }

    // =========================================================================
    // Admin counts
    // =========================================================================

    /// Count all products across all owners.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count all unprocessed uploads across all owners.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all_unprocessed(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM unprocessed_product")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Take the per-owner advisory lock for the current transaction.
pub(crate) async fn lock_owner(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    owner_id: UserId,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(OWNER_LOCK_NAMESPACE)
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Escape `%` and `_` so user input matches literally inside ILIKE patterns.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_literals() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_filter_default_excludes_archived() {
        let filter = ProductFilter::default();
        assert!(!filter.include_archived);
        assert!(filter.q.is_none());
    }
}
