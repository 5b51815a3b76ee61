//! Customer response (feedback) repository.
//!
//! Responses are append-only. There is deliberately no uniqueness on the
//! responder name: a buyer who likes different products on a second pass
//! submits again, and both submissions are kept.

use sqlx::{FromRow, PgPool};

use lineup_core::{CatalogId, ProductId, UserId};

use super::RepositoryError;
use crate::models::CustomerResponse;

/// Per-product like tally for a catalog.
#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct LikeCount {
    pub product_id: ProductId,
    pub likes: i64,
}

/// Repository for customer feedback.
pub struct ResponseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ResponseRepository<'a> {
    /// Create a new response repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a feedback submission.
    ///
    /// `liked_product_ids` must already be validated against catalog
    /// membership by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        catalog_id: CatalogId,
        responder_name: &str,
        responder_email: Option<&str>,
        liked_product_ids: &[ProductId],
    ) -> Result<CustomerResponse, RepositoryError> {
        let ids: Vec<i32> = liked_product_ids.iter().map(|id| id.as_i32()).collect();

        let response = sqlx::query_as::<_, CustomerResponse>(
            r"
            INSERT INTO customer_response
                (catalog_id, responder_name, responder_email, liked_product_ids)
            VALUES ($1, $2, $3, $4)
            RETURNING id, catalog_id, responder_name, responder_email,
                      liked_product_ids, created_at
            ",
        )
        .bind(catalog_id)
        .bind(responder_name)
        .bind(responder_email)
        .bind(&ids)
        .fetch_one(self.pool)
        .await?;

        Ok(response)
    }

    /// List feedback for one of the owner's catalogs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the catalog does not exist or
    /// belongs to another owner.
    pub async fn list_for_catalog(
        &self,
        owner_id: UserId,
        catalog_id: CatalogId,
    ) -> Result<Vec<CustomerResponse>, RepositoryError> {
        // Ownership check first so a foreign catalog id reads as missing.
        let owned: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM catalog WHERE id = $1 AND owner_id = $2",
        )
        .bind(catalog_id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        if owned.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let responses = sqlx::query_as::<_, CustomerResponse>(
            r"
            SELECT id, catalog_id, responder_name, responder_email,
                   liked_product_ids, created_at
            FROM customer_response
            WHERE catalog_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(catalog_id)
        .fetch_all(self.pool)
        .await?;

        Ok(responses)
    }

    /// Per-product like tallies across all of a catalog's feedback.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn like_counts(
        &self,
        catalog_id: CatalogId,
    ) -> Result<Vec<LikeCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, LikeCount>(
            r"
            SELECT liked.product_id, COUNT(*) AS likes
            FROM customer_response cr,
                 unnest(cr.liked_product_ids) AS liked(product_id)
            WHERE cr.catalog_id = $1
            GROUP BY liked.product_id
            ORDER BY likes DESC, liked.product_id ASC
            ",
        )
        .bind(catalog_id)
        .fetch_all(self.pool)
        .await?;

        Ok(counts)
    }

    /// Count all responses across all catalogs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_response")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
