//! Plan entitlement queries and downgrade enforcement.
//!
//! The hard limit checks live inside the repository transactions (an
//! advisory lock plus an in-transaction recount); this module answers the
//! softer questions: what is the account allowed right now, and what has
//! to be archived when a paid plan lapses.

use lineup_core::{Plan, PlanId, Slug, UserId};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::{
    CatalogRepository, ProductRepository, RepositoryError, SubscriptionRepository,
};
use crate::models::subscription::effective_plan;

/// Current usage against plan limits, as returned by the usage endpoint.
#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub plan: PlanId,
    pub plan_name: &'static str,
    pub images_used: i64,
    pub images_limit: i64,
    pub catalogs_used: i64,
    pub catalogs_limit: i64,
    pub can_upload_image: bool,
    pub can_create_catalog: bool,
}

/// What a downgrade pass archived.
#[derive(Debug, Default)]
pub struct DowngradeOutcome {
    pub archived_products: u64,
    /// Slugs of archived catalogs, for share-page cache invalidation.
    pub archived_catalog_slugs: Vec<Slug>,
}

impl DowngradeOutcome {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.archived_products == 0 && self.archived_catalog_slugs.is_empty()
    }
}

/// Effective plan for an account, falling back to free when no
/// subscription exists or the one on file is not entitled.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the lookup fails.
pub async fn plan_for(pool: &PgPool, owner_id: UserId) -> Result<&'static Plan, RepositoryError> {
    let subscription = SubscriptionRepository::new(pool).get(owner_id).await?;
    Ok(effective_plan(subscription.as_ref()))
}

/// Build the usage summary for an account.
///
/// The booleans are advisory for the UI; creation paths still recount
/// under the owner lock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any count fails.
pub async fn usage_for(pool: &PgPool, owner_id: UserId) -> Result<UsageSummary, RepositoryError> {
    let plan = plan_for(pool, owner_id).await?;
    let images_used = ProductRepository::new(pool).count_active(owner_id).await?;
    let catalogs_used = CatalogRepository::new(pool).count_active(owner_id).await?;

    Ok(UsageSummary {
        plan: plan.id,
        plan_name: plan.name,
        images_used,
        images_limit: plan.limits.max_images,
        catalogs_used,
        catalogs_limit: plan.limits.max_catalogs,
        can_upload_image: images_used < plan.limits.max_images,
        can_create_catalog: catalogs_used < plan.limits.max_catalogs,
    })
}

/// Archive whatever exceeds the given plan's limits, oldest rows kept.
///
/// Runs after a subscription lapses. Archived rows stay in the database
/// and storage; they stop counting against limits and drop out of
/// listings and share pages.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an archive query fails.
pub async fn enforce_plan_limits(
    pool: &PgPool,
    owner_id: UserId,
    plan: &Plan,
) -> Result<DowngradeOutcome, RepositoryError> {
    let archived_products = ProductRepository::new(pool)
        .archive_over_limit(owner_id, plan.limits.max_images)
        .await?;
    let archived_catalog_slugs = CatalogRepository::new(pool)
        .archive_over_limit(owner_id, plan.limits.max_catalogs)
        .await?;

    if archived_products > 0 || !archived_catalog_slugs.is_empty() {
        tracing::info!(
            owner_id = %owner_id,
            plan = %plan.id,
            archived_products,
            archived_catalogs = archived_catalog_slugs.len(),
            "archived rows over plan limits"
        );
    }

    Ok(DowngradeOutcome {
        archived_products,
        archived_catalog_slugs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downgrade_outcome_noop() {
        assert!(DowngradeOutcome::default().is_noop());

        let outcome = DowngradeOutcome {
            archived_products: 3,
            archived_catalog_slugs: Vec::new(),
        };
        assert!(!outcome.is_noop());
    }
}
