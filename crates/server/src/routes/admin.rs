//! Operator route handlers.
//!
//! Gated by the bearer token middleware, not by user sessions. These
//! endpoints exist for support work: a quick look at growth numbers, the
//! account list, and full removal of an account on request.

use axum::{Json, extract::State};
use lineup_core::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::db::{
    CatalogRepository, ProductRepository, ResponseRepository, SubscriptionRepository,
    UserRepository,
};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::entitlements::{self, UsageSummary};
use crate::services::storage;
use crate::state::AppState;

/// Instance-wide totals.
#[derive(Debug, Serialize)]
pub struct AnalyticsBody {
    pub users: i64,
    pub users_last_30_days: i64,
    pub products: i64,
    pub unprocessed_products: i64,
    pub catalogs: i64,
    pub responses: i64,
    pub active_paid_subscriptions: i64,
}

/// `GET /admin/analytics` - instance totals.
pub async fn analytics(State(state): State<AppState>) -> Result<Json<AnalyticsBody>> {
    let pool = state.pool();
    let users_repo = UserRepository::new(pool);
    let products_repo = ProductRepository::new(pool);

    let body = AnalyticsBody {
        users: users_repo.count().await?,
        users_last_30_days: users_repo.count_recent(30).await?,
        products: products_repo.count_all().await?,
        unprocessed_products: products_repo.count_all_unprocessed().await?,
        catalogs: CatalogRepository::new(pool).count_all().await?,
        responses: ResponseRepository::new(pool).count_all().await?,
        active_paid_subscriptions: SubscriptionRepository::new(pool).count_active_paid().await?,
    };

    Ok(Json(body))
}

/// One account with its plan and usage, as the operator list shows it.
#[derive(Debug, Serialize)]
pub struct AdminUserBody {
    #[serde(flatten)]
    pub user: User,
    pub usage: UsageSummary,
}

/// `GET /admin/users` - every account with plan and usage, newest first.
pub async fn users(State(state): State<AppState>) -> Result<Json<Vec<AdminUserBody>>> {
    let accounts = UserRepository::new(state.pool()).list_all().await?;

    let mut body = Vec::with_capacity(accounts.len());
    for user in accounts {
        let usage = entitlements::usage_for(state.pool(), user.id).await?;
        body.push(AdminUserBody { user, usage });
    }
    Ok(Json(body))
}

/// Wipe request body.
#[derive(Debug, Deserialize)]
pub struct WipeBody {
    pub user_id: UserId,
}

/// `POST /admin/wipe` - remove an account and everything it owns.
///
/// Database rows cascade off the user row; stored objects are swept by
/// prefix afterwards. Storage errors after the row delete are reported,
/// not rolled back, since the account is already gone.
pub async fn wipe(
    State(state): State<AppState>,
    Json(body): Json<WipeBody>,
) -> Result<Json<Value>> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(body.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", body.user_id)))?;

    // Collect slugs before the cascade removes them
    let catalogs = CatalogRepository::new(state.pool())
        .list(body.user_id, true)
        .await?;

    users.delete(body.user_id).await?;

    for summary in &catalogs {
        state
            .invalidate_share_page(summary.catalog.slug.as_str())
            .await;
    }

    let prefix = storage::owner_prefix(body.user_id);
    let objects_deleted = state.storage().delete_prefix(&prefix).await?;

    tracing::info!(
        user_id = %body.user_id,
        email = %user.email,
        objects_deleted,
        "account wiped"
    );
    Ok(Json(json!({"ok": true, "objects_deleted": objects_deleted})))
}
