//! Catalog route handlers.
//!
//! Slugs are generated server-side from an unambiguous alphabet and
//! retried on collision; the create and membership updates run inside
//! repository transactions.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lineup_core::{CatalogId, ProductId, Slug};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::db::{
    CatalogRepository, CatalogSummary, CatalogUpdate, LikeCount, NewCatalog, RepositoryError,
    ResponseRepository,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Catalog, CustomerResponse, Product};
use crate::services::entitlements;
use crate::state::AppState;

/// How many slug collisions to tolerate before giving up. With a 32-char
/// alphabet and 10 positions, two in a row already signals trouble.
const SLUG_ATTEMPTS: usize = 5;

/// Query parameters for the catalog listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// `GET /api/catalogs` - the owner's catalogs with product counts.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CatalogSummary>>> {
    let catalogs = CatalogRepository::new(state.pool())
        .list(user.id, query.include_archived)
        .await?;
    Ok(Json(catalogs))
}

/// Body for creating a catalog.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub name: String,
    #[serde(default)]
    pub brand_name: String,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
}

/// Catalog detail: the row, its share URL, and member products in order.
#[derive(Debug, Serialize)]
pub struct CatalogDetail {
    #[serde(flatten)]
    pub catalog: Catalog,
    pub share_url: String,
    pub products: Vec<Product>,
}

/// `POST /api/catalogs` - create a catalog with a fresh share slug.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<CatalogDetail>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let plan = entitlements::plan_for(state.pool(), user.id).await?;
    let new = NewCatalog {
        name: name.to_string(),
        brand_name: body.brand_name.trim().to_string(),
        logo_url: body.logo_url.filter(|url| !url.trim().is_empty()),
        product_ids: dedupe_product_ids(body.product_ids),
    };

    let repo = CatalogRepository::new(state.pool());
    let mut catalog = None;
    for _ in 0..SLUG_ATTEMPTS {
        let slug = generate_slug();
        match repo
            .create(user.id, &slug, &new, plan.limits.max_catalogs)
            .await
        {
            Ok(created) => {
                catalog = Some(created);
                break;
            }
            Err(RepositoryError::Conflict(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    let catalog = catalog.ok_or_else(|| {
        AppError::Internal("could not allocate a unique share slug".into())
    })?;

    let products = repo.products(catalog.id).await?;
    let detail = detail_for(&state, catalog, products);

    tracing::info!(user_id = %user.id, catalog_id = %detail.catalog.id, slug = %detail.catalog.slug, "catalog created");
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /api/catalogs/{id}` - one catalog with its member products.
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CatalogId>,
) -> Result<Json<CatalogDetail>> {
    let repo = CatalogRepository::new(state.pool());
    let catalog = repo
        .get(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("catalog {id}")))?;
    let products = repo.products(catalog.id).await?;
    Ok(Json(detail_for(&state, catalog, products)))
}

/// Partial update body. `logo_url: null` clears the logo; omitting the
/// field leaves it unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
    pub name: Option<String>,
    pub brand_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_clearable")]
    pub logo_url: Option<Option<String>>,
    pub product_ids: Option<Vec<ProductId>>,
}

/// `PATCH /api/catalogs/{id}` - partial update; replaces membership when
/// `product_ids` is present.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CatalogId>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<CatalogDetail>> {
    if let Some(name) = &body.name
        && name.trim().is_empty()
    {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let update = CatalogUpdate {
        name: body.name.map(|v| v.trim().to_string()),
        brand_name: body.brand_name.map(|v| v.trim().to_string()),
        logo_url: body.logo_url,
        product_ids: body.product_ids.map(dedupe_product_ids),
    };

    let repo = CatalogRepository::new(state.pool());
    let catalog = repo.update(user.id, id, &update).await?;

    state.invalidate_share_page(catalog.slug.as_str()).await;

    let products = repo.products(catalog.id).await?;
    Ok(Json(detail_for(&state, catalog, products)))
}

/// `DELETE /api/catalogs/{id}` - remove a catalog; its share link dies
/// with it. Products are untouched.
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CatalogId>,
) -> Result<Json<Value>> {
    let removed = CatalogRepository::new(state.pool())
        .delete(user.id, id)
        .await?;

    state.invalidate_share_page(removed.slug.as_str()).await;

    tracing::info!(user_id = %user.id, catalog_id = %id, "catalog deleted");
    Ok(Json(json!({"ok": true})))
}

/// Feedback listing: submissions plus per-product like tallies.
#[derive(Debug, Serialize)]
pub struct ResponsesBody {
    pub responses: Vec<CustomerResponse>,
    pub like_counts: Vec<LikeCount>,
}

/// `GET /api/catalogs/{id}/responses` - customer feedback for a catalog.
pub async fn responses(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CatalogId>,
) -> Result<Json<ResponsesBody>> {
    let repo = ResponseRepository::new(state.pool());
    let responses = repo.list_for_catalog(user.id, id).await?;
    let like_counts = repo.like_counts(id).await?;
    Ok(Json(ResponsesBody {
        responses,
        like_counts,
    }))
}

fn detail_for(state: &AppState, catalog: Catalog, products: Vec<Product>) -> CatalogDetail {
    let share_url = format!(
        "{}/c/{}",
        state.config().base_url.trim_end_matches('/'),
        catalog.slug
    );
    CatalogDetail {
        catalog,
        share_url,
        products,
    }
}

/// Distinguish an absent field from an explicit `null`: absent leaves the
/// value unchanged, `null` clears it.
fn deserialize_clearable<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Drop repeated ids, keeping first-occurrence order. The membership
/// table keys on `(catalog_id, product_id)`, so a repeated id in the
/// request would otherwise surface as a constraint violation.
fn dedupe_product_ids(ids: Vec<ProductId>) -> Vec<ProductId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Random slug from an alphabet with no ambiguous glyphs (no l/o/0/1).
fn generate_slug() -> Slug {
    let mut rng = rand::rng();
    let raw: String = (0..Slug::GENERATED_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..Slug::GENERATED_CHARSET.len());
            Slug::GENERATED_CHARSET[index] as char
        })
        .collect();
    // The generated alphabet is a subset of the accepted one
    #[allow(clippy::expect_used)]
    Slug::parse(&raw).expect("generated slug is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_slugs_are_valid_and_distinct() {
        let a = generate_slug();
        let b = generate_slug();
        assert_eq!(a.as_str().len(), Slug::GENERATED_LENGTH);
        // 32^10 keys; a collision here means the generator is broken
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_update_body_distinguishes_null_from_absent() {
        let body: UpdateBody = serde_json::from_str(r#"{"name": "Spring"}"#).unwrap();
        assert!(body.logo_url.is_none());

        let body: UpdateBody = serde_json::from_str(r#"{"logo_url": null}"#).unwrap();
        assert_eq!(body.logo_url, Some(None));

        let body: UpdateBody =
            serde_json::from_str(r#"{"logo_url": "https://cdn.example/l.png"}"#).unwrap();
        assert_eq!(body.logo_url, Some(Some("https://cdn.example/l.png".into())));
    }

    #[test]
    fn test_dedupe_product_ids_keeps_order() {
        let ids = vec![
            ProductId::new(3),
            ProductId::new(1),
            ProductId::new(3),
            ProductId::new(2),
            ProductId::new(1),
        ];
        let deduped = dedupe_product_ids(ids);
        assert_eq!(
            deduped,
            vec![ProductId::new(3), ProductId::new(1), ProductId::new(2)]
        );
    }

    #[test]
    fn test_generated_slug_uses_unambiguous_alphabet() {
        let slug = generate_slug();
        for c in slug.as_str().chars() {
            assert!(Slug::GENERATED_CHARSET.contains(&(c as u8)), "{c}");
        }
    }
}
