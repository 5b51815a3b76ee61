//! Public share-page routes.
//!
//! These are the only server-rendered pages: a customer opens a catalog
//! link with no account, browses the grid, and submits which products
//! they liked. Rendered pages are cached briefly per slug; any catalog
//! mutation invalidates its entry.
//!
//! Archived catalogs still render. Archival removes a catalog from plan
//! counts and dashboard listings, not from links a customer already has.

use askama::Template;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use lineup_core::{ProductId, Slug};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::{CatalogRepository, CompanyProfileRepository, ResponseRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{Catalog, CompanyProfile, Product};
use crate::state::AppState;

/// Ceiling on responder name length; matches the column width.
const MAX_RESPONDER_NAME: usize = 200;

/// Public catalog page template.
#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogPageTemplate {
    pub catalog: Catalog,
    pub products: Vec<Product>,
    pub company: Option<CompanyProfile>,
}

/// `GET /c/{slug}` - render a shared catalog.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>> {
    let slug = Slug::parse(&slug).map_err(|_| AppError::NotFound("catalog".into()))?;

    if let Some(cached) = state.share_cache().get(slug.as_str()).await {
        return Ok(Html(cached));
    }

    let html = render_page(&state, &slug).await?;
    state
        .share_cache()
        .insert(slug.as_str().to_string(), html.clone())
        .await;

    Ok(Html(html))
}

/// Feedback submission from the public page.
#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub responder_name: String,
    pub responder_email: Option<String>,
    #[serde(default)]
    pub liked_product_ids: Vec<ProductId>,
}

/// `POST /c/{slug}/responses` - record a customer's picks.
///
/// Liked ids outside the catalog's membership are rejected rather than
/// silently dropped; a mismatch means the page and the catalog have
/// drifted and the submission would be misleading.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> Result<(StatusCode, Json<Value>)> {
    let slug = Slug::parse(&slug).map_err(|_| AppError::NotFound("catalog".into()))?;

    let name = body.responder_name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if name.len() > MAX_RESPONDER_NAME {
        return Err(AppError::BadRequest("name is too long".into()));
    }
    let email = body
        .responder_email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty());
    if let Some(email) = email
        && lineup_core::Email::parse(email).is_err()
    {
        return Err(AppError::BadRequest("invalid email address".into()));
    }

    let catalogs = CatalogRepository::new(state.pool());
    let catalog = catalogs
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("catalog".into()))?;

    let members = catalogs.member_product_ids(catalog.id).await?;
    for liked in &body.liked_product_ids {
        if !members.contains(liked) {
            return Err(AppError::BadRequest(format!(
                "product {liked} is not part of this catalog"
            )));
        }
    }

    let response = ResponseRepository::new(state.pool())
        .insert(catalog.id, name, email, &body.liked_product_ids)
        .await?;

    tracing::info!(
        catalog_id = %catalog.id,
        response_id = %response.id,
        likes = body.liked_product_ids.len(),
        "feedback submitted"
    );
    Ok((StatusCode::CREATED, Json(json!({"ok": true}))))
}

async fn render_page(state: &AppState, slug: &Slug) -> Result<String> {
    let catalogs = CatalogRepository::new(state.pool());
    let catalog = catalogs
        .get_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound("catalog".into()))?;

    let products = catalogs.products(catalog.id).await?;
    let company = CompanyProfileRepository::new(state.pool())
        .get(catalog.owner_id)
        .await?;

    let page = CatalogPageTemplate {
        catalog,
        products,
        company,
    };
    page.render()
        .map_err(|err| AppError::Internal(format!("template render failed: {err}")))
}
