//! Company profile route handlers.
//!
//! One profile per account, replaced wholesale on PUT. The profile only
//! affects how public share pages are footed, so there is no partial
//! update surface.

use axum::{Json, extract::State};

use crate::db::{CompanyProfileInput, CompanyProfileRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::CompanyProfile;
use crate::state::AppState;

/// `GET /api/company-profile` - the account's saved profile, 404 if never
/// saved.
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CompanyProfile>> {
    let profile = CompanyProfileRepository::new(state.pool())
        .get(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("company profile".into()))?;
    Ok(Json(profile))
}

/// Profile write body.
#[derive(Debug, serde::Deserialize)]
pub struct PutBody {
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub logo_url: Option<String>,
}

/// `PUT /api/company-profile` - create or replace the profile.
pub async fn put(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<PutBody>,
) -> Result<Json<CompanyProfile>> {
    let company_name = body.company_name.trim();
    if company_name.is_empty() {
        return Err(AppError::BadRequest("company_name must not be empty".into()));
    }

    let contact_email = body
        .contact_email
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(email) = contact_email
        && lineup_core::Email::parse(email).is_err()
    {
        return Err(AppError::BadRequest("invalid contact email".into()));
    }

    let input = CompanyProfileInput {
        company_name: company_name.to_string(),
        contact_email: contact_email.map(String::from),
        contact_phone: body
            .contact_phone
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from),
        logo_url: body
            .logo_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from),
    };

    let profile = CompanyProfileRepository::new(state.pool())
        .upsert(user.id, &input)
        .await?;

    // Footer content changed on every share page this account owns
    let catalogs = crate::db::CatalogRepository::new(state.pool())
        .list(user.id, true)
        .await?;
    for summary in &catalogs {
        state
            .invalidate_share_page(summary.catalog.slug.as_str())
            .await;
    }

    Ok(Json(profile))
}
