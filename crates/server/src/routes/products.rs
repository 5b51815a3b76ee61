//! Product route handlers.
//!
//! Creating a product consumes an unprocessed upload; that conversion is
//! where the plan image limit is enforced, inside the repository
//! transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lineup_core::{ProductId, UnprocessedProductId};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::{NewProduct, ProductFilter, ProductRepository, ProductUpdate};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Product, UnprocessedProduct};
use crate::services::entitlements;
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Substring match against name and code.
    pub q: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

/// `GET /api/products` - the owner's products, newest first.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter {
        q: query.q,
        category: query.category,
        supplier: query.supplier,
        include_archived: query.include_archived,
    };
    let products = ProductRepository::new(state.pool())
        .list(user.id, &filter)
        .await?;
    Ok(Json(products))
}

/// Body for creating a product out of an unprocessed upload.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub unprocessed_id: UnprocessedProductId,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub supplier: String,
}

/// Trim and validate the create body. Name and code are required;
/// category and supplier may be blank.
fn validated_metadata(body: &CreateBody) -> Result<NewProduct> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    let code = body.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("code must not be empty".into()));
    }

    Ok(NewProduct {
        name: name.to_string(),
        code: code.to_string(),
        category: body.category.trim().to_string(),
        supplier: body.supplier.trim().to_string(),
    })
}

/// `POST /api/products` - process an upload into a product.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<Product>)> {
    let new = validated_metadata(&body)?;

    let plan = entitlements::plan_for(state.pool(), user.id).await?;
    let product = ProductRepository::new(state.pool())
        .create_from_unprocessed(user.id, body.unprocessed_id, &new, plan.limits.max_images)
        .await?;

    tracing::info!(user_id = %user.id, product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /api/products/{id}` - fetch one product.
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}

/// Partial update body; omitted fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub active: Option<bool>,
}

/// `PATCH /api/products/{id}` - partial metadata update.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Product>> {
    if let Some(name) = &body.name
        && name.trim().is_empty()
    {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if let Some(code) = &body.code
        && code.trim().is_empty()
    {
        return Err(AppError::BadRequest("code must not be empty".into()));
    }

    let update = ProductUpdate {
        name: body.name.map(|v| v.trim().to_string()),
        code: body.code.map(|v| v.trim().to_string()),
        category: body.category.map(|v| v.trim().to_string()),
        supplier: body.supplier.map(|v| v.trim().to_string()),
        active: body.active,
    };

    let product = ProductRepository::new(state.pool())
        .update(user.id, id, &update)
        .await?;
    Ok(Json(product))
}

/// `DELETE /api/products/{id}` - remove a product and its stored image.
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    let removed = ProductRepository::new(state.pool())
        .delete(user.id, id)
        .await?;

    // Row is gone; a storage failure here leaves only an orphaned object
    if let Err(err) = state.storage().delete_object(&removed.storage_key).await {
        tracing::warn!(key = removed.storage_key, error = %err, "orphaned object after product delete");
    }

    tracing::info!(user_id = %user.id, product_id = %id, "product deleted");
    Ok(Json(json!({"ok": true})))
}

/// `GET /api/unprocessed` - uploads still awaiting metadata.
pub async fn list_unprocessed(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<UnprocessedProduct>>> {
    let rows = ProductRepository::new(state.pool())
        .list_unprocessed(user.id)
        .await?;
    Ok(Json(rows))
}

/// `DELETE /api/unprocessed/{id}` - discard a staged upload.
pub async fn delete_unprocessed(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<UnprocessedProductId>,
) -> Result<Json<Value>> {
    let removed = ProductRepository::new(state.pool())
        .delete_unprocessed(user.id, id)
        .await?;

    if let Err(err) = state.storage().delete_object(&removed.storage_key).await {
        tracing::warn!(key = removed.storage_key, error = %err, "orphaned object after upload discard");
    }

    Ok(Json(json!({"ok": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, code: &str) -> CreateBody {
        CreateBody {
            unprocessed_id: UnprocessedProductId::new(1),
            name: name.to_string(),
            code: code.to_string(),
            category: String::new(),
            supplier: String::new(),
        }
    }

    #[test]
    fn test_create_trims_fields() {
        let new = validated_metadata(&body("  Chair  ", " CH-01 ")).unwrap();
        assert_eq!(new.name, "Chair");
        assert_eq!(new.code, "CH-01");
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let err = validated_metadata(&body("   ", "CH-01")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_create_rejects_empty_code() {
        let err = validated_metadata(&body("Chair", "")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = validated_metadata(&body("Chair", "   ")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
