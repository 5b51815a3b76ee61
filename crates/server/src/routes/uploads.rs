//! Image upload route handlers.
//!
//! Uploads land in object storage under the owner's `unprocessed/` prefix
//! and get a database row awaiting metadata. The move endpoint relocates
//! an object (unprocessed to products) with a server-side copy so the
//! browser never proxies image bytes through this service twice.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::UnprocessedProduct;
use crate::services::storage::{
    self, MAX_UPLOAD_BYTES, extension_for_content_type, validate_owned_key,
};
use crate::state::AppState;

/// `POST /api/uploads` - accept a multipart image and stage it as an
/// unprocessed product.
pub async fn upload(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UnprocessedProduct>)> {
    let mut staged: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("malformed multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .ok_or_else(|| AppError::BadRequest("file field missing a content type".into()))?
            .to_string();

        if extension_for_content_type(&content_type).is_none() {
            return Err(AppError::BadRequest(format!(
                "unsupported image type {content_type}; accepted: jpeg, png, webp, gif"
            )));
        }

        let data = field.bytes().await.map_err(|err| {
            // axum surfaces body-limit overruns as field read errors
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::BadRequest(format!("failed to read file field: {err}"))
            }
        })?;

        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge);
        }
        if data.is_empty() {
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }

        staged = Some((content_type, data.to_vec()));
        break;
    }

    let (content_type, data) =
        staged.ok_or_else(|| AppError::BadRequest("multipart body has no file field".into()))?;

    // Checked above, extension lookup cannot miss here
    let extension = extension_for_content_type(&content_type)
        .ok_or_else(|| AppError::BadRequest("unsupported image type".into()))?;
    let key = storage::unprocessed_key(user.id, extension);

    state.storage().put_object(&key, &content_type, data).await?;

    let image_url = state.storage().public_url(&key);
    let row = ProductRepository::new(state.pool())
        .insert_unprocessed(user.id, &image_url, &key)
        .await?;

    tracing::info!(user_id = %user.id, key, "image uploaded");
    Ok((StatusCode::CREATED, Json(row)))
}

/// Move request body. `to_key` defaults to the products-prefix twin of
/// `from_key`.
#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub from_key: String,
    #[serde(default)]
    pub to_key: Option<String>,
}

/// `POST /api/uploads/move` - promote an object from the unprocessed
/// prefix to the products prefix and re-point any rows referencing it.
pub async fn move_object(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<MoveBody>,
) -> Result<Json<Value>> {
    validate_owned_key(&body.from_key, user.id)
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    let to_key = match body.to_key {
        Some(to_key) => {
            validate_owned_key(&to_key, user.id)
                .map_err(|err| AppError::BadRequest(err.to_string()))?;
            to_key
        }
        None => storage::product_key_from_unprocessed(&body.from_key, user.id)
            .map_err(|err| AppError::BadRequest(err.to_string()))?,
    };
    if to_key == body.from_key {
        return Err(AppError::BadRequest(
            "destination key matches the source key".into(),
        ));
    }

    state.storage().copy_object(&body.from_key, &to_key).await?;

    let new_url = state.storage().public_url(&to_key);
    let rekeyed = ProductRepository::new(state.pool())
        .rekey_image(user.id, &body.from_key, &to_key, &new_url)
        .await?;

    // Source object goes last so a failure never strands the rows
    state.storage().delete_object(&body.from_key).await?;

    tracing::info!(user_id = %user.id, from = body.from_key, to = to_key, rekeyed, "image moved");
    Ok(Json(json!({"key": to_key, "url": new_url, "rows_updated": rekeyed})))
}
