//! Authentication route handlers.
//!
//! JSON register/login/logout plus a session probe for the dashboard.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Credentials payload shared by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

/// Signed-in account, as returned to the dashboard.
#[derive(Debug, Serialize)]
pub struct AccountBody {
    pub id: lineup_core::UserId,
    pub email: String,
}

impl From<&User> for AccountBody {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
        }
    }
}

/// `POST /auth/register` - create an account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsBody>,
) -> Result<(StatusCode, Json<AccountBody>)> {
    let auth = AuthService::new(state.pool());
    let user = auth.register(&body.email, &body.password).await?;

    start_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, "account registered");
    Ok((StatusCode::CREATED, Json(AccountBody::from(&user))))
}

/// `POST /auth/login` - verify credentials and start a session.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsBody>,
) -> Result<Json<AccountBody>> {
    let auth = AuthService::new(state.pool());
    let user = auth.login(&body.email, &body.password).await?;

    // Rotate the session id on privilege change
    session
        .cycle_id()
        .await
        .map_err(|err| AppError::Internal(format!("session rotation failed: {err}")))?;
    start_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, "signed in");
    Ok(Json(AccountBody::from(&user)))
}

/// `POST /auth/logout` - drop the session.
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session)
        .await
        .map_err(|err| AppError::Internal(format!("session clear failed: {err}")))?;
    clear_sentry_user();

    Ok(Json(json!({"ok": true})))
}

/// `GET /auth/me` - current account, or 401 when signed out.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<AccountBody>> {
    // Re-read from the database so a deleted account stops validating
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;

    Ok(Json(AccountBody::from(&user)))
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current)
        .await
        .map_err(|err| AppError::Internal(format!("session write failed: {err}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}
