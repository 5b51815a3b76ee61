//! Bearer-token guard for the operator surface.
//!
//! The `/admin` routes have no user accounts behind them; access is a
//! single static token checked here. Tokens are compared as SHA-256
//! digests so the comparison does not leak length or prefix timing.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::state::AppState;

/// Middleware that rejects requests without the operator bearer token.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let authorized = presented.is_some_and(|token| {
        tokens_match(token, state.config().admin_token.expose_secret())
    });

    if authorized {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "authentication required"})),
        )
            .into_response()
    }
}

/// Constant-time token equality via digest comparison.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match_exact() {
        assert!(tokens_match("secret-token", "secret-token"));
    }

    #[test]
    fn test_tokens_match_rejects_prefix_and_case() {
        assert!(!tokens_match("secret-toke", "secret-token"));
        assert!(!tokens_match("secret-token ", "secret-token"));
        assert!(!tokens_match("Secret-token", "secret-token"));
        assert!(!tokens_match("", "secret-token"));
    }
}
