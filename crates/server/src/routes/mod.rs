//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database ping)
//!
//! # Auth (rate limited ~10/min per IP)
//! POST /auth/register               - Create an account, start a session
//! POST /auth/login                  - Verify credentials, start a session
//! POST /auth/logout                 - Drop the session
//! GET  /auth/me                     - Current account
//!
//! # Dashboard API (session required, rate limited ~100/min per IP)
//! POST   /api/uploads               - Multipart image upload
//! POST   /api/uploads/move          - Promote an object between prefixes
//! GET    /api/unprocessed           - Uploads awaiting metadata
//! DELETE /api/unprocessed/{id}      - Discard a staged upload
//! GET    /api/products              - List products (q/category/supplier filters)
//! POST   /api/products              - Process an upload into a product
//! GET    /api/products/{id}         - One product
//! PATCH  /api/products/{id}         - Partial metadata update
//! DELETE /api/products/{id}         - Delete product and its image
//! GET    /api/catalogs              - List catalogs with product counts
//! POST   /api/catalogs              - Create a catalog (fresh share slug)
//! GET    /api/catalogs/{id}         - One catalog with member products
//! PATCH  /api/catalogs/{id}         - Partial update / replace membership
//! DELETE /api/catalogs/{id}         - Delete a catalog
//! GET    /api/catalogs/{id}/responses - Customer feedback with like tallies
//! GET    /api/company-profile       - Saved branding profile
//! PUT    /api/company-profile       - Create or replace the profile
//! GET    /api/usage                 - Counts against plan limits
//! POST   /api/billing/checkout      - Start a Stripe Checkout session
//! POST   /api/billing/cancel        - Cancel at period end
//! GET    /api/billing/subscription  - Effective plan and raw subscription
//!
//! # Public (no session)
//! GET  /c/{slug}                    - Shared catalog page (cached)
//! POST /c/{slug}/responses          - Customer feedback (rate limited)
//! POST /webhooks/stripe             - Stripe events (signature verified)
//!
//! # Operator (bearer token)
//! GET  /admin/analytics             - Instance totals
//! GET  /admin/users                 - Account list
//! POST /admin/wipe                  - Remove an account and its objects
//! ```

pub mod admin;
pub mod auth;
pub mod billing;
pub mod catalogs;
pub mod company;
pub mod products;
pub mod share;
pub mod uploads;
pub mod webhooks;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, feedback_rate_limiter, require_admin_token,
};
use crate::services::storage::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Multipart framing overhead on top of the file cap.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter())
}

/// Create the dashboard API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/uploads",
            post(uploads::upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + UPLOAD_BODY_SLACK)),
        )
        .route("/uploads/move", post(uploads::move_object))
        .route("/unprocessed", get(products::list_unprocessed))
        .route("/unprocessed/{id}", delete(products::delete_unprocessed))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get)
                .patch(products::update)
                .delete(products::delete),
        )
        .route("/catalogs", get(catalogs::list).post(catalogs::create))
        .route(
            "/catalogs/{id}",
            get(catalogs::get)
                .patch(catalogs::update)
                .delete(catalogs::delete),
        )
        .route("/catalogs/{id}/responses", get(catalogs::responses))
        .route("/company-profile", get(company::get).put(company::put))
        .route("/usage", get(billing::usage))
        .route("/billing/checkout", post(billing::checkout))
        .route("/billing/cancel", post(billing::cancel))
        .route("/billing/subscription", get(billing::subscription))
        .layer(api_rate_limiter())
}

/// Create the public share routes router.
pub fn share_routes() -> Router<AppState> {
    Router::new()
        .route("/{slug}", get(share::show))
        .route(
            "/{slug}/responses",
            post(share::submit_feedback).layer(feedback_rate_limiter()),
        )
}

/// Create the operator routes router.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/analytics", get(admin::analytics))
        .route("/users", get(admin::users))
        .route("/wipe", post(admin::wipe))
        .layer(axum::middleware::from_fn_with_state(
            state,
            require_admin_token,
        ))
}

/// Create all application routes.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .nest("/c", share_routes())
        .route("/webhooks/stripe", post(webhooks::stripe))
        .nest("/admin", admin_routes(state))
}
