//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Rate limiting (governor, per route group)
//! 5. Admin token guard (operator routes only)

pub mod admin;
pub mod auth;
pub mod rate_limit;
pub mod session;

pub use admin::require_admin_token;
pub use auth::{RequireUser, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter, feedback_rate_limiter};
pub use session::create_session_layer;
