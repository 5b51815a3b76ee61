//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::storage::{StorageClient, StorageError};
use crate::services::stripe::{StripeClient, StripeError};

/// How long a rendered share page stays cached before re-rendering.
const SHARE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Upper bound on cached share pages.
const SHARE_CACHE_CAPACITY: u64 = 10_000;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storage client: {0}")]
    Storage(#[from] StorageError),
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    storage: StorageClient,
    stripe: StripeClient,
    /// Rendered public share pages, keyed by slug.
    share_cache: Cache<String, String>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an API client fails to build.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let storage = StorageClient::new(&config.storage)?;
        let stripe = StripeClient::new(&config.stripe)?;
        let share_cache = Cache::builder()
            .max_capacity(SHARE_CACHE_CAPACITY)
            .time_to_live(SHARE_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
                stripe,
                share_cache,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the object storage client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Get a reference to the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the share-page render cache.
    #[must_use]
    pub fn share_cache(&self) -> &Cache<String, String> {
        &self.inner.share_cache
    }

    /// Drop a cached share page. Called whenever a catalog mutates or is
    /// archived so the public link never serves stale content past the
    /// cache window.
    pub async fn invalidate_share_page(&self, slug: &str) {
        self.inner.share_cache.invalidate(slug).await;
    }
}
