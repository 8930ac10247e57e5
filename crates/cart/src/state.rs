//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::catalog::{CatalogError, HttpCatalog, ProductCatalog};
use crate::config::CartServiceConfig;
use crate::services::auth::TokenVerifier;
use crate::services::cart::CartService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store pool, the product catalog and the token verifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: SqlitePool,
    catalog: Arc<dyn ProductCatalog>,
    tokens: TokenVerifier,
}

impl AppState {
    /// Create application state from explicit parts.
    ///
    /// Tests use this to plug in an in-memory pool and their own catalog.
    #[must_use]
    pub fn new(pool: SqlitePool, catalog: Arc<dyn ProductCatalog>, tokens: TokenVerifier) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                catalog,
                tokens,
            }),
        }
    }

    /// Create application state from configuration, talking to the
    /// configured Product Catalog over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog HTTP client cannot be built.
    pub fn from_config(config: &CartServiceConfig, pool: SqlitePool) -> Result<Self, CatalogError> {
        let catalog = HttpCatalog::new(&config.catalog)?;
        let tokens = TokenVerifier::new(config.auth.jwt_secret.clone());

        Ok(Self::new(pool, Arc::new(catalog), tokens))
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn ProductCatalog {
        self.inner.catalog.as_ref()
    }

    /// Get a reference to the bearer token verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenVerifier {
        &self.inner.tokens
    }

    /// Build a cart service over the shared pool and catalog.
    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.pool(), self.catalog())
    }
}
