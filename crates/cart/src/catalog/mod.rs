//! Product Catalog client.
//!
//! # Architecture
//!
//! - The catalog is the source of truth for which product IDs exist
//! - One existence check per add-to-cart, single attempt, no retries
//! - [`ProductCatalog`] is the seam: [`HttpCatalog`] talks to the real service,
//!   tests substitute their own implementation
//!
//! # Wire contract
//!
//! `GET {base_url}/api/products/{id}`:
//! - `2xx` - the product exists; the JSON body is returned as-is
//! - `404` - no such product
//! - anything else, or a transport failure - the catalog is unavailable
//!
//! # Example
//!
//! ```rust,ignore
//! use shopping_cart_service::catalog::{HttpCatalog, ProductCatalog};
//!
//! let catalog = HttpCatalog::new(&config.catalog)?;
//! let product = catalog.verify_exists(ProductId::new(101)).await?;
//! ```

mod http;

pub use http::HttpCatalog;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use shopping_cart_core::ProductId;

/// Errors that can occur when checking a product against the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog has no product with this ID.
    #[error("Product {0} not found in Product Catalog")]
    NotFound(ProductId),

    /// The catalog answered with an unexpected status.
    #[error("Product Catalog returned HTTP {status}")]
    Upstream { status: u16 },

    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog answered 2xx with a body that is not JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The catalog URL could not be built.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CatalogError {
    /// Whether this error means the product does not exist, as opposed to
    /// the catalog being unreachable or misbehaving.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Product payload returned by the catalog.
///
/// The cart only needs to know the product exists; the body is kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CatalogProduct(pub serde_json::Value);

/// Existence check against the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Confirm that `product_id` denotes a real product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the catalog has no such product,
    /// or another variant if the catalog could not be consulted.
    async fn verify_exists(&self, product_id: ProductId) -> Result<CatalogProduct, CatalogError>;
}
