//! HTTP implementation of the product catalog check.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};
use url::Url;

use shopping_cart_core::ProductId;

use super::{CatalogError, CatalogProduct, ProductCatalog};
use crate::config::CatalogConfig;

/// Catalog client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalog {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        // Url::join replaces the last path segment unless the base ends in '/'
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// URL of a product resource.
    fn product_url(&self, product_id: ProductId) -> Result<Url, CatalogError> {
        Ok(self
            .base_url
            .join(&format!("api/products/{product_id}"))?)
    }
}

#[async_trait]
impl ProductCatalog for HttpCatalog {
    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn verify_exists(&self, product_id: ProductId) -> Result<CatalogProduct, CatalogError> {
        let url = self.product_url(product_id)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "Product Catalog request failed");
            CatalogError::Http(e)
        })?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Product not found in catalog");
            return Err(CatalogError::NotFound(product_id));
        }

        if !status.is_success() {
            warn!(status = status.as_u16(), "Product Catalog returned an error status");
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(CatalogProduct(payload))
    }
}
