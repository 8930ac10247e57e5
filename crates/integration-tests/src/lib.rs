//! Integration tests for the shopping cart service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopping-cart-integration-tests
//! ```
//!
//! Nothing external is needed: each [`TestContext`] serves the real router on
//! an ephemeral port over its own in-memory `SQLite` store, and points it at
//! a mock Product Catalog served in-process.
//!
//! # Mock catalog
//!
//! `GET /api/products/{id}` answers:
//! - [`UNKNOWN_PRODUCT_ID`] (999) - `404`
//! - [`BROKEN_PRODUCT_ID`] (503) - `503`
//! - anything else - `200` with a small product document

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, extract::Path, http::StatusCode, response::IntoResponse, routing::get};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use url::Url;

use shopping_cart_core::UserId;
use shopping_cart_service::catalog::HttpCatalog;
use shopping_cart_service::config::CatalogConfig;
use shopping_cart_service::db;
use shopping_cart_service::routes;
use shopping_cart_service::services::auth::TokenVerifier;
use shopping_cart_service::state::AppState;

/// Secret the test server verifies tokens with.
pub const TEST_JWT_SECRET: &str = "Vq8#mZ2tLx5!pR9wK3nB7yF1cH6dJ4sG";

/// Product the mock catalog reports as missing.
pub const UNKNOWN_PRODUCT_ID: i64 = 999;

/// Product the mock catalog fails on.
pub const BROKEN_PRODUCT_ID: i64 = 503;

/// A running cart service plus the handles tests need to drive it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: SqlitePool,
    tokens: TokenVerifier,
}

impl TestContext {
    /// Start a mock catalog and a cart service wired to it.
    ///
    /// # Panics
    ///
    /// Panics if either server cannot be started.
    pub async fn new() -> Self {
        let catalog_url = spawn_mock_catalog().await;

        let pool = db::connect_in_memory()
            .await
            .expect("Failed to open in-memory database");
        db::migrate(&pool).await.expect("Failed to run migrations");

        let catalog = HttpCatalog::new(&catalog_config(catalog_url))
            .expect("Failed to build catalog client");
        let state = AppState::new(pool.clone(), Arc::new(catalog), test_verifier());

        let addr = serve(routes::app(state)).await;

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            pool,
            tokens: test_verifier(),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Bearer token for `user_id`, valid for an hour.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn token(&self, user_id: i64) -> String {
        self.tokens
            .issue(UserId::new(user_id), Some(Duration::from_secs(3600)))
            .expect("Failed to issue token")
    }

    /// `GET /api/cart` as `user_id`; returns status and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn get_cart(&self, user_id: i64) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url("/api/cart"))
            .bearer_auth(self.token(user_id))
            .send()
            .await
            .expect("Request failed");
        json_response(resp).await
    }

    /// `POST /api/cart/items` as `user_id` with `body`.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn add_item(&self, user_id: i64, body: &Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url("/api/cart/items"))
            .bearer_auth(self.token(user_id))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        json_response(resp).await
    }

    /// `PUT /api/cart/items/{product_id}` as `user_id` with `body`.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn update_item(
        &self,
        user_id: i64,
        product_id: &str,
        body: &Value,
    ) -> (StatusCode, Value) {
        let resp = self
            .client
            .put(self.url(&format!("/api/cart/items/{product_id}")))
            .bearer_auth(self.token(user_id))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        json_response(resp).await
    }

    /// `DELETE /api/cart/items/{product_id}` as `user_id`.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn remove_item(&self, user_id: i64, product_id: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .delete(self.url(&format!("/api/cart/items/{product_id}")))
            .bearer_auth(self.token(user_id))
            .send()
            .await
            .expect("Request failed");
        json_response(resp).await
    }

    /// `DELETE /api/cart` as `user_id`; returns the status.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn clear_cart(&self, user_id: i64) -> StatusCode {
        let resp = self
            .client
            .delete(self.url("/api/cart"))
            .bearer_auth(self.token(user_id))
            .send()
            .await
            .expect("Request failed");
        resp.status()
    }

    /// Number of rows in `table`.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("Count query failed")
    }
}

/// Verifier using [`TEST_JWT_SECRET`].
#[must_use]
pub fn test_verifier() -> TokenVerifier {
    TokenVerifier::new(SecretString::from(TEST_JWT_SECRET))
}

/// Catalog client settings pointing at `base_url`.
#[must_use]
pub const fn catalog_config(base_url: Url) -> CatalogConfig {
    CatalogConfig {
        base_url,
        timeout: Duration::from_secs(2),
    }
}

/// Serve the mock Product Catalog on an ephemeral port; returns its base URL.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn_mock_catalog() -> Url {
    let app = Router::new().route("/api/products/{id}", get(mock_product));
    let addr = serve(app).await;
    Url::parse(&format!("http://{addr}")).expect("Invalid mock catalog URL")
}

async fn mock_product(Path(id): Path<i64>) -> impl IntoResponse {
    match id {
        UNKNOWN_PRODUCT_ID => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Product not found" })),
        ),
        BROKEN_PRODUCT_ID => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Catalog unavailable" })),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({
                "productId": id,
                "name": format!("Product {id}"),
                "price": 9.99,
            })),
        ),
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    addr
}

async fn json_response(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body = resp.json().await.expect("Response body is not JSON");
    (status, body)
}
