//! Cart service.
//!
//! Validates caller input, checks products against the catalog, and applies
//! cart mutations through [`CartRepository`]. Every operation is scoped to an
//! explicit [`UserId`] resolved by the auth gate.
//!
//! # Consistency
//!
//! Each store call commits on its own. The races a lookup-then-insert design
//! would have are closed by the schema instead:
//! - `carts.user_id` is UNIQUE, so get-or-create always converges on one cart
//! - `(cart_id, product_id)` is UNIQUE and adds are a single upsert, so
//!   concurrent adds of one product sum into one line
//!
//! An update racing a remove of the same line reports `ItemNotFound`.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, instrument};

use shopping_cart_core::{
    CartId, InputError, NumericInput, ProductId, Quantity, QuantityChange, UserId,
};

use crate::catalog::{CatalogError, ProductCatalog};
use crate::db::{CartRepository, RepositoryError};
use crate::models::CartSnapshot;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Malformed or non-positive product ID or quantity.
    #[error("{0}")]
    InvalidInput(#[from] InputError),

    /// The catalog says the product does not exist.
    #[error("Product {0} is not available")]
    ItemNotAvailable(ProductId),

    /// The catalog could not be consulted.
    #[error("Failed to verify product with Product Catalog: {0}")]
    DependencyUnavailable(String),

    /// The user has no cart yet.
    #[error("Cart not found")]
    CartNotFound,

    /// The product is not in the user's cart.
    #[error("Item {0} not found in cart")]
    ItemNotFound(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartError {
    /// Stable machine-readable tag for this error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ItemNotAvailable(_) => "item_not_available",
            Self::DependencyUnavailable(_) => "dependency_unavailable",
            Self::CartNotFound => "cart_not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::Repository(_) => "internal",
        }
    }
}

impl From<CatalogError> for CartError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(product_id) => Self::ItemNotAvailable(product_id),
            other => Self::DependencyUnavailable(other.to_string()),
        }
    }
}

/// Cart service.
///
/// Cheap to construct; build one per request from the shared pool and catalog.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    catalog: &'a dyn ProductCatalog,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub fn new(pool: &'a SqlitePool, catalog: &'a dyn ProductCatalog) -> Self {
        Self {
            carts: CartRepository::new(pool),
            catalog,
        }
    }

    /// Add `quantity` of a product to the user's cart.
    ///
    /// Creates the cart on first use. Adding a product already in the cart
    /// increases its quantity by `quantity`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidInput` if either value is not a positive integer
    /// (nothing is read or written and the catalog is not called), or if the
    /// line's total would exceed `i64::MAX` (the line is left unchanged).
    /// Returns `CartError::ItemNotAvailable` if the catalog has no such product.
    /// Returns `CartError::DependencyUnavailable` if the catalog cannot be reached.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: impl Into<NumericInput> + Send,
        quantity: impl Into<NumericInput> + Send,
    ) -> Result<CartSnapshot, CartError> {
        let product_id = ProductId::parse(&product_id.into())?;
        let quantity = Quantity::parse(&quantity.into())?;

        self.catalog.verify_exists(product_id).await?;

        let cart = self.carts.get_or_create_cart(user_id).await?;
        let item = self
            .carts
            .add_item_quantity(cart.id, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::QuantityOverflow => {
                    CartError::InvalidInput(InputError::QuantityTooLarge)
                }
                other => CartError::Repository(other),
            })?;

        info!(
            cart_id = %cart.id,
            product_id = %product_id,
            added = %quantity,
            quantity = %item.quantity,
            "Item added to cart"
        );

        self.snapshot(cart.id).await
    }

    /// Replace the quantity of a product already in the user's cart.
    ///
    /// A zero or negative `new_quantity` removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidInput` if the product ID is not a positive
    /// integer or the quantity is not an integer.
    /// Returns `CartError::CartNotFound` if the user has no cart.
    /// Returns `CartError::ItemNotFound` if the product is not in the cart.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        product_id: impl Into<NumericInput> + Send,
        new_quantity: impl Into<NumericInput> + Send,
    ) -> Result<CartSnapshot, CartError> {
        let product_id = ProductId::parse(&product_id.into())?;
        let change = QuantityChange::parse(&new_quantity.into())?;

        let cart = self
            .carts
            .find_cart_by_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        let item = self
            .carts
            .find_item(cart.id, product_id)
            .await?
            .ok_or(CartError::ItemNotFound(product_id))?;

        match change {
            QuantityChange::Remove => {
                self.carts.delete_item(cart.id, product_id).await?;
                info!(cart_id = %cart.id, product_id = %product_id, "Item removed by quantity update");
            }
            QuantityChange::Set(quantity) => {
                self.carts
                    .set_item_quantity(item.id, quantity)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => CartError::ItemNotFound(product_id),
                        other => CartError::Repository(other),
                    })?;
                info!(cart_id = %cart.id, product_id = %product_id, quantity = %quantity, "Item quantity updated");
            }
        }

        self.snapshot(cart.id).await
    }

    /// Remove a product from the user's cart.
    ///
    /// Removing a product that is not in the cart succeeds and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidInput` if the product ID is not a positive integer.
    /// Returns `CartError::CartNotFound` if the user has no cart.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: impl Into<NumericInput> + Send,
    ) -> Result<CartSnapshot, CartError> {
        let product_id = ProductId::parse(&product_id.into())?;

        let cart = self
            .carts
            .find_cart_by_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        let removed = self.carts.delete_item(cart.id, product_id).await?;
        info!(cart_id = %cart.id, product_id = %product_id, removed, "Remove item");

        self.snapshot(cart.id).await
    }

    /// View the user's cart.
    ///
    /// A user without a cart gets `{cartId: null, items: []}`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store cannot be read.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartSnapshot, CartError> {
        match self.carts.find_cart_by_user(user_id).await? {
            Some(cart) => self.snapshot(cart.id).await,
            None => Ok(CartSnapshot::empty()),
        }
    }

    /// Remove every item from the user's cart. The cart itself is kept.
    ///
    /// Succeeds without doing anything if the user has no cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store cannot be written.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<(), CartError> {
        let Some(cart) = self.carts.find_cart_by_user(user_id).await? else {
            return Ok(());
        };

        let removed = self.carts.delete_all_items(cart.id).await?;
        info!(cart_id = %cart.id, removed, "Cart cleared");

        Ok(())
    }

    async fn snapshot(&self, cart_id: CartId) -> Result<CartSnapshot, CartError> {
        let items = self.carts.list_items(cart_id).await?;
        Ok(CartSnapshot {
            cart_id: Some(cart_id),
            items,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::CatalogProduct;
    use crate::db;

    /// Catalog double: every product exists unless listed as missing.
    #[derive(Default)]
    struct FakeCatalog {
        missing: HashSet<i64>,
        unavailable: bool,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn missing(ids: &[i64]) -> Self {
            Self {
                missing: ids.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn verify_exists(
            &self,
            product_id: ProductId,
        ) -> Result<CatalogProduct, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(CatalogError::Upstream { status: 503 });
            }
            if self.missing.contains(&product_id.as_i64()) {
                return Err(CatalogError::NotFound(product_id));
            }
            Ok(CatalogProduct(serde_json::json!({
                "productId": product_id.as_i64(),
                "name": "Test Product",
            })))
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = db::connect_in_memory().await.unwrap();
        db::migrate(&pool).await.unwrap();
        pool
    }

    fn lines(snapshot: &CartSnapshot) -> Vec<(i64, i64)> {
        snapshot
            .items
            .iter()
            .map(|l| (l.product_id.as_i64(), l.quantity.get()))
            .collect()
    }

    async fn cart_rows(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM carts")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn item_rows(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM cart_items")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_creates_cart_and_item() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let snapshot = service.add_item(UserId::new(1), 101, 2).await.unwrap();

        assert!(snapshot.cart_id.is_some());
        assert_eq!(lines(&snapshot), vec![(101, 2)]);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_add_same_product_twice_sums_quantities() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(2);

        let first = service.add_item(user, 200, 2).await.unwrap();
        let second = service.add_item(user, 200, 3).await.unwrap();

        assert_eq!(first.cart_id, second.cart_id);
        assert_eq!(lines(&second), vec![(200, 5)]);
        assert_eq!(cart_rows(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_add_past_max_quantity_is_invalid_input() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(8);

        service.add_item(user, 300, i64::MAX).await.unwrap();
        let err = service.add_item(user, 300, 1).await.unwrap_err();

        assert!(
            matches!(err, CartError::InvalidInput(InputError::QuantityTooLarge)),
            "got {err:?}"
        );
        let snapshot = service.get_cart(user).await.unwrap();
        assert_eq!(lines(&snapshot), vec![(300, i64::MAX)]);
    }

    #[tokio::test]
    async fn test_add_accepts_numeric_strings() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let snapshot = service.add_item(UserId::new(1), "42", " 3 ").await.unwrap();

        assert_eq!(lines(&snapshot), vec![(42, 3)]);
    }

    #[tokio::test]
    async fn test_add_invalid_input_touches_nothing() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(3);

        let zero_qty = service.add_item(user, 123, 0).await.unwrap_err();
        let bad_product = service.add_item(user, "abc", 1).await.unwrap_err();
        let negative_product = service.add_item(user, -5, 1).await.unwrap_err();
        let fractional_qty = service.add_item(user, 123, 1.5).await.unwrap_err();

        for err in [zero_qty, bad_product, negative_product, fractional_qty] {
            assert!(matches!(err, CartError::InvalidInput(_)), "got {err:?}");
        }
        assert_eq!(catalog.calls(), 0);
        assert_eq!(cart_rows(&pool).await, 0);
        assert_eq!(item_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_available() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::missing(&[999]);
        let service = CartService::new(&pool, &catalog);

        let err = service.add_item(UserId::new(4), 999, 1).await.unwrap_err();

        assert!(matches!(err, CartError::ItemNotAvailable(id) if id == ProductId::new(999)));
        assert_eq!(cart_rows(&pool).await, 0);
        assert_eq!(item_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_add_with_catalog_down_is_dependency_unavailable() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::unavailable();
        let service = CartService::new(&pool, &catalog);

        let err = service.add_item(UserId::new(4), 10, 1).await.unwrap_err();

        assert!(matches!(err, CartError::DependencyUnavailable(_)));
        assert_eq!(err.kind(), "dependency_unavailable");
        assert_eq!(item_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_view_without_cart_is_empty() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let snapshot = service.get_cart(UserId::new(100)).await.unwrap();

        assert_eq!(snapshot, CartSnapshot::empty());
        assert_eq!(cart_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_quantity() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(4);
        service.add_item(user, 300, 1).await.unwrap();

        let snapshot = service.update_item_quantity(user, 300, 5).await.unwrap();

        assert_eq!(lines(&snapshot), vec![(300, 5)]);
    }

    #[tokio::test]
    async fn test_update_to_zero_or_negative_removes_item() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(5);
        service.add_item(user, 400, 2).await.unwrap();
        let before = service.add_item(user, 401, 1).await.unwrap();

        let after_zero = service.update_item_quantity(user, 400, 0).await.unwrap();
        assert_eq!(after_zero.items.len(), before.items.len() - 1);
        assert_eq!(lines(&after_zero), vec![(401, 1)]);

        let after_negative = service.update_item_quantity(user, "401", "-3").await.unwrap();
        assert!(after_negative.items.is_empty());
    }

    #[tokio::test]
    async fn test_update_item_not_in_cart() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(6);
        service.add_item(user, 1, 1).await.unwrap();

        let err = service.update_item_quantity(user, 9999, 1).await.unwrap_err();

        assert!(matches!(err, CartError::ItemNotFound(id) if id == ProductId::new(9999)));
    }

    #[tokio::test]
    async fn test_update_without_cart() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let err = service
            .update_item_quantity(UserId::new(6), 9999, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::CartNotFound));
    }

    #[tokio::test]
    async fn test_update_rejects_non_numeric_quantity() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let err = service
            .update_item_quantity(UserId::new(6), 1, "lots")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::InvalidInput(InputError::QuantityNotInteger)
        ));
    }

    #[tokio::test]
    async fn test_update_does_not_consult_catalog() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(8);
        service.add_item(user, 50, 1).await.unwrap();

        service.update_item_quantity(user, 50, 4).await.unwrap();

        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_item_is_noop() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(7);
        let before = service.add_item(user, 500, 1).await.unwrap();

        let after = service.remove_item(user, 12345).await.unwrap();

        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_remove_without_cart() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let err = service.remove_item(UserId::new(8), 1234).await.unwrap_err();

        assert!(matches!(err, CartError::CartNotFound));
    }

    #[tokio::test]
    async fn test_remove_invalid_product_id() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        let err = service.remove_item(UserId::new(8), "x").await.unwrap_err();

        assert!(matches!(
            err,
            CartError::InvalidInput(InputError::InvalidProductId)
        ));
    }

    #[tokio::test]
    async fn test_clear_without_cart_is_idempotent() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(10);

        service.clear_cart(user).await.unwrap();
        service.clear_cart(user).await.unwrap();

        assert_eq!(cart_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_clear_keeps_empty_cart() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(9);
        let added = service.add_item(user, 700, 1).await.unwrap();
        service.add_item(user, 800, 3).await.unwrap();

        service.clear_cart(user).await.unwrap();
        let snapshot = service.get_cart(user).await.unwrap();

        assert_eq!(snapshot.cart_id, added.cart_id);
        assert!(snapshot.items.is_empty());
    }

    #[tokio::test]
    async fn test_add_add_remove_clear_flow() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);
        let user = UserId::new(11);

        service.add_item(user, 500, 1).await.unwrap();
        service.add_item(user, 600, 2).await.unwrap();
        let after_remove = service.remove_item(user, 500).await.unwrap();
        assert_eq!(lines(&after_remove), vec![(600, 2)]);

        service.clear_cart(user).await.unwrap();
        let after_clear = service.get_cart(user).await.unwrap();
        assert!(after_clear.items.is_empty());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let pool = test_pool().await;
        let catalog = FakeCatalog::default();
        let service = CartService::new(&pool, &catalog);

        service.add_item(UserId::new(20), 1, 1).await.unwrap();
        service.add_item(UserId::new(21), 2, 2).await.unwrap();

        let a = service.get_cart(UserId::new(20)).await.unwrap();
        let b = service.get_cart(UserId::new(21)).await.unwrap();
        assert_ne!(a.cart_id, b.cart_id);
        assert_eq!(lines(&a), vec![(1, 1)]);
        assert_eq!(lines(&b), vec![(2, 2)]);
    }

    #[test]
    fn test_catalog_error_mapping() {
        let err = CartError::from(CatalogError::NotFound(ProductId::new(3)));
        assert!(matches!(err, CartError::ItemNotAvailable(_)));

        let err = CartError::from(CatalogError::Upstream { status: 500 });
        assert!(matches!(err, CartError::DependencyUnavailable(_)));
    }
}
