//! Cart repository for database operations.
//!
//! Every method is a single statement (or an insert-then-read pair guarded by a
//! unique constraint), so no transaction spans calls. The one-cart-per-user and
//! one-row-per-product invariants live in the schema, not in caller control flow.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use shopping_cart_core::{CartId, CartItemId, ProductId, Quantity, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Cart, CartItem, CartLine};

#[derive(FromRow)]
struct CartRow {
    cart_id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.cart_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CartItemRow {
    cart_item_id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i64,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.cart_item_id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: stored_quantity(row.quantity)?,
            added_at: row.added_at,
        })
    }
}

#[derive(FromRow)]
struct CartLineRow {
    product_id: ProductId,
    quantity: i64,
}

fn stored_quantity(n: i64) -> Result<Quantity, RepositoryError> {
    Quantity::new(n).ok_or_else(|| {
        RepositoryError::DataCorruption(format!("non-positive quantity in database: {n}"))
    })
}

/// Repository for cart and line item database operations.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Carts
    // =========================================================================

    /// Get the cart owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT cart_id, user_id, created_at
            FROM carts
            WHERE user_id = ?
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// Create a cart for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a cart.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO carts (user_id, created_at)
            VALUES (?, ?)
            RETURNING cart_id, user_id, created_at
            ",
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "user already has a cart"))?;

        Ok(row.into())
    }

    /// Get the user's cart, creating it if absent.
    ///
    /// Concurrent callers for the same user all observe the same cart: the
    /// insert is a no-op when the `user_id` constraint already holds a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails.
    pub async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO carts (user_id, created_at)
            VALUES (?, ?)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        self.find_cart_by_user(user_id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("cart for user {user_id} vanished after insert")))
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// List the items of a cart in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is not positive.
    pub async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT product_id, quantity
            FROM cart_items
            WHERE cart_id = ?
            ORDER BY cart_item_id ASC
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(CartLine {
                    product_id: r.product_id,
                    quantity: stored_quantity(r.quantity)?,
                })
            })
            .collect()
    }

    /// Get the line item for a product in a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT cart_item_id, cart_id, product_id, quantity, added_at
            FROM cart_items
            WHERE cart_id = ? AND product_id = ?
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    /// Insert a new line item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already in the cart.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity, added_at)
            VALUES (?, ?, ?, ?)
            RETURNING cart_item_id, cart_id, product_id, quantity, added_at
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.get())
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product already in cart"))?;

        row.try_into()
    }

    /// Add `quantity` to a product's line, inserting the line if absent.
    ///
    /// Runs as one statement, so concurrent adds of the same product sum
    /// instead of producing duplicate rows. A sum past `i64::MAX` leaves the
    /// line untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::QuantityOverflow` if the sum would not fit.
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn add_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        // SQLite turns an overflowing integer sum into a REAL, so guard it
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity, added_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (cart_id, product_id)
                DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
                WHERE cart_items.quantity <= 9223372036854775807 - excluded.quantity
            RETURNING cart_item_id, cart_id, product_id, quantity, added_at
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.get())
        .bind(Utc::now())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::QuantityOverflow)?;

        row.try_into()
    }

    /// Replace the quantity of a line item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_item_quantity(
        &self,
        cart_item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cart_items
            SET quantity = ?
            WHERE cart_item_id = ?
            ",
        )
        .bind(quantity.get())
        .bind(cart_item_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a product's line from a cart.
    ///
    /// # Returns
    ///
    /// Returns `true` if a line was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_items
            WHERE cart_id = ? AND product_id = ?
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every line of a cart. The cart row itself is kept.
    ///
    /// # Returns
    ///
    /// Returns the number of deleted lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all_items(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_pool() -> SqlitePool {
        let pool = db::connect_in_memory().await.unwrap();
        db::migrate(&pool).await.unwrap();
        pool
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_find_cart_absent() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);

        assert!(repo.find_cart_by_user(UserId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_cart_then_find() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);

        let created = repo.create_cart(UserId::new(1)).await.unwrap();
        let found = repo.find_cart_by_user(UserId::new(1)).await.unwrap().unwrap();

        assert_eq!(created.id, found.id);
        assert_eq!(found.user_id, UserId::new(1));
    }

    #[tokio::test]
    async fn test_create_cart_twice_conflicts() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);

        repo.create_cart(UserId::new(1)).await.unwrap();
        let err = repo.create_cart(UserId::new(1)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_or_create_cart_is_stable() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);

        let first = repo.get_or_create_cart(UserId::new(5)).await.unwrap();
        let second = repo.get_or_create_cart(UserId::new(5)).await.unwrap();
        let other = repo.get_or_create_cart(UserId::new(6)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_insert_item_rejects_duplicate_product() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(1)).await.unwrap();

        let item = repo
            .insert_item(cart.id, ProductId::new(101), qty(2))
            .await
            .unwrap();
        assert_eq!(item.quantity.get(), 2);

        let err = repo
            .insert_item(cart.id, ProductId::new(101), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_add_item_quantity_accumulates() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(2)).await.unwrap();

        let first = repo
            .add_item_quantity(cart.id, ProductId::new(200), qty(2))
            .await
            .unwrap();
        let second = repo
            .add_item_quantity(cart.id, ProductId::new(200), qty(3))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity.get(), 5);

        let items = repo.list_items(cart.id).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_add_item_quantity_overflow_leaves_line_unchanged() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(12)).await.unwrap();

        repo.add_item_quantity(cart.id, ProductId::new(300), qty(i64::MAX - 1))
            .await
            .unwrap();
        let at_max = repo
            .add_item_quantity(cart.id, ProductId::new(300), qty(1))
            .await
            .unwrap();
        assert_eq!(at_max.quantity.get(), i64::MAX);

        let err = repo
            .add_item_quantity(cart.id, ProductId::new(300), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::QuantityOverflow));

        let item = repo
            .find_item(cart.id, ProductId::new(300))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity.get(), i64::MAX);
    }

    #[tokio::test]
    async fn test_set_item_quantity() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(3)).await.unwrap();
        let item = repo
            .insert_item(cart.id, ProductId::new(300), qty(1))
            .await
            .unwrap();

        repo.set_item_quantity(item.id, qty(9)).await.unwrap();
        let updated = repo
            .find_item(cart.id, ProductId::new(300))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.quantity.get(), 9);

        let err = repo
            .set_item_quantity(CartItemId::new(9999), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_item_absent_is_noop() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(4)).await.unwrap();
        repo.insert_item(cart.id, ProductId::new(1), qty(1))
            .await
            .unwrap();

        assert!(!repo.delete_item(cart.id, ProductId::new(2)).await.unwrap());
        assert!(repo.delete_item(cart.id, ProductId::new(1)).await.unwrap());
        assert!(repo.list_items(cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_items_keeps_cart() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(9)).await.unwrap();
        repo.insert_item(cart.id, ProductId::new(700), qty(1))
            .await
            .unwrap();
        repo.insert_item(cart.id, ProductId::new(800), qty(3))
            .await
            .unwrap();

        assert_eq!(repo.delete_all_items(cart.id).await.unwrap(), 2);
        assert_eq!(repo.delete_all_items(cart.id).await.unwrap(), 0);
        assert!(repo.list_items(cart.id).await.unwrap().is_empty());
        assert!(repo.find_cart_by_user(UserId::new(9)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_items_in_insertion_order() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.create_cart(UserId::new(7)).await.unwrap();
        repo.insert_item(cart.id, ProductId::new(600), qty(2))
            .await
            .unwrap();
        repo.insert_item(cart.id, ProductId::new(500), qty(1))
            .await
            .unwrap();

        let products: Vec<i64> = repo
            .list_items(cart.id)
            .await
            .unwrap()
            .iter()
            .map(|line| line.product_id.as_i64())
            .collect();
        assert_eq!(products, vec![600, 500]);
    }
}
