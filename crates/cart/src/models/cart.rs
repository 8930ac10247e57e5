//! Cart domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopping_cart_core::{CartId, CartItemId, ProductId, Quantity, UserId};

/// A user's cart (domain type).
///
/// Created lazily on the first add; clearing empties it but never deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    /// Store-assigned cart ID.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
}

/// A stored line item (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    /// Store-assigned line item ID.
    pub id: CartItemId,
    /// Parent cart.
    pub cart_id: CartId,
    /// Catalog product.
    pub product_id: ProductId,
    /// Always positive while the row exists.
    pub quantity: Quantity,
    /// When the product was first added.
    pub added_at: DateTime<Utc>,
}

/// One `(product, quantity)` pairing as returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// The `{cartId, items}` view returned by most cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// `None` when the user has never added anything.
    pub cart_id: Option<CartId>,
    pub items: Vec<CartLine>,
}

impl CartSnapshot {
    /// The snapshot for a user without a cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
        }
    }
}
