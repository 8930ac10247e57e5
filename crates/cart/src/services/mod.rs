//! Business logic services for the cart service.
//!
//! # Services
//!
//! - `auth` - Bearer token verification (HS256)
//! - `cart` - Cart operations backed by the store and the product catalog

pub mod auth;
pub mod cart;

pub use auth::{AuthError, TokenVerifier};
pub use cart::{CartError, CartService};
