//! Domain models for the cart service.

pub mod cart;

pub use cart::{Cart, CartItem, CartLine, CartSnapshot};
