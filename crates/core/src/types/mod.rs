//! Core types for the shopping cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod input;

pub use id::*;
pub use input::{InputError, NumericInput, Quantity, QuantityChange};
