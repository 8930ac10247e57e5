//! Shopping Cart Core - Shared types library.
//!
//! This crate provides common types used across the shopping cart components:
//! - `cart` - The cart HTTP service (store, catalog client, auth gate)
//! - `cli` - Command-line tools for migrations and development tokens
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, quantities, and loose numeric input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
