//! Shopping cart service library.
//!
//! Per-user shopping carts over SQLite, with products checked against an
//! external Product Catalog and callers identified by HS256 bearer tokens.
//! The binary in `main.rs` serves [`routes::app`]; integration tests serve
//! the same router against an in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
