//! Database migration command.
//!
//! Applies the migrations embedded in the cart service
//! (`crates/cart/migrations/`). The service also applies them at startup
//! unless `CART_RUN_MIGRATIONS=false`; this command is for deployments that
//! turn that off.
//!
//! # Environment Variables
//!
//! - `CART_DATABASE_URL` - `SQLite` connection string (fallback: `DATABASE_URL`)

use secrecy::SecretString;
use thiserror::Error;

use shopping_cart_service::config::database_url_from_env;
use shopping_cart_service::db::{self, RepositoryError};

/// Pool size used for migrating.
const MIGRATE_MAX_CONNECTIONS: u32 = 1;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] RepositoryError),
}

/// Run cart store migrations.
///
/// # Errors
///
/// Returns error if the database cannot be opened or a migration fails.
pub async fn run(database_url: Option<String>) -> Result<(), MigrationError> {
    let database_url = database_url.map_or_else(database_url_from_env, SecretString::from);

    tracing::info!("Connecting to cart database...");
    let pool = db::create_pool(&database_url, MIGRATE_MAX_CONNECTIONS).await?;

    tracing::info!("Running cart migrations...");
    db::migrate(&pool).await?;

    pool.close().await;
    tracing::info!("Cart migrations complete!");
    Ok(())
}
