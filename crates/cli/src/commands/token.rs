//! Development token command.
//!
//! Mints a bearer token the cart service will accept, signed with the same
//! `JWT_SECRET` the service is configured with.

use std::time::Duration;

use thiserror::Error;

use shopping_cart_core::UserId;
use shopping_cart_service::config::{AuthConfig, ConfigError};
use shopping_cart_service::services::auth::{AuthError, TokenVerifier};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("user id must be positive (got {0})")]
    InvalidUserId(i64),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signing error: {0}")]
    Signing(#[from] AuthError),
}

/// Issue a token for `user_id`, expiring after `ttl_secs` if given.
///
/// # Errors
///
/// Returns error if the user id is not positive or `JWT_SECRET` is missing
/// or fails validation.
pub fn issue(user_id: i64, ttl_secs: Option<u64>) -> Result<String, TokenError> {
    if user_id <= 0 {
        return Err(TokenError::InvalidUserId(user_id));
    }

    let auth = AuthConfig::from_env()?;
    let verifier = TokenVerifier::new(auth.jwt_secret);

    let token = verifier.issue(UserId::new(user_id), ttl_secs.map(Duration::from_secs))?;
    tracing::info!(user_id, ttl_secs, "Token issued");

    Ok(token)
}
