//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while authenticating a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("missing bearer token")]
    MissingCredential,

    /// The token is not a well-formed compact JWS.
    #[error("malformed token")]
    MalformedCredential,

    /// The token header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the shared secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The `exp` claim is in the past.
    #[error("token expired")]
    Expired,

    /// The `nbf` claim is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// None of `userId`, `user_id`, `sub` holds a positive integer.
    #[error("token carries no valid user id")]
    MissingUserId,
}
