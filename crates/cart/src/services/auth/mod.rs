//! Authentication service.
//!
//! Verifies HS256-signed bearer tokens (JWT) against a shared secret and
//! resolves them to a [`UserId`].
//!
//! - header `alg` must be `HS256`; every other algorithm is rejected
//! - `exp` (seconds since epoch), if present, must not be in the past
//! - `nbf`, if present, must not be in the future
//! - the user is the first truthy claim among `userId`, `user_id`, `sub`

mod error;

pub use error::AuthError;

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};

use shopping_cart_core::{NumericInput, UserId};

/// The only accepted signing algorithm.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims consulted for the user id, in order.
const USER_ID_CLAIMS: [&str; 3] = ["userId", "user_id", "sub"];

/// Registered time claims that must be integer NumericDates when present.
const TIME_CLAIMS: [&str; 2] = ["exp", "nbf"];

type Claims = Map<String, Value>;

/// Verifies (and, for tooling, issues) bearer tokens.
#[derive(Debug)]
pub struct TokenVerifier {
    secret: SecretString,
}

impl TokenVerifier {
    /// Create a verifier for tokens signed with `secret`.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify a bearer token and return the user it identifies.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` describing the first check the token fails.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.trim();

        let header = decode_header(token).map_err(|e| map_jwt_error(&e))?;
        if header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let data = decode::<Claims>(token, &key, &validation()).map_err(|e| map_jwt_error(&e))?;

        check_time_claims(&data.claims)?;
        user_id_from_claims(&data.claims)
    }

    /// Mint a token for `user_id`, valid for `ttl` if given.
    ///
    /// # Errors
    ///
    /// Returns error if the token cannot be signed.
    pub fn issue(&self, user_id: UserId, ttl: Option<Duration>) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let mut claims = json!({ "userId": user_id, "iat": now });

        if let Some(ttl) = ttl {
            let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            claims["exp"] = json!(now.saturating_add(ttl));
        }

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(ALGORITHM), &claims, &key).map_err(|e| {
            tracing::warn!(error = %e, "Failed to sign token");
            AuthError::MalformedCredential
        })
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(ALGORITHM);
    // exp is optional
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AuthError::UnsupportedAlgorithm(err.to_string())
        }
        _ => AuthError::MalformedCredential,
    }
}

/// The decoder skips time claims it cannot read as integers, which would
/// leave such a token unbounded. `null` counts as absent.
fn check_time_claims(claims: &Claims) -> Result<(), AuthError> {
    for name in TIME_CLAIMS {
        match claims.get(name) {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) if n.is_u64() => {}
            Some(_) => return Err(AuthError::MalformedCredential),
        }
    }
    Ok(())
}

fn user_id_from_claims(claims: &Claims) -> Result<UserId, AuthError> {
    let value = USER_ID_CLAIMS
        .iter()
        .filter_map(|name| claims.get(*name))
        .find(|value| is_truthy(value))
        .ok_or(AuthError::MissingUserId)?;

    serde_json::from_value::<NumericInput>(value.clone())
        .ok()
        .and_then(|input| input.to_integer())
        .filter(|id| *id > 0)
        .map(UserId::new)
        .ok_or(AuthError::MissingUserId)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
