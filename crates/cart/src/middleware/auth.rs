//! Authentication extractor.
//!
//! Resolves the `Authorization: Bearer <token>` header to a [`UserId`] for
//! route handlers.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{Span, debug};

use shopping_cart_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with `401 {"error": "authentication_failed", ...}` when the header
/// is missing or the token fails verification.
///
/// # Example
///
/// ```rust,ignore
/// async fn view_cart(
///     State(state): State<AppState>,
///     RequireUser(user_id): RequireUser,
/// ) -> Result<Json<CartSnapshot>> {
///     Ok(Json(state.carts().get_cart(user_id).await?))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub UserId);

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = bearer_token(parts).ok_or(AuthError::MissingCredential)?;

        let user_id = state.tokens().verify(token).inspect_err(|e| {
            debug!(error = %e, "Bearer token rejected");
        })?;

        Span::current().record("user_id", user_id.as_i64());
        set_sentry_user(&user_id);

        Ok(Self(user_id))
    }
}

/// Token from an `Authorization: Bearer <token>` header, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
