//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Every error response has the same JSON shape:
//!
//! ```json
//! { "error": "item_not_found", "message": "Item 42 not found in cart" }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::cart::CartError;

/// Application-level error type for the cart service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Request could not be authenticated.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Request body or path could not be read.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matches.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    /// Stable machine-readable tag sent as the `error` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cart(err) => err.kind(),
            Self::Auth(_) => "authentication_failed",
            Self::BadRequest(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CartError::ItemNotAvailable(_)
                | CartError::CartNotFound
                | CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                CartError::DependencyUnavailable(_) => StatusCode::BAD_GATEWAY,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Cart(CartError::Repository(_) | CartError::DependencyUnavailable(_))
        )
    }

    // Don't expose internal error details to clients
    fn client_message(&self) -> String {
        match self {
            Self::Cart(CartError::Repository(_)) => "Internal server error".to_string(),
            Self::Cart(CartError::DependencyUnavailable(_)) => {
                "Failed to verify product with Product Catalog".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, kind = self.kind(), "Request rejected");
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.client_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
