//! Cart route handlers.
//!
//! JSON in, JSON out. Every handler takes [`RequireUser`], so unauthenticated
//! requests are rejected before any cart code runs. Numeric fields are read
//! loosely (numbers or numeric strings) and validated by the cart service.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use shopping_cart_core::NumericInput;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::CartSnapshot;
use crate::state::AppState;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[serde(default, alias = "product_id")]
    pub product_id: NumericInput,
    #[serde(default)]
    pub quantity: NumericInput,
}

/// Body of `PUT /api/cart/items/{product_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub quantity: NumericInput,
}

fn reject_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

fn reject_path(rejection: PathRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Add a product to the caller's cart.
#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartSnapshot>> {
    let Json(body) = payload.map_err(reject_body)?;

    let snapshot = state
        .carts()
        .add_item(user_id, body.product_id, body.quantity)
        .await?;

    Ok(Json(snapshot))
}

/// Replace the quantity of a product in the caller's cart.
#[instrument(skip(state, path, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    path: std::result::Result<Path<String>, PathRejection>,
    payload: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartSnapshot>> {
    let Path(product_id) = path.map_err(reject_path)?;
    let Json(body) = payload.map_err(reject_body)?;

    let snapshot = state
        .carts()
        .update_item_quantity(user_id, product_id, body.quantity)
        .await?;

    Ok(Json(snapshot))
}

/// Remove a product from the caller's cart.
#[instrument(skip(state, path))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<CartSnapshot>> {
    let Path(product_id) = path.map_err(reject_path)?;
    let snapshot = state.carts().remove_item(user_id, product_id).await?;
    Ok(Json(snapshot))
}

/// View the caller's cart.
#[instrument(skip(state))]
pub async fn view(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<CartSnapshot>> {
    let snapshot = state.carts().get_cart(user_id).await?;
    Ok(Json(snapshot))
}

/// Empty the caller's cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<StatusCode> {
    state.carts().clear_cart(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_request_accepts_loose_numbers() {
        let req: AddItemRequest =
            serde_json::from_str(r#"{"productId": "101", "quantity": 2}"#).unwrap();
        assert_eq!(req.product_id.to_integer(), Some(101));
        assert_eq!(req.quantity.to_integer(), Some(2));
    }

    #[test]
    fn test_add_item_request_missing_fields_default() {
        let req: AddItemRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.product_id, NumericInput::Missing);
        assert_eq!(req.quantity, NumericInput::Missing);
    }

    #[test]
    fn test_update_item_request() {
        let req: UpdateItemRequest = serde_json::from_str(r#"{"quantity": -1}"#).unwrap();
        assert_eq!(req.quantity.to_integer(), Some(-1));
    }
}
