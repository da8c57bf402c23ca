//! The caller's active cart.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::AppState;
use bazaar_core::validation::{validate_quantity, validate_uuid};
use bazaar_core::OrderDetail;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{product_id}", delete(remove_item))
        .route("/cart/checkout", post(checkout))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
}

/// Returns the active cart, creating an empty one on first use.
async fn get_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<OrderDetail>> {
    Ok(Json(state.db.orders().get_cart(&user.id).await?))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<Json<OrderDetail>> {
    validate_uuid(&req.product_id)?;
    validate_quantity(req.quantity)?;

    let cart = state
        .db
        .orders()
        .add_item(&user.id, &req.product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
) -> ApiResult<Json<OrderDetail>> {
    let cart = state
        .db
        .orders()
        .remove_item(&user.id, &product_id)
        .await?;
    Ok(Json(cart))
}

/// Places the cart as a pending order.
async fn checkout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<OrderDetail>> {
    let order = state
        .db
        .orders()
        .checkout(&user.id, &req.shipping_address)
        .await?;
    Ok(Json(order))
}
