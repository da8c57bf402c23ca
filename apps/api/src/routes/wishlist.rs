//! The caller's wishlist.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::AppState;
use bazaar_core::validation::{validate_quantity, validate_uuid};
use bazaar_core::{OrderDetail, Product, WishlistItem};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wishlist", get(list))
        .route("/wishlist/items", post(add))
        .route("/wishlist/items/{product_id}", delete(remove))
        .route("/wishlist/move-to-cart", post(move_to_cart))
}

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveToCartRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.wishlist().list(&user.id).await?))
}

async fn add(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<WishlistRequest>,
) -> ApiResult<(StatusCode, Json<WishlistItem>)> {
    validate_uuid(&req.product_id)?;
    let item = state.db.wishlist().add(&user.id, &req.product_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.wishlist().remove(&user.id, &product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a wishlist entry into the cart and returns the updated cart.
async fn move_to_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<MoveToCartRequest>,
) -> ApiResult<Json<OrderDetail>> {
    validate_uuid(&req.product_id)?;
    validate_quantity(req.quantity)?;

    let cart = state
        .db
        .wishlist()
        .move_to_cart(&user.id, &req.product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}
