//! # Orders
//!
//! Placed orders and their lifecycle.
//!
//! ```text
//! Pending ──► Shipped ──► Delivered
//!    │           │
//!    └─────┬─────┘
//!          ▼
//!      Canceled (reason required)
//! ```
//!
//! Only admins move orders between statuses. Owners can read their own.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::AppState;
use bazaar_core::access::ensure_order_access;
use bazaar_core::{Order, OrderDetail, OrderStatus};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/mine", get(my_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
        .route("/orders/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Json<Vec<Order>>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    Ok(Json(state.db.orders().list(status).await?))
}

async fn my_orders(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_for_user(&user.id).await?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderDetail>> {
    let detail = state
        .db
        .orders()
        .get_detail(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &id))?;

    ensure_order_access(&user, &detail.order)?;
    Ok(Json(detail))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Order>> {
    let next: OrderStatus = req.status.parse()?;

    let order = state
        .db
        .orders()
        .update_status(&id, next, req.reason.as_deref())
        .await?;

    tracing::info!(order_id = %order.id, admin_id = %admin.id, status = %order.status, "Order updated by admin");
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.orders().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
