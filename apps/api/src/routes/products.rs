//! Product catalog. Reads are public; writes are limited to admins and the
//! owning vendor.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentUser;
use crate::AppState;
use bazaar_core::access::{ensure_vendor_access, resolve_product_vendor};
use bazaar_core::validation::{
    validate_name, validate_price_cents, validate_required_text, validate_stock_quantity,
};
use bazaar_core::{Product, ProductUpdate, ValidationError};

const MAX_DESCRIPTION_LENGTH: usize = 2000;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    pub vendor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Required for admins, optional for vendors (defaults to their own).
    pub vendor_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock_quantity: i64,
}

fn validate_description(description: Option<&str>) -> Result<Option<String>, ValidationError> {
    description
        .map(|d| validate_required_text("description", d, MAX_DESCRIPTION_LENGTH))
        .transpose()
}

fn validate_update(mut update: ProductUpdate) -> Result<ProductUpdate, ValidationError> {
    if let Some(name) = update.name.as_deref() {
        let name = name.trim().to_string();
        validate_name("name", &name)?;
        update.name = Some(name);
    }
    update.description = validate_description(update.description.as_deref())?;
    if let Some(price) = update.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(stock) = update.stock_quantity {
        validate_stock_quantity(stock)?;
    }
    Ok(update)
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .db
        .products()
        .list(filter.vendor_id.as_deref())
        .await?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(Json(product))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let vendor_id = resolve_product_vendor(&user, req.vendor_id.as_deref())?.to_string();

    let name = req.name.trim().to_string();
    validate_name("name", &name)?;
    let description = validate_description(req.description.as_deref())?;
    validate_price_cents(req.price_cents)?;
    validate_stock_quantity(req.stock_quantity)?;

    state
        .db
        .vendors()
        .get_by_id(&vendor_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vendor", &vendor_id))?;

    let product = Product::new(vendor_id, name, description, req.price_cents, req.stock_quantity);
    state.db.products().insert(&product).await?;

    tracing::info!(product_id = %product.id, vendor_id = %product.vendor_id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Loads a product and checks the caller may modify it.
async fn load_owned(state: &AppState, user: &bazaar_core::User, id: &str) -> ApiResult<Product> {
    let product = state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    ensure_vendor_access(user, &product.vendor_id)?;
    Ok(product)
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    let mut product = load_owned(&state, &user, &id).await?;
    let update = validate_update(update)?;

    update.apply(&mut product);
    state.db.products().update(&product).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    load_owned(&state, &user, &id).await?;
    state.db.products().delete(&id).await?;

    tracing::info!(product_id = %id, user_id = %user.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
