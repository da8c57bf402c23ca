//! Vendor management. Admins manage all vendors; a vendor account may read
//! and edit its own vendor profile.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::AppState;
use bazaar_core::access::ensure_vendor_access;
use bazaar_core::validation::{
    validate_email, validate_name, validate_phone, validate_required_text,
};
use bazaar_core::{ValidationError, Vendor, VendorUpdate};

const MAX_ADDRESS_LENGTH: usize = 500;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route(
            "/vendors/{id}",
            get(get_vendor).put(update_vendor).delete(delete_vendor),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

impl CreateVendorRequest {
    fn into_vendor(self) -> Result<Vendor, ValidationError> {
        let name = self.name.trim().to_string();
        validate_name("name", &name)?;
        let email = validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        let address = self
            .address
            .as_deref()
            .map(|a| validate_required_text("address", a, MAX_ADDRESS_LENGTH))
            .transpose()?;

        Ok(Vendor::new(name, email, self.phone.trim(), address))
    }
}

/// Validates and normalizes the present fields of a vendor update.
fn validate_update(mut update: VendorUpdate) -> Result<VendorUpdate, ValidationError> {
    if let Some(name) = update.name.as_deref() {
        let name = name.trim().to_string();
        validate_name("name", &name)?;
        update.name = Some(name);
    }
    if let Some(email) = update.email.as_deref() {
        update.email = Some(validate_email(email)?);
    }
    if let Some(phone) = update.phone.as_deref() {
        validate_phone(phone)?;
        update.phone = Some(phone.trim().to_string());
    }
    if let Some(address) = update.address.as_deref() {
        update.address = Some(validate_required_text("address", address, MAX_ADDRESS_LENGTH)?);
    }
    Ok(update)
}

async fn list_vendors(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<Vendor>>> {
    Ok(Json(state.db.vendors().list().await?))
}

async fn create_vendor(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<CreateVendorRequest>,
) -> ApiResult<(StatusCode, Json<Vendor>)> {
    let vendor = req.into_vendor()?;
    state.db.vendors().insert(&vendor).await?;

    tracing::info!(vendor_id = %vendor.id, "Vendor created");
    Ok((StatusCode::CREATED, Json(vendor)))
}

async fn get_vendor(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vendor>> {
    ensure_vendor_access(&user, &id)?;

    let vendor = state
        .db
        .vendors()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vendor", &id))?;
    Ok(Json(vendor))
}

async fn update_vendor(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<VendorUpdate>,
) -> ApiResult<Json<Vendor>> {
    ensure_vendor_access(&user, &id)?;
    let update = validate_update(update)?;

    let vendors = state.db.vendors();
    let mut vendor = vendors
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vendor", &id))?;

    update.apply(&mut vendor);
    vendors.update(&vendor).await?;
    Ok(Json(vendor))
}

async fn delete_vendor(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.vendors().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
