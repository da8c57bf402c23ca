//! Account routes: registration, tokens, password reset, profile and
//! admin user management.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::services::auth_service::{
    LoginRequest, MessageResponse, PasswordResetRequest, RefreshRequest, RegisterRequest,
    RegisterResponse, ResetPasswordRequest, TokenResponse,
};
use crate::services::AuthService;
use crate::AppState;
use bazaar_core::validation::{validate_email, validate_username};
use bazaar_core::{ProfileUpdate, Role, User};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/register", post(register))
        .route("/token", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/users/request-password-reset", post(request_password_reset))
        .route("/users/reset-password", post(reset_password))
        .route("/users/me", get(me).put(update_me))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}", delete(delete_user))
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
    pub vendor_id: Option<String>,
}

// =============================================================================
// Accounts and Tokens
// =============================================================================

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let registered = AuthService::new(&state).register(req).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(AuthService::new(&state).login(req).await?))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(AuthService::new(&state).refresh(req).await?))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<LogoutRequest>,
) -> ApiResult<StatusCode> {
    AuthService::new(&state)
        .logout(&user, &req.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(
        AuthService::new(&state).request_password_reset(req).await?,
    ))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(AuthService::new(&state).reset_password(req).await?))
}

// =============================================================================
// Profile
// =============================================================================

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let username = match req.username {
        Some(name) => {
            let name = name.trim().to_string();
            validate_username(&name)?;
            Some(name)
        }
        None => None,
    };
    let email = req.email.as_deref().map(validate_email).transpose()?;

    let update = ProfileUpdate { username, email };
    let updated = state.db.users().update_profile(&user.id, &update).await?;
    Ok(Json(updated))
}

// =============================================================================
// Administration
// =============================================================================

async fn set_role(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<Json<User>> {
    let role: Role = req.role.parse()?;

    let vendor_id = match role {
        Role::Vendor => {
            let vendor_id = req
                .vendor_id
                .as_deref()
                .ok_or_else(|| ApiError::validation("vendor_id is required for the vendor role"))?;
            state
                .db
                .vendors()
                .get_by_id(vendor_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Vendor", vendor_id))?;
            Some(vendor_id)
        }
        Role::User | Role::Admin => None,
    };

    let user = state.db.users().set_role(&id, role, vendor_id).await?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.users().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
