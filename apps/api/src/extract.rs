//! # Request Authentication
//!
//! Axum extractors that turn a `Authorization: Bearer <access token>` header
//! into the calling [`User`].
//!
//! ```text
//! header present? ── no ──► 401
//!      │
//! verify(token), kind == access? ── no ──► 401
//!      │
//! load user by `sub` ── missing ──► 401
//!      │
//! CurrentUser(user)  ──► AdminUser additionally requires Role::Admin (403)
//! ```

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::{extract_bearer_token, TokenKind};
use crate::error::ApiError;
use crate::AppState;
use bazaar_core::access::require_admin;
use bazaar_core::User;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

        let user = authenticate(state, token).await?;
        Ok(CurrentUser(user))
    }
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(&user)?;
        Ok(AdminUser(user))
    }
}

/// Resolves an access token to its user.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = state
        .tokens
        .verify_kind(token, TokenKind::Access)
        .ok_or_else(|| ApiError::unauthenticated("Could not validate credentials"))?;

    state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Could not validate credentials"))
}
