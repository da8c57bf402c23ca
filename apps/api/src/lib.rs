//! # Bazaar API
//!
//! REST server for the Bazaar marketplace.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         API Surface                                     │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Accounts      │  │  Catalog       │  │  Shopping                  ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • vendors      │  │ • cart + checkout          ││
//! │  │ • token/refresh│  │ • products     │  │ • wishlist + move-to-cart  ││
//! │  │ • reset pwd    │  │                │  │ • orders lifecycle         ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │ EmailSender  │  │    JWT + argon2          ││  │
//! │  │  │  bazaar-db   │  │ (log/memory) │  │    TokenService          ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables, see [`config::ApiConfig::load`]:
//! - `HTTP_HOST` / `HTTP_PORT` - bind address; the host must be an IP literal (default: 0.0.0.0:8000)
//! - `DATABASE_PATH` - SQLite file (default: bazaar.db)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 1800)
//! - `JWT_REFRESH_LIFETIME_SECS` - Refresh token lifetime (default: 86400)
//! - `PASSWORD_RESET_LIFETIME_SECS` - Reset token lifetime (default: 1800)
//! - `PUBLIC_BASE_URL` - Base for links in emails

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod extract;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::email::EmailSender;
use bazaar_db::Database;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub tokens: TokenService,
    pub email: Arc<dyn EmailSender>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(db: Database, email: Arc<dyn EmailSender>, config: ApiConfig) -> Self {
        AppState {
            db,
            tokens: TokenService::new(config.token_config()),
            email,
            config,
        }
    }
}

/// Builds the full HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::users::router())
        .merge(routes::vendors::router())
        .merge(routes::products::router())
        .merge(routes::cart::router())
        .merge(routes::wishlist::router())
        .merge(routes::orders::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
