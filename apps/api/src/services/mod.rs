//! Service layer: multi-step operations that span the database, the token
//! service and email. Route handlers stay thin and call into these.

pub mod auth_service;

pub use auth_service::AuthService;
