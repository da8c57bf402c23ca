//! # HTTP Routes
//!
//! One module per resource. Each exposes `router()` returning a
//! `Router<Arc<AppState>>` that [`crate::build_router`] merges.
//!
//! ## Auth Levels
//! ```text
//! none    │ /health, /users/register, /token, /refresh, password reset,
//!         │ product reads
//! bearer  │ CurrentUser extractor: /users/me, /logout, cart, wishlist,
//!         │ /orders/mine, /orders/{id} (owner or admin)
//! admin   │ AdminUser extractor: roles, user deletion, vendors, order admin
//! mixed   │ product writes and vendor edits: checked against ownership
//! ```

pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;
pub mod vendors;
pub mod wishlist;
