//! # Repository Module
//!
//! Database repository implementations for Bazaar.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.orders().add_item(&user.id, &product_id, 2)                │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── opens a transaction                                               │
//! │  ├── loads the cart aggregate (OrderDetail)                            │
//! │  ├── applies the rule from bazaar-core                                 │
//! │  └── writes the changed rows, commits                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime (`sqlx::query_as::<_, T>`), with row mapping
//! from the `sqlx::FromRow` derives on the core types.
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Credential store and profiles
//! - [`refresh_token::RefreshTokenRepository`] - Persisted refresh tokens
//! - [`vendor::VendorRepository`] - Vendor CRUD
//! - [`product::ProductRepository`] - Catalog CRUD
//! - [`order::OrderRepository`] - Carts, checkout and order lifecycle
//! - [`wishlist::WishlistRepository`] - Wishlist and move-to-cart

pub mod order;
pub mod product;
pub mod refresh_token;
pub mod user;
pub mod vendor;
pub mod wishlist;
