//! # bazaar-core: Pure Business Logic for Bazaar
//!
//! This crate holds the rules of the marketplace as pure functions with zero
//! I/O dependencies. The database layer and the HTTP server both call into it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bazaar-api (axum)                            │   │
//! │  │    /users  /token  /refresh  /cart  /wishlist  /orders         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   cart    │  │  access   │  │ validation│  │   │
//! │  │   │ User,Role │  │ add/merge │  │ admin?    │  │  email    │  │   │
//! │  │   │ Order     │  │ totals    │  │ owner?    │  │  password │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Vendor, Product, Order, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - Cart aggregate: add-or-merge, removal, totals, checkout checks
//! - [`access`] - Role and ownership predicates
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::{OrderStatus, Role};
//!
//! assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
//! assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Canceled));
//! assert!(Role::Admin.is_admin());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Highest accepted product price, in cents ($1,000,000.00).
///
/// With MAX_ITEM_QUANTITY and MAX_CART_ITEMS this keeps every cart total
/// far inside i64.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Maximum distinct line items allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Minimum password length accepted at registration and reset.
pub const MIN_PASSWORD_LENGTH: usize = 8;
