//! # Domain Types
//!
//! Core domain types used throughout Bazaar.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │     Vendor      │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  email (unique) │◄──│  email (unique) │◄──│  vendor_id (FK) │       │
//! │  │  role           │   │  name, phone    │   │  price_cents    │       │
//! │  │  vendor_id?     │   └─────────────────┘   │  stock_quantity │       │
//! │  └────────┬────────┘                         └────────▲────────┘       │
//! │           │ owns                                      │ snapshot        │
//! │  ┌────────▼────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │     Order       │──►│   OrderItem     │   │  WishlistItem   │       │
//! │  │  status: Cart   │   │  quantity ≥ 1   │   │  (user, product)│       │
//! │  │   → Pending ... │   │  unit price     │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cart is not a separate entity: it is the one [`Order`] per user whose
//! status is [`OrderStatus::Cart`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// The role of an account. Authorization decisions match on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper.
    User,
    /// Platform administrator.
    Admin,
    /// Seller managing the products of one vendor.
    Vendor,
}

impl Role {
    /// Returns the lowercase name stored in the database and in tokens.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Vendor => "vendor",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    #[inline]
    pub const fn is_vendor(&self) -> bool {
        matches!(self, Role::Vendor)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "vendor" => Ok(Role::Vendor),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["user".into(), "admin".into(), "vendor".into()],
            }),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered account.
///
/// Credentials and the password-reset token never leave the server: they are
/// skipped during serialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,

    /// Argon2 PHC string.
    #[serde(skip)]
    pub password_hash: String,

    pub role: Role,

    /// Vendor this account manages (set for vendor accounts).
    pub vendor_id: Option<String>,

    #[serde(skip)]
    pub reset_token: Option<String>,

    #[serde(skip)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a new regular user with a fresh id.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: Role::User,
            vendor_id: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks whether `token` is this user's reset token and still valid at `now`.
    pub fn reset_token_matches(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires_at) {
            (Some(stored), Some(expires_at)) => stored == token && expires_at > now,
            _ => false,
        }
    }
}

/// Partial update of the caller's own profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Refresh Token
// =============================================================================

/// A persisted refresh token. Its presence (and `expires_at`) is what makes
/// a signed refresh token usable.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Store-side expiry check.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Vendor
// =============================================================================

/// A seller on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Vendor {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            address,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VendorUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl VendorUpdate {
    /// Applies the present fields to `vendor`.
    pub fn apply(self, vendor: &mut Vendor) {
        if let Some(name) = self.name {
            vendor.name = name;
        }
        if let Some(email) = self.email {
            vendor.email = email;
        }
        if let Some(phone) = self.phone {
            vendor.phone = phone;
        }
        if self.address.is_some() {
            vendor.address = self.address;
        }
        vendor.updated_at = Utc::now();
    }
}

// =============================================================================
// Product
// =============================================================================

/// A vendor-owned catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Owning vendor.
    pub vendor_id: String,

    pub name: String,
    pub description: Option<String>,

    /// Current price in cents. Cart lines copy this at add time.
    pub price_cents: i64,

    /// Units available.
    pub stock_quantity: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        vendor_id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        price_cents: i64,
        stock_quantity: i64,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            vendor_id: vendor_id.into(),
            name: name.into(),
            description,
            price_cents,
            stock_quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be put in a cart.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

/// Partial update of a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock_quantity: Option<i64>,
}

impl ProductUpdate {
    /// Applies the present fields to `product`.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if self.description.is_some() {
            product.description = self.description;
        }
        if let Some(price) = self.price_cents {
            product.price_cents = price;
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        product.updated_at = Utc::now();
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ## Lifecycle
/// ```text
///   Cart ──checkout──► Pending ──► Shipped ──► Delivered
///                         │           │
///                         └─────┬─────┘
///                               ▼
///                           Canceled (terminal, with reason)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The user's active cart.
    Cart,
    /// Checked out, awaiting shipment.
    Pending,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Cart => "cart",
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// `Cart → Pending` is not listed: it only happens through checkout.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                | (OrderStatus::Shipped, OrderStatus::Canceled)
        )
    }

    /// No transition leaves a terminal status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cart" => Ok(OrderStatus::Cart),
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "canceled" | "cancelled" => Ok(OrderStatus::Canceled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["cart", "pending", "shipped", "delivered", "canceled"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order, or a cart when `status` is [`OrderStatus::Cart`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,

    /// Σ quantity × unit price over the items, recomputed after every change.
    pub total_cents: i64,

    pub shipping_address: Option<String>,
    pub cancellation_reason: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// When the cart was checked out.
    #[ts(as = "Option<String>")]
    pub placed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A new empty cart for `user_id`.
    pub fn new_cart(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            status: OrderStatus::Cart,
            total_cents: 0,
            shipping_address: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            placed_at: None,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_cart(&self) -> bool {
        self.status == OrderStatus::Cart
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item. Uses the snapshot pattern: name and unit price are frozen
/// when the product is first added.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of adding (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Creates a line for `product`, snapshotting its current name and price.
    pub fn from_product(order_id: impl Into<String>, product: &Product, quantity: i64) -> Self {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price_cents: product.price_cents,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price × quantity, `None` on overflow.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price().checked_multiply_quantity(self.quantity)
    }
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Wishlist
// =============================================================================

/// One product saved to a user's wishlist.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WishlistItem {
    pub user_id: String,
    pub product_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Admin, Role::Vendor] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Vendor).unwrap(), "\"vendor\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Canceled));
        assert!(Shipped.can_transition_to(Canceled));

        assert!(!Cart.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Canceled));
        assert!(!Canceled.can_transition_to(Pending));
        assert!(!Shipped.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_order_status_parse_accepts_british_spelling() {
        assert_eq!("CANCELLED".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_secrets() {
        let mut user = User::new("alice", "alice@example.com", "$argon2id$hash");
        user.reset_token = Some("secret-token".to_string());

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("secret-token"));
        assert!(json.contains("alice@example.com"));
    }

    #[test]
    fn test_reset_token_matches() {
        let now = Utc::now();
        let mut user = User::new("bob", "bob@example.com", "hash");
        assert!(!user.reset_token_matches("t", now));

        user.reset_token = Some("t".to_string());
        user.reset_token_expires_at = Some(now + Duration::minutes(30));
        assert!(user.reset_token_matches("t", now));
        assert!(!user.reset_token_matches("other", now));
        assert!(!user.reset_token_matches("t", now + Duration::minutes(31)));
    }

    #[test]
    fn test_refresh_record_expiry() {
        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: "1".into(),
            user_id: "u".into(),
            token: "t".into(),
            expires_at: now,
            created_at: now,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_product_update_applies_present_fields() {
        let mut product = Product::new("v1", "Mug", None, 1200, 10);
        ProductUpdate {
            price_cents: Some(999),
            ..Default::default()
        }
        .apply(&mut product);

        assert_eq!(product.price_cents, 999);
        assert_eq!(product.name, "Mug");
        assert_eq!(product.stock_quantity, 10);
    }

    #[test]
    fn test_order_item_snapshots_product() {
        let mut product = Product::new("v1", "Lamp", None, 2500, 5);
        let item = OrderItem::from_product("o1", &product, 2);
        product.price_cents = 9999;

        assert_eq!(item.unit_price_cents, 2500);
        assert_eq!(item.line_total(), Some(Money::from_cents(5000)));
        assert_eq!(item.product_name, "Lamp");
    }
}
