//! # Access Rules
//!
//! Role and ownership predicates. Authentication (who is calling) happens in
//! the API layer; these functions decide what an identified [`User`] may do.
//!
//! ## Decision Table
//! ```text
//! ┌──────────────────────────┬───────┬────────────────┬──────────────┐
//! │ Check                    │ Admin │ Vendor         │ User         │
//! ├──────────────────────────┼───────┼────────────────┼──────────────┤
//! │ require_admin            │  ✓    │  Forbidden     │  Forbidden   │
//! │ require_vendor           │  ✗    │  ✓ (linked)    │  Forbidden   │
//! │ ensure_vendor_access(v)  │  ✓    │  ✓ if own v    │  Forbidden   │
//! │ ensure_order_access(o)   │  ✓    │  ✓ if owner    │  ✓ if owner  │
//! └──────────────────────────┴───────┴────────────────┴──────────────┘
//! ```
//!
//! Every check matches on [`Role`] exhaustively, so a new role cannot slip
//! through unhandled.

use crate::error::{CoreError, CoreResult};
use crate::types::{Order, Role, User};

/// Allows only administrators.
pub fn require_admin(user: &User) -> CoreResult<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::User | Role::Vendor => Err(CoreError::forbidden("Admin access required")),
    }
}

/// Allows only vendor accounts linked to a vendor. Returns the vendor id.
pub fn require_vendor(user: &User) -> CoreResult<&str> {
    match user.role {
        Role::Vendor => user
            .vendor_id
            .as_deref()
            .ok_or_else(|| CoreError::forbidden("Vendor account is not linked to a vendor")),
        Role::User | Role::Admin => Err(CoreError::forbidden("Vendor access required")),
    }
}

/// Allows admins, and vendors acting on their own vendor's resources.
///
/// Used for product update/delete and vendor profile edits.
pub fn ensure_vendor_access(user: &User, owner_vendor_id: &str) -> CoreResult<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Vendor if user.vendor_id.as_deref() == Some(owner_vendor_id) => Ok(()),
        Role::Vendor => Err(CoreError::forbidden(
            "Vendors may only manage their own resources",
        )),
        Role::User => Err(CoreError::forbidden("Vendor access required")),
    }
}

/// Allows the order's owner and admins.
pub fn ensure_order_access(user: &User, order: &Order) -> CoreResult<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::User | Role::Vendor if order.user_id == user.id => Ok(()),
        Role::User | Role::Vendor => Err(CoreError::forbidden("Not your order")),
    }
}

/// Resolves the vendor a new product belongs to.
///
/// Vendors always create under their own vendor; admins must name one.
pub fn resolve_product_vendor<'a>(
    user: &'a User,
    requested: Option<&'a str>,
) -> CoreResult<&'a str> {
    match user.role {
        Role::Vendor => {
            let own = require_vendor(user)?;
            match requested {
                Some(other) if other != own => Err(CoreError::forbidden(
                    "Vendors may only create products for their own vendor",
                )),
                _ => Ok(own),
            }
        }
        Role::Admin => requested.ok_or_else(|| {
            CoreError::Validation(crate::error::ValidationError::Required {
                field: "vendor_id".to_string(),
            })
        }),
        Role::User => Err(CoreError::forbidden("Vendor access required")),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(role: Role, vendor_id: Option<&str>) -> User {
        let mut user = User::new("someone", "someone@example.com", "hash");
        user.role = role;
        user.vendor_id = vendor_id.map(str::to_string);
        user
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user_with(Role::Admin, None)).is_ok());
        assert!(matches!(
            require_admin(&user_with(Role::User, None)),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            require_admin(&user_with(Role::Vendor, Some("v1"))),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn test_require_vendor() {
        assert_eq!(require_vendor(&user_with(Role::Vendor, Some("v1"))).unwrap(), "v1");
        assert!(require_vendor(&user_with(Role::Vendor, None)).is_err());
        assert!(require_vendor(&user_with(Role::Admin, None)).is_err());
        assert!(require_vendor(&user_with(Role::User, None)).is_err());
    }

    #[test]
    fn test_vendor_access_owner_and_admin_bypass() {
        assert!(ensure_vendor_access(&user_with(Role::Vendor, Some("v1")), "v1").is_ok());
        assert!(ensure_vendor_access(&user_with(Role::Admin, None), "v1").is_ok());

        assert!(matches!(
            ensure_vendor_access(&user_with(Role::Vendor, Some("v2")), "v1"),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_vendor_access(&user_with(Role::User, None), "v1"),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn test_order_access() {
        let owner = user_with(Role::User, None);
        let order = Order::new_cart(owner.id.clone());

        assert!(ensure_order_access(&owner, &order).is_ok());
        assert!(ensure_order_access(&user_with(Role::Admin, None), &order).is_ok());
        assert!(ensure_order_access(&user_with(Role::User, None), &order).is_err());
    }

    #[test]
    fn test_resolve_product_vendor() {
        let vendor = user_with(Role::Vendor, Some("v1"));
        assert_eq!(resolve_product_vendor(&vendor, None).unwrap(), "v1");
        assert_eq!(resolve_product_vendor(&vendor, Some("v1")).unwrap(), "v1");
        assert!(resolve_product_vendor(&vendor, Some("v2")).is_err());

        let admin = user_with(Role::Admin, None);
        assert_eq!(resolve_product_vendor(&admin, Some("v9")).unwrap(), "v9");
        assert!(matches!(
            resolve_product_vendor(&admin, None),
            Err(CoreError::Validation(_))
        ));

        assert!(resolve_product_vendor(&user_with(Role::User, None), Some("v1")).is_err());
    }
}
