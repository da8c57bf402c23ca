//! # Wishlist Repository
//!
//! A per-user set of saved products, plus the move of a saved product into
//! the cart.
//!
//! ## Move To Cart
//! ```text
//! BEGIN
//!   wishlist row exists?  ── no ──► NotFound, ROLLBACK (nothing changed)
//!        │ yes
//!        ▼
//!   add-or-merge into cart ── rule violated ──► ROLLBACK
//!        │
//!        ▼
//!   DELETE wishlist row
//! COMMIT
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::order::add_to_cart;
use crate::repository::product::fetch_product;
use bazaar_core::{CoreError, OrderDetail, Product, WishlistItem};

/// Repository for wishlists.
#[derive(Debug, Clone)]
pub struct WishlistRepository {
    pool: SqlitePool,
}

impl WishlistRepository {
    /// Creates a new WishlistRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WishlistRepository { pool }
    }

    /// Lists the products on a user's wishlist, most recently saved first.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                p.id, p.vendor_id, p.name, p.description, p.price_cents,
                p.stock_quantity, p.created_at, p.updated_at
            FROM wishlist_items w
            JOIN products p ON p.id = w.product_id
            WHERE w.user_id = ?1
            ORDER BY w.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Saves a product to the wishlist.
    ///
    /// ## Errors
    /// - `NotFound` if the product does not exist
    /// - `Domain(Conflict)` if it is already on the wishlist
    pub async fn add(&self, user_id: &str, product_id: &str) -> DbResult<WishlistItem> {
        debug!(user_id = %user_id, product_id = %product_id, "Adding wishlist item");

        let mut tx = self.pool.begin().await?;

        fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let item = WishlistItem {
            user_id: user_id.to_string(),
            product_id: product_id.to_string(),
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO wishlist_items (user_id, product_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&item.user_id)
        .bind(&item.product_id)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(CoreError::Conflict("Product is already in the wishlist".to_string()).into());
        }

        tx.commit().await?;
        Ok(item)
    }

    /// Removes a product from the wishlist.
    pub async fn remove(&self, user_id: &str, product_id: &str) -> DbResult<()> {
        debug!(user_id = %user_id, product_id = %product_id, "Removing wishlist item");

        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Wishlist item", product_id));
        }

        Ok(())
    }

    /// Whether a product is on the user's wishlist.
    pub async fn contains(&self, user_id: &str, product_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wishlist_items WHERE user_id = ?1 AND product_id = ?2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Moves a saved product into the cart (add-or-merge) and removes it
    /// from the wishlist, atomically.
    pub async fn move_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<OrderDetail> {
        debug!(user_id = %user_id, product_id = %product_id, quantity, "Moving wishlist item to cart");

        let mut tx = self.pool.begin().await?;

        let present: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wishlist_items WHERE user_id = ?1 AND product_id = ?2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        if present == 0 {
            return Err(DbError::not_found("Wishlist item", product_id));
        }

        let cart = add_to_cart(&mut tx, user_id, product_id, quantity).await?;

        sqlx::query("DELETE FROM wishlist_items WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(cart)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{create_product, create_user, create_vendor, test_db};

    #[tokio::test]
    async fn test_add_list_remove() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1000, 10).await;

        db.wishlist().add(&user.id, &product.id).await.unwrap();

        let listed = db.wishlist().list(&user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, product.id);

        assert!(matches!(
            db.wishlist().add(&user.id, &product.id).await,
            Err(DbError::Domain(CoreError::Conflict(_)))
        ));
        assert!(matches!(
            db.wishlist().add(&user.id, "missing").await,
            Err(DbError::NotFound { .. })
        ));

        db.wishlist().remove(&user.id, &product.id).await.unwrap();
        assert!(matches!(
            db.wishlist().remove(&user.id, &product.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_move_to_cart() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1000, 10).await;

        db.orders().add_item(&user.id, &product.id, 1).await.unwrap();
        db.wishlist().add(&user.id, &product.id).await.unwrap();

        let cart = db.wishlist().move_to_cart(&user.id, &product.id, 2).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.order.total_cents, 3000);
        assert!(!db.wishlist().contains(&user.id, &product.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_move_to_cart_not_in_wishlist_changes_nothing() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let saved = create_product(&db, &vendor, "Anvil", 1000, 10).await;
        let other = create_product(&db, &vendor, "Rope", 300, 10).await;

        db.wishlist().add(&user.id, &saved.id).await.unwrap();
        let before = db.orders().get_cart(&user.id).await.unwrap();

        assert!(matches!(
            db.wishlist().move_to_cart(&user.id, &other.id, 1).await,
            Err(DbError::NotFound { .. })
        ));

        let after = db.orders().get_cart(&user.id).await.unwrap();
        assert_eq!(after.order.id, before.order.id);
        assert!(after.items.is_empty());
        assert_eq!(db.wishlist().list(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_move_keeps_wishlist_entry() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1000, 1).await;

        db.wishlist().add(&user.id, &product.id).await.unwrap();

        assert!(db.wishlist().move_to_cart(&user.id, &product.id, 5).await.is_err());
        assert!(db.wishlist().contains(&user.id, &product.id).await.unwrap());
        assert!(db.orders().get_cart(&user.id).await.unwrap().items.is_empty());
    }
}
