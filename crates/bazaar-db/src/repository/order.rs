//! # Order Repository
//!
//! Carts, checkout and the placed-order lifecycle.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. OPEN CART (lazy)                                                   │
//! │     └── get_or_create_cart() → Order { status: Cart }                  │
//! │         INSERT OR IGNORE + partial unique index: one cart per user     │
//! │                                                                         │
//! │  2. EDIT CART (one transaction per call)                               │
//! │     └── add_item()    → merge or insert line, recompute total         │
//! │     └── remove_item() → delete line, recompute total                   │
//! │                                                                         │
//! │  3. CHECKOUT                                                           │
//! │     └── checkout() → Order { status: Pending, placed_at }              │
//! │         the next get_or_create_cart() opens a fresh cart               │
//! │                                                                         │
//! │  4. FULFILMENT (admin)                                                 │
//! │     └── update_status() → Shipped → Delivered                          │
//! │                         ↘ Canceled (with reason)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//! Multi-statement operations run every query on the transaction handle.
//! The helpers at the bottom of this file take `&mut SqliteConnection` so
//! the wishlist repository can reuse them inside its own transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use bazaar_core::cart::LineChange;
use bazaar_core::validation::validate_required_text;
use bazaar_core::{CoreError, Order, OrderDetail, OrderItem, OrderStatus};

/// Longest accepted shipping address or cancellation reason.
const MAX_TEXT_LENGTH: usize = 500;

const SELECT_ORDER: &str = r#"
    SELECT
        id, user_id, status, total_cents, shipping_address, cancellation_reason,
        created_at, updated_at, placed_at
    FROM orders
"#;

/// Repository for carts and orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Returns the user's open cart, creating it if needed. Idempotent.
    pub async fn get_or_create_cart(&self, user_id: &str) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        ensure_cart(&mut conn, user_id).await
    }

    /// Returns the user's open cart with its lines, creating it if needed.
    pub async fn get_cart(&self, user_id: &str) -> DbResult<OrderDetail> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, user_id).await
    }

    /// Adds `quantity` of a product to the user's cart, merging with an
    /// existing line for the same product.
    ///
    /// ## Errors
    /// - `NotFound` if the product does not exist
    /// - `Domain(..)` for quantity, stock and cart-size rule violations
    pub async fn add_item(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<OrderDetail> {
        debug!(user_id = %user_id, product_id = %product_id, quantity, "Adding cart item");

        let mut tx = self.pool.begin().await?;
        let detail = add_to_cart(&mut tx, user_id, product_id, quantity).await?;
        tx.commit().await?;

        Ok(detail)
    }

    /// Removes a product's line from the user's cart.
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> DbResult<OrderDetail> {
        debug!(user_id = %user_id, product_id = %product_id, "Removing cart item");

        let mut tx = self.pool.begin().await?;

        let mut detail = load_cart(&mut tx, user_id).await?;
        let removed = detail.remove_item(product_id)?;

        sqlx::query("DELETE FROM order_items WHERE id = ?1")
            .bind(&removed.id)
            .execute(&mut *tx)
            .await?;
        save_total(&mut tx, &detail.order).await?;

        tx.commit().await?;
        Ok(detail)
    }

    /// Turns the user's cart into a pending order.
    ///
    /// ## What This Does
    /// 1. Loads the open cart (no cart at all is an invalid state)
    /// 2. Requires at least one line and a non-blank shipping address
    /// 3. Sets status `pending`, the address and `placed_at`
    pub async fn checkout(&self, user_id: &str, shipping_address: &str) -> DbResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        let order = fetch_cart_order(&mut tx, user_id)
            .await?
            .ok_or_else(|| CoreError::invalid_state("No open cart to check out"))?;
        let items = fetch_items(&mut tx, &order.id).await?;
        let mut detail = OrderDetail { order, items };

        detail.ensure_checkout_ready()?;
        let address = validate_required_text("shipping_address", shipping_address, MAX_TEXT_LENGTH)
            .map_err(CoreError::from)?;

        detail.recompute_total()?;
        let now = Utc::now();
        detail.order.status = OrderStatus::Pending;
        detail.order.shipping_address = Some(address);
        detail.order.placed_at = Some(now);
        detail.order.updated_at = now;

        sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                total_cents = ?3,
                shipping_address = ?4,
                placed_at = ?5,
                updated_at = ?5
            WHERE id = ?1 AND status = 'cart'
            "#,
        )
        .bind(&detail.order.id)
        .bind(detail.order.status)
        .bind(detail.order.total_cents)
        .bind(&detail.order.shipping_address)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id = %detail.order.id,
            user_id = %user_id,
            total = %detail.order.total(),
            "Order placed"
        );
        Ok(detail)
    }

    // =========================================================================
    // Placed orders
    // =========================================================================

    /// Gets an order (or cart) with its lines.
    pub async fn get_detail(&self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        let mut conn = self.pool.acquire().await?;

        let Some(order) = fetch_order(&mut conn, order_id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, &order.id).await?;

        Ok(Some(OrderDetail { order, items }))
    }

    /// Lists placed orders, newest first, optionally with one status only.
    ///
    /// Open carts are excluded unless `status` is explicitly `Cart`.
    pub async fn list(&self, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                sqlx::query_as::<_, Order>(&format!(
                    "{} WHERE status = ?1 ORDER BY created_at DESC",
                    SELECT_ORDER
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    "{} WHERE status != 'cart' ORDER BY created_at DESC",
                    SELECT_ORDER
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    /// Lists a user's placed orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{} WHERE user_id = ?1 AND status != 'cart' ORDER BY placed_at DESC",
            SELECT_ORDER
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Moves a placed order to `next`.
    ///
    /// ## Rules
    /// - Only `OrderStatus::can_transition_to` moves are allowed, anything
    ///   else is an invalid state
    /// - Canceling requires a non-blank reason, stored on the order
    pub async fn update_status(
        &self,
        order_id: &str,
        next: OrderStatus,
        reason: Option<&str>,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        if !order.status.can_transition_to(next) {
            return Err(CoreError::invalid_state(format!(
                "Cannot move order from {} to {}",
                order.status, next
            ))
            .into());
        }

        let reason = match next {
            OrderStatus::Canceled => Some(
                validate_required_text("reason", reason.unwrap_or_default(), MAX_TEXT_LENGTH)
                    .map_err(CoreError::from)?,
            ),
            _ => None,
        };

        let previous = order.status;
        order.status = next;
        order.cancellation_reason = reason;
        order.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                cancellation_reason = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(order.status)
        .bind(&order.cancellation_reason)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(order_id = %order.id, from = %previous, to = %next, "Order status changed");
        Ok(order)
    }

    /// Deletes an order and its lines.
    pub async fn delete(&self, order_id: &str) -> DbResult<()> {
        debug!(order_id = %order_id, "Deleting order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }
}

// =============================================================================
// Connection-level helpers (usable inside any transaction)
// =============================================================================

async fn fetch_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("{} WHERE id = ?1", SELECT_ORDER))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(order)
}

async fn fetch_cart_order(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "{} WHERE user_id = ?1 AND status = 'cart'",
        SELECT_ORDER
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, product_name, quantity, unit_price_cents, created_at
        FROM order_items
        WHERE order_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Returns the user's cart row, inserting an empty one if there is none.
pub(crate) async fn ensure_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Order> {
    let fresh = Order::new_cart(user_id);

    // A concurrent creator makes this a no-op through the partial unique index.
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO orders (
            id, user_id, status, total_cents, shipping_address, cancellation_reason,
            created_at, updated_at, placed_at
        ) VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?6, NULL)
        "#,
    )
    .bind(&fresh.id)
    .bind(&fresh.user_id)
    .bind(fresh.status)
    .bind(fresh.total_cents)
    .bind(fresh.created_at)
    .bind(fresh.updated_at)
    .execute(&mut *conn)
    .await?;

    fetch_cart_order(conn, user_id)
        .await?
        .ok_or_else(|| DbError::Internal(format!("cart for user {} vanished", user_id)))
}

/// Loads (or lazily creates) the user's cart aggregate.
pub(crate) async fn load_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<OrderDetail> {
    let order = ensure_cart(conn, user_id).await?;
    let items = fetch_items(conn, &order.id).await?;
    Ok(OrderDetail { order, items })
}

/// Add-or-merge on the user's cart, persisting exactly the line that changed.
pub(crate) async fn add_to_cart(
    conn: &mut SqliteConnection,
    user_id: &str,
    product_id: &str,
    quantity: i64,
) -> DbResult<OrderDetail> {
    let product = fetch_product(conn, product_id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))?;

    let mut detail = load_cart(conn, user_id).await?;

    match detail.add_item(&product, quantity)? {
        LineChange::Added(item) => {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name, quantity, unit_price_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.created_at)
            .execute(&mut *conn)
            .await?;
        }
        LineChange::Merged(item) => {
            sqlx::query("UPDATE order_items SET quantity = ?2 WHERE id = ?1")
                .bind(&item.id)
                .bind(item.quantity)
                .execute(&mut *conn)
                .await?;
        }
    }

    save_total(conn, &detail.order).await?;
    Ok(detail)
}

async fn save_total(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query("UPDATE orders SET total_cents = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&order.id)
        .bind(order.total_cents)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{create_product, create_user, create_vendor, test_db};

    #[tokio::test]
    async fn test_get_or_create_cart_is_idempotent() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;

        let first = db.orders().get_or_create_cart(&user.id).await.unwrap();
        let second = db.orders().get_or_create_cart(&user.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.status, OrderStatus::Cart);
    }

    #[tokio::test]
    async fn test_add_same_product_twice_merges() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1250, 100).await;

        db.orders().add_item(&user.id, &product.id, 2).await.unwrap();
        db.orders().add_item(&user.id, &product.id, 3).await.unwrap();

        let cart = db.orders().get_cart(&user.id).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.order.total_cents, 5 * 1250);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;

        assert!(matches!(
            db.orders().add_item(&user.id, "nope", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejected_add_leaves_cart_unchanged() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1000, 3).await;

        db.orders().add_item(&user.id, &product.id, 2).await.unwrap();
        let err = db.orders().add_item(&user.id, &product.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        let cart = db.orders().get_cart(&user.id).await.unwrap();
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.order.total_cents, 2000);
    }

    #[tokio::test]
    async fn test_remove_item() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let anvil = create_product(&db, &vendor, "Anvil", 1000, 10).await;
        let rope = create_product(&db, &vendor, "Rope", 300, 10).await;

        db.orders().add_item(&user.id, &anvil.id, 1).await.unwrap();
        db.orders().add_item(&user.id, &rope.id, 2).await.unwrap();

        let cart = db.orders().remove_item(&user.id, &anvil.id).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.order.total_cents, 600);

        let stored = db.orders().get_cart(&user.id).await.unwrap();
        assert_eq!(stored.order.total_cents, 600);

        assert!(matches!(
            db.orders().remove_item(&user.id, &anvil.id).await,
            Err(DbError::Domain(CoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_invalid_state() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;

        // No cart yet
        assert!(matches!(
            db.orders().checkout(&user.id, "1 Main St").await,
            Err(DbError::Domain(CoreError::InvalidState(_)))
        ));

        // Empty cart
        db.orders().get_or_create_cart(&user.id).await.unwrap();
        assert!(matches!(
            db.orders().checkout(&user.id, "1 Main St").await,
            Err(DbError::Domain(CoreError::InvalidState(_)))
        ));
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_opens_new_cart() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1000, 10).await;

        let cart = db.orders().add_item(&user.id, &product.id, 2).await.unwrap();

        assert!(matches!(
            db.orders().checkout(&user.id, "   ").await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        let placed = db.orders().checkout(&user.id, " 1 Main St ").await.unwrap();
        assert_eq!(placed.order.id, cart.order.id);
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.order.shipping_address.as_deref(), Some("1 Main St"));
        assert!(placed.order.placed_at.is_some());

        let next = db.orders().get_cart(&user.id).await.unwrap();
        assert_ne!(next.order.id, cart.order.id);
        assert!(next.items.is_empty());
        assert_eq!(next.order.total_cents, 0);

        let history = db.orders().list_for_user(&user.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_cents, 2000);
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let vendor = create_vendor(&db, "Acme").await;
        let product = create_product(&db, &vendor, "Anvil", 1000, 10).await;

        db.orders().add_item(&user.id, &product.id, 1).await.unwrap();
        let order_id = db.orders().checkout(&user.id, "1 Main St").await.unwrap().order.id;

        // Skipping a step is not allowed
        assert!(matches!(
            db.orders().update_status(&order_id, OrderStatus::Delivered, None).await,
            Err(DbError::Domain(CoreError::InvalidState(_)))
        ));

        let shipped = db
            .orders()
            .update_status(&order_id, OrderStatus::Shipped, None)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        // Cancel needs a reason
        assert!(matches!(
            db.orders().update_status(&order_id, OrderStatus::Canceled, None).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        let canceled = db
            .orders()
            .update_status(&order_id, OrderStatus::Canceled, Some("Lost in transit"))
            .await
            .unwrap();
        assert_eq!(canceled.cancellation_reason.as_deref(), Some("Lost in transit"));

        // Terminal
        assert!(db
            .orders()
            .update_status(&order_id, OrderStatus::Shipped, None)
            .await
            .is_err());

        let listed = db.orders().list(Some(OrderStatus::Canceled)).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_cart_cannot_be_moved_by_status_update() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let cart = db.orders().get_or_create_cart(&user.id).await.unwrap();

        assert!(matches!(
            db.orders().update_status(&cart.id, OrderStatus::Pending, None).await,
            Err(DbError::Domain(CoreError::InvalidState(_)))
        ));
        assert!(db.orders().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_order() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let cart = db.orders().get_or_create_cart(&user.id).await.unwrap();

        db.orders().delete(&cart.id).await.unwrap();
        assert!(db.orders().get_detail(&cart.id).await.unwrap().is_none());
        assert!(matches!(
            db.orders().delete(&cart.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
