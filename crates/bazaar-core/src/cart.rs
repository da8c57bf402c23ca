//! # Cart Aggregate
//!
//! Pure cart rules operating on an [`OrderDetail`] whose order is in
//! [`OrderStatus::Cart`]. The database layer loads the cart inside a
//! transaction, applies one of these operations, and persists the result.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  HTTP                        Aggregate               Persisted change   │
//! │  ────                        ─────────               ────────────────   │
//! │                                                                         │
//! │  POST /cart/items ─────────► add_item() ───────────► insert or update   │
//! │                               (merge by product)      one line          │
//! │                                                                         │
//! │  DELETE /cart/items/{id} ──► remove_item() ────────► delete one line    │
//! │                                                                         │
//! │  POST /cart/checkout ──────► ensure_checkout_ready() ► status=pending   │
//! │                                                                         │
//! │  Every mutation stores a checked Σ quantity × unit price. A total     │
//! │  that would overflow is rejected before the cart changes.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Order, OrderDetail, OrderItem, OrderStatus, Product};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// What `add_item` did to the cart.
#[derive(Debug, Clone)]
pub enum LineChange {
    /// A new line was inserted.
    Added(OrderItem),
    /// An existing line's quantity was increased.
    Merged(OrderItem),
}

impl LineChange {
    /// The line after the change.
    pub fn item(&self) -> &OrderItem {
        match self {
            LineChange::Added(item) | LineChange::Merged(item) => item,
        }
    }
}

impl OrderDetail {
    /// Wraps an order with no items.
    pub fn empty(order: Order) -> Self {
        OrderDetail {
            order,
            items: Vec::new(),
        }
    }

    /// Fails unless this is still an open cart.
    pub fn ensure_cart(&self) -> CoreResult<()> {
        if self.order.status != OrderStatus::Cart {
            return Err(CoreError::invalid_state(format!(
                "Order {} is {}, not an open cart",
                self.order.id, self.order.status
            )));
        }
        Ok(())
    }

    /// Finds the line for a product.
    pub fn find_item(&self, product_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Adds a product to the cart or increases quantity if already present.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity is increased, the original price
    ///   snapshot is kept
    /// - Product not in cart: a new line snapshots the current price
    /// - Merged quantity must stay within MAX_ITEM_QUANTITY and the
    ///   product's stock
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<LineChange> {
        self.ensure_cart()?;
        validate_quantity(quantity)?;

        let order_id = self.order.id.clone();

        let existing = self.items.iter().position(|i| i.product_id == product.id);

        let change = if let Some(index) = existing {
            let new_qty = self.items[index].quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            if !product.has_stock(new_qty) {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    available: product.stock_quantity,
                    requested: new_qty,
                });
            }
            let total = self.projected_total(Some(index), self.items[index].unit_price(), new_qty)?;

            let item = &mut self.items[index];
            item.quantity = new_qty;
            let change = LineChange::Merged(item.clone());
            self.store_total(total);
            change
        } else {
            if self.items.len() >= MAX_CART_ITEMS {
                return Err(CoreError::CartTooLarge {
                    max: MAX_CART_ITEMS,
                });
            }
            if !product.has_stock(quantity) {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    available: product.stock_quantity,
                    requested: quantity,
                });
            }
            let total = self.projected_total(None, product.price(), quantity)?;

            let item = OrderItem::from_product(order_id, product, quantity);
            self.items.push(item.clone());
            self.store_total(total);
            LineChange::Added(item)
        };

        Ok(change)
    }

    /// Removes the line for `product_id`.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<OrderItem> {
        self.ensure_cart()?;

        let index = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::not_found("Cart item", product_id))?;

        let removed = self.items.remove(index);
        self.recompute_total()?;
        Ok(removed)
    }

    /// Σ quantity × unit price over all lines.
    ///
    /// Fails with `AmountOverflow` if a line or the sum leaves i64 cents.
    pub fn subtotal(&self) -> CoreResult<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            item.line_total()
                .and_then(|line| acc.checked_add(line))
                .ok_or(CoreError::AmountOverflow)
        })
    }

    /// Recomputes and stores the order total from the lines.
    pub fn recompute_total(&mut self) -> CoreResult<Money> {
        let total = self.subtotal()?;
        self.store_total(total);
        Ok(total)
    }

    /// The total after replacing line `index` (or appending a line) with
    /// `quantity` × `unit_price`, checked before anything is mutated.
    fn projected_total(
        &self,
        index: Option<usize>,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<Money> {
        let current = self.subtotal()?;
        let replaced = match index {
            Some(i) => self.items[i].line_total().ok_or(CoreError::AmountOverflow)?,
            None => Money::zero(),
        };

        unit_price
            .checked_multiply_quantity(quantity)
            .and_then(|line| current.checked_sub(replaced)?.checked_add(line))
            .ok_or(CoreError::AmountOverflow)
    }

    fn store_total(&mut self, total: Money) {
        self.order.total_cents = total.cents();
        self.order.updated_at = chrono::Utc::now();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks the cart can be turned into a pending order.
    pub fn ensure_checkout_ready(&self) -> CoreResult<()> {
        self.ensure_cart()?;
        if self.is_empty() {
            return Err(CoreError::invalid_state("Cart is empty"));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        let mut product = Product::new("vendor-1", format!("Product {}", id), None, price_cents, stock);
        product.id = id.to_string();
        product
    }

    fn empty_cart() -> OrderDetail {
        OrderDetail::empty(Order::new_cart("user-1"))
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = empty_cart();
        let product = test_product("p1", 999, 50);

        let change = cart.add_item(&product, 2).unwrap();

        assert!(matches!(change, LineChange::Added(_)));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.order.total_cents, 1998);
    }

    #[test]
    fn test_cart_add_same_product_merges_quantity() {
        let mut cart = empty_cart();
        let product = test_product("p1", 999, 50);

        cart.add_item(&product, 2).unwrap();
        let change = cart.add_item(&product, 3).unwrap();

        assert!(matches!(change, LineChange::Merged(_)));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.find_item("p1").unwrap().quantity, 5);
        assert_eq!(cart.order.total_cents, 5 * 999);
    }

    #[test]
    fn test_merge_keeps_original_price_snapshot() {
        let mut cart = empty_cart();
        let mut product = test_product("p1", 1000, 50);

        cart.add_item(&product, 1).unwrap();
        product.price_cents = 1500;
        cart.add_item(&product, 1).unwrap();

        assert_eq!(cart.find_item("p1").unwrap().unit_price_cents, 1000);
        assert_eq!(cart.order.total_cents, 2000);
    }

    #[test]
    fn test_total_is_sum_over_lines() {
        let mut cart = empty_cart();
        cart.add_item(&test_product("a", 250, 10), 4).unwrap();
        cart.add_item(&test_product("b", 1099, 10), 1).unwrap();

        assert_eq!(cart.order.total_cents, 1000 + 1099);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = empty_cart();
        let product = test_product("p1", 100, 10_000);

        assert!(matches!(
            cart.add_item(&product, 0),
            Err(CoreError::Validation(_))
        ));

        cart.add_item(&product, 999).unwrap();
        assert!(matches!(
            cart.add_item(&product, 1),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
        assert_eq!(cart.find_item("p1").unwrap().quantity, 999);
    }

    #[test]
    fn test_stock_is_checked_on_merged_quantity() {
        let mut cart = empty_cart();
        let product = test_product("p1", 100, 4);

        cart.add_item(&product, 3).unwrap();
        let err = cart.add_item(&product, 2).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 4, requested: 5, .. }
        ));
        assert_eq!(cart.order.total_cents, 300);
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = empty_cart();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&test_product(&format!("p{}", i), 1, 10), 1).unwrap();
        }
        assert!(matches!(
            cart.add_item(&test_product("extra", 1, 10), 1),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_huge_price_is_rejected_without_panicking() {
        let mut cart = empty_cart();
        let big = test_product("big", i64::MAX / 2, 10);

        assert!(matches!(
            cart.add_item(&big, 3),
            Err(CoreError::AmountOverflow)
        ));
        assert!(cart.is_empty());
        assert_eq!(cart.order.total_cents, 0);

        // Each line fits, but the merged line does not
        cart.add_item(&big, 1).unwrap();
        assert!(matches!(
            cart.add_item(&big, 2),
            Err(CoreError::AmountOverflow)
        ));
        assert_eq!(cart.find_item("big").unwrap().quantity, 1);
        assert_eq!(cart.order.total_cents, i64::MAX / 2);

        // Two lines that fit alone but not together
        assert!(matches!(
            cart.add_item(&test_product("other", i64::MAX / 2 + 2, 10), 1),
            Err(CoreError::AmountOverflow)
        ));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_totals_at_the_price_cap_fit() {
        let mut cart = empty_cart();
        for i in 0..MAX_CART_ITEMS {
            let product = test_product(&format!("p{}", i), crate::MAX_PRICE_CENTS, 1_000);
            cart.add_item(&product, MAX_ITEM_QUANTITY).unwrap();
        }
        assert_eq!(
            cart.order.total_cents,
            crate::MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64
        );
    }

    #[test]
    fn test_remove_item() {
        let mut cart = empty_cart();
        cart.add_item(&test_product("a", 500, 10), 2).unwrap();
        cart.add_item(&test_product("b", 100, 10), 1).unwrap();

        let removed = cart.remove_item("a").unwrap();
        assert_eq!(removed.quantity, 2);
        assert_eq!(cart.order.total_cents, 100);

        assert!(matches!(
            cart.remove_item("a"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_checkout_requires_items() {
        let mut cart = empty_cart();
        assert!(matches!(
            cart.ensure_checkout_ready(),
            Err(CoreError::InvalidState(_))
        ));

        cart.add_item(&test_product("a", 500, 10), 1).unwrap();
        assert!(cart.ensure_checkout_ready().is_ok());
    }

    #[test]
    fn test_placed_order_is_not_a_cart() {
        let mut cart = empty_cart();
        cart.order.status = OrderStatus::Pending;

        assert!(matches!(
            cart.add_item(&test_product("a", 500, 10), 1),
            Err(CoreError::InvalidState(_))
        ));
    }
}
