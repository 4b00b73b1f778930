use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Closing, Order, ProductId};

use crate::Result;

/// Outcome of [`OrderLedger::settle_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// PENDING → PAID committed together with every stock debit.
    Applied(Order),

    /// The order was no longer pending; nothing was written.
    NotPending(Order),

    /// A product lacked stock. No debit was kept and the order was moved to
    /// FAILED in the same unit.
    OutOfStock {
        order: Order,
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// No such order.
    NotFound,
}

/// Outcome of [`OrderLedger::close_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closure {
    /// PENDING → FAILED/CANCELLED committed.
    Closed(Order),

    /// The order was no longer pending; nothing was written.
    NotPending(Order),

    /// No such order.
    NotFound,
}

/// Closing recorded when settlement finds a product short of stock.
pub fn shortfall_closing(product_id: &ProductId, requested: u32, available: u32) -> Closing {
    Closing::Failed {
        reason: format!(
            "Insufficient stock for {product_id}: requested {requested}, available {available}"
        ),
    }
}

/// Quantity to take from one product's stock when an order is paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDebit {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Collapses an order's items into one debit per product, sorted by product
/// ID so concurrent settlements lock stock rows in the same order.
pub fn stock_debits(order: &Order) -> Vec<StockDebit> {
    let mut totals: BTreeMap<&ProductId, u32> = BTreeMap::new();
    for item in order.items() {
        let entry = totals.entry(&item.product_id).or_insert(0);
        *entry = entry.saturating_add(item.quantity);
    }
    totals
        .into_iter()
        .map(|(product_id, quantity)| StockDebit {
            product_id: product_id.clone(),
            quantity,
        })
        .collect()
}

/// Authoritative record of orders and their transitions.
///
/// Every method re-reads persisted state; implementations keep no cache of
/// order status or stock between calls.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Persists a new order and its items as one unit.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order with its items.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Loads the order that owns a gateway intent reference.
    async fn find_by_gateway_ref(&self, gateway_order_ref: &str) -> Result<Option<Order>>;

    /// Lists a customer's orders, newest first.
    async fn orders_for_customer(&self, email: &str) -> Result<Vec<Order>>;

    /// Moves a pending order to PAID and debits stock for all of its items,
    /// atomically.
    ///
    /// Only one caller can win the PENDING → PAID update; losers get
    /// [`Settlement::NotPending`] and debit nothing. A stock shortfall undoes
    /// any debits already taken and fails the order instead.
    async fn settle_payment(
        &self,
        order_id: &OrderId,
        payment_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<Settlement>;

    /// Moves a pending order to FAILED or CANCELLED without touching stock.
    async fn close_order(
        &self,
        order_id: &OrderId,
        closing: Closing,
        at: DateTime<Utc>,
    ) -> Result<Closure>;
}
