use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Closing, Order, ProductId, StatusKind};
use tokio::sync::RwLock;

use crate::{
    CatalogStore, Closure, OrderLedger, Product, Result, Settlement, StockDecrement, StoreError,
    shortfall_closing, stock_debits,
};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    gateway_refs: HashMap<String, OrderId>,
}

/// In-memory ledger and catalog for tests and local runs.
///
/// Products and orders share one lock, so a settlement checks and applies
/// all of its debits and the status change under a single write guard.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            for product in products {
                state.products.insert(product.id.clone(), product);
            }
        }
        store
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .products
            .get(product_id)
            .map(|p| p.stock_quantity)
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        self.ensure_available()?;
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn decrement_stock(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<StockDecrement> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let Some(product) = state.products.get_mut(product_id) else {
            return Ok(StockDecrement::UnknownProduct);
        };

        if product.stock_quantity < quantity {
            return Ok(StockDecrement::Insufficient {
                available: product.stock_quantity,
            });
        }

        product.stock_quantity -= quantity;
        Ok(StockDecrement::Applied {
            remaining: product.stock_quantity,
        })
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        self.ensure_available()?;
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        if state.orders.contains_key(order.id()) {
            return Err(StoreError::Duplicate {
                entity: "order",
                key: order.id().to_string(),
            });
        }
        if state.gateway_refs.contains_key(order.gateway_order_ref()) {
            return Err(StoreError::Duplicate {
                entity: "gateway order reference",
                key: order.gateway_order_ref().to_string(),
            });
        }

        state
            .gateway_refs
            .insert(order.gateway_order_ref().to_string(), order.id().clone());
        state.orders.insert(order.id().clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.ensure_available()?;
        Ok(self.state.read().await.orders.get(order_id).cloned())
    }

    async fn find_by_gateway_ref(&self, gateway_order_ref: &str) -> Result<Option<Order>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state
            .gateway_refs
            .get(gateway_order_ref)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn orders_for_customer(&self, email: &str) -> Result<Vec<Order>> {
        self.ensure_available()?;
        let email = email.trim().to_lowercase();
        let state = self.state.read().await;

        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.customer().email.to_lowercase() == email)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(orders)
    }

    async fn settle_payment(
        &self,
        order_id: &OrderId,
        payment_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<Settlement> {
        self.ensure_available()?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(order) = state.orders.get(order_id) else {
            return Ok(Settlement::NotFound);
        };
        if order.status().kind() != StatusKind::Pending {
            return Ok(Settlement::NotPending(order.clone()));
        }

        let debits = stock_debits(order);

        // Check every debit before applying any
        for debit in &debits {
            let available = state
                .products
                .get(&debit.product_id)
                .map(|p| p.stock_quantity)
                .unwrap_or(0);
            if available < debit.quantity {
                let mut failed = order.clone();
                failed.close(
                    shortfall_closing(&debit.product_id, debit.quantity, available),
                    at,
                )?;
                state.orders.insert(order_id.clone(), failed.clone());
                return Ok(Settlement::OutOfStock {
                    order: failed,
                    product_id: debit.product_id.clone(),
                    requested: debit.quantity,
                    available,
                });
            }
        }

        let mut paid = order.clone();
        paid.pay(payment_ref, at)?;

        for debit in &debits {
            if let Some(product) = state.products.get_mut(&debit.product_id) {
                product.stock_quantity -= debit.quantity;
            }
        }
        state.orders.insert(order_id.clone(), paid.clone());

        Ok(Settlement::Applied(paid))
    }

    async fn close_order(
        &self,
        order_id: &OrderId,
        closing: Closing,
        at: DateTime<Utc>,
    ) -> Result<Closure> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let Some(order) = state.orders.get_mut(order_id) else {
            return Ok(Closure::NotFound);
        };
        if order.status().kind() != StatusKind::Pending {
            return Ok(Closure::NotPending(order.clone()));
        }

        order.close(closing, at)?;
        Ok(Closure::Closed(order.clone()))
    }
}
