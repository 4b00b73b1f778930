//! Catalog boundary: product prices and stock counters.

use async_trait::async_trait;
use domain::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A catalog product as seen by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock_quantity,
            is_available: true,
        }
    }
}

/// Result of a compare-and-decrement on a stock counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was reduced; `remaining` is the new count.
    Applied { remaining: u32 },

    /// Not enough stock; nothing changed.
    Insufficient { available: u32 },

    /// The product does not exist.
    UnknownProduct,
}

/// Read access to prices plus the atomic stock decrement.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the current price and stock of a product.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Reduces stock by `quantity` only if at least that much is available.
    ///
    /// Implementations perform this as a single compare-and-decrement, never
    /// as read-then-write.
    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32)
    -> Result<StockDecrement>;

    /// Inserts or replaces a product. Used for seeding and repricing.
    async fn upsert_product(&self, product: &Product) -> Result<()>;
}
