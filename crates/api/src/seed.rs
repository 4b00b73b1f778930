//! Catalog seeding from a JSON file.
//!
//! The file holds an array of products; `price` is in minor currency units:
//!
//! ```json
//! [{"id": "tee-black-m", "name": "Black Tee (M)", "price": 49900, "stock_quantity": 25}]
//! ```

use std::path::Path;

use ledger::{CatalogStore, Product, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read catalog seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog seed file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to store seeded product: {0}")]
    Store(#[from] StoreError),
}

/// Parses a seed document.
pub fn parse_products(raw: &str) -> Result<Vec<Product>, SeedError> {
    Ok(serde_json::from_str(raw)?)
}

/// Upserts every product in `products`, returning how many were written.
pub async fn seed_products<C>(catalog: &C, products: &[Product]) -> Result<usize, SeedError>
where
    C: CatalogStore + ?Sized,
{
    for product in products {
        catalog.upsert_product(product).await?;
    }
    Ok(products.len())
}

/// Loads a seed file into the catalog.
pub async fn seed_catalog<C>(catalog: &C, path: &Path) -> Result<usize, SeedError>
where
    C: CatalogStore + ?Sized,
{
    let raw = tokio::fs::read_to_string(path).await?;
    let products = parse_products(&raw)?;
    let count = seed_products(catalog, &products).await?;
    tracing::info!(count, path = %path.display(), "Catalog seeded");
    Ok(count)
}
