//! Persistence for orders and catalog stock.
//!
//! Two traits describe the storage boundary:
//! - [`CatalogStore`] reads prices and performs guarded stock decrements
//! - [`OrderLedger`] records orders and applies status transitions, with the
//!   PENDING → PAID transition and every stock debit committed as one unit
//!
//! [`InMemoryStore`] backs tests and local runs; [`PostgresStore`] is the
//! production implementation.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use catalog::{CatalogStore, Product, StockDecrement};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    Closure, OrderLedger, Settlement, StockDebit, shortfall_closing, stock_debits,
};
