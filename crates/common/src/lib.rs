//! Shared types used across the order and payment crates.

pub mod types;

pub use types::{OrderId, ParseOrderIdError};
