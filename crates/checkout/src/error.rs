use common::OrderId;
use domain::{FieldError, OrderError, ProductId, StatusKind};
use ledger::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors returned by checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Request fields failed validation.
    #[error("Validation failed: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<FieldError>),

    /// A cart line references a product that does not exist or is not for sale.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Creation-time stock check failed.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Stock ran out between order creation and payment; the order is now FAILED.
    #[error("Order {order_id} failed: {product_id} is out of stock (requested {requested}, available {available})")]
    OutOfStock {
        order_id: OrderId,
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The payment gateway could not open an intent.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A checkout callback signature did not verify.
    #[error("Invalid payment signature for order {0}")]
    InvalidSignature(String),

    /// A gateway webhook body signature did not verify.
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    /// The order is already in a terminal state that the request would overwrite.
    #[error("Order {order_id} is {current}: {reason}")]
    Conflict {
        order_id: OrderId,
        current: StatusKind,
        reason: String,
    },

    /// No order with this identifier.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Storage failed; the order keeps its prior state.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A domain invariant was violated.
    #[error("Order error: {0}")]
    Domain(OrderError),
}

impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(fields) => CheckoutError::Validation(fields),
            OrderError::AmountOverflow => {
                CheckoutError::invalid_field("items", "Order total is too large.")
            }
            other => CheckoutError::Domain(other),
        }
    }
}

impl CheckoutError {
    /// Builds a single-field validation error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CheckoutError::Validation(vec![FieldError::new(field, message)])
    }
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_overflow_is_a_field_error() {
        match CheckoutError::from(OrderError::AmountOverflow) {
            CheckoutError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "items");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn other_domain_errors_stay_internal() {
        assert!(matches!(
            CheckoutError::from(OrderError::NoItems),
            CheckoutError::Domain(OrderError::NoItems)
        ));
    }
}
