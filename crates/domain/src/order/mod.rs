//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderParts, PricedCart};
pub use commands::*;
pub use events::{OrderClosedData, OrderEvent, OrderPaidData, OrderSummary};
pub use state::{Closing, OrderStatus, StatusKind, TransitionCheck};
pub use value_objects::{CustomerInfo, Money, OrderItem, ProductId};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// One or more request fields are invalid.
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    /// The order is not in a state that allows this action.
    #[error("Invalid state transition: cannot {action} an order in {from} state")]
    InvalidTransition { from: StatusKind, action: &'static str },

    /// The order was already paid with a different payment reference.
    #[error("Order already paid with payment {stored}, refusing payment {received}")]
    PaymentRefMismatch { stored: String, received: String },

    /// A paid status needs a payment reference.
    #[error("Payment reference is required")]
    MissingPaymentRef,

    /// A pending order needs the gateway intent reference.
    #[error("Gateway order reference is required")]
    MissingGatewayRef,

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// Invalid price.
    #[error("Invalid price for {product_id}: {price} (must not be negative)")]
    InvalidPrice { product_id: String, price: i64 },

    /// Order total does not fit in the money type.
    #[error("Order total is too large")]
    AmountOverflow,

    /// Stored total disagrees with the stored items.
    #[error("Stored total {stored} does not match item total {computed}")]
    TotalMismatch { stored: Money, computed: Money },

    /// Stored status columns violate the payment reference invariant.
    #[error("Corrupt status {kind} (payment reference present: {has_payment_ref})")]
    CorruptStatus { kind: StatusKind, has_payment_ref: bool },
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
