//! Domain layer for the order and payment backend.
//!
//! This crate holds the pure model, free of I/O:
//! - Order aggregate with an immutable price snapshot
//! - Closed payment status state machine
//! - Commands with field-level validation
//! - Events emitted once an order reaches a terminal state

pub mod order;

pub use common::OrderId;
pub use order::{
    CancelOrder, CartLine, Closing, ConfirmPayment, CustomerInfo, FailPayment, FieldError, Money,
    Order, OrderClosedData, OrderError, OrderEvent, OrderItem, OrderPaidData, OrderParts,
    OrderStatus, OrderSummary, PlaceOrder, PricedCart, ProductId, StatusKind, TransitionCheck,
    ValidLine, ValidatedOrder,
};
