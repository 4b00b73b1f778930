//! Events emitted after an order reaches a terminal state.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{Money, Order, OrderStatus};

/// Notification-worthy outcomes of the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Payment captured, stock debited.
    OrderPaid(OrderPaidData),

    /// Payment failed or stock ran out at confirmation.
    OrderFailed(OrderClosedData),

    /// Order cancelled while pending.
    OrderCancelled(OrderClosedData),
}

/// Fields every notification needs to address the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: Money,
    pub currency: String,
    pub item_count: usize,
}

/// Data for OrderPaid event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub summary: OrderSummary,
    pub payment_ref: String,
    pub paid_at: DateTime<Utc>,
}

/// Data for OrderFailed and OrderCancelled events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClosedData {
    pub summary: OrderSummary,
    pub reason: String,
    pub closed_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Builds the event describing the terminal state `order` is in.
    ///
    /// Returns `None` for pending orders.
    pub fn for_terminal(order: &Order) -> Option<Self> {
        let summary = OrderSummary {
            order_id: order.id().clone(),
            customer_name: order.customer().name.clone(),
            customer_email: order.customer().email.clone(),
            total_amount: order.total_amount(),
            currency: order.currency().to_string(),
            item_count: order.items().len(),
        };
        let at = order.updated_at();

        match order.status() {
            OrderStatus::Pending => None,
            OrderStatus::Paid { payment_ref } => Some(OrderEvent::OrderPaid(OrderPaidData {
                summary,
                payment_ref: payment_ref.clone(),
                paid_at: at,
            })),
            OrderStatus::Failed { reason } => Some(OrderEvent::OrderFailed(OrderClosedData {
                summary,
                reason: reason.clone(),
                closed_at: at,
            })),
            OrderStatus::Cancelled { reason } => {
                Some(OrderEvent::OrderCancelled(OrderClosedData {
                    summary,
                    reason: reason.clone(),
                    closed_at: at,
                }))
            }
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPaid(_) => "OrderPaid",
            OrderEvent::OrderFailed(_) => "OrderFailed",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }

    /// Returns the summary shared by all variants.
    pub fn summary(&self) -> &OrderSummary {
        match self {
            OrderEvent::OrderPaid(data) => &data.summary,
            OrderEvent::OrderFailed(data) | OrderEvent::OrderCancelled(data) => &data.summary,
        }
    }

    /// Returns the order this event is about.
    pub fn order_id(&self) -> &OrderId {
        &self.summary().order_id
    }
}
