//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{
    Closing, CustomerInfo, Money, OrderError, OrderItem, OrderStatus, StatusKind,
    TransitionCheck,
};

/// Items priced from a catalog snapshot, with their exact total.
///
/// Built before the gateway intent is opened, since the intent needs the
/// amount; turned into an [`Order`] once the gateway reference is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    items: Vec<OrderItem>,
    total_amount: Money,
}

impl PricedCart {
    /// Validates the priced items and computes their total.
    pub fn new(items: Vec<OrderItem>) -> Result<Self, OrderError> {
        let total_amount = Order::total_of(&items)?;
        Ok(Self {
            items,
            total_amount,
        })
    }

    /// Returns the priced items.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the sum of all item subtotals.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }
}

/// Stored columns of an order, used to rebuild it from the ledger.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub currency: String,
    pub gateway_order_ref: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One checkout attempt with a fixed price snapshot and a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer: CustomerInfo,
    items: Vec<OrderItem>,
    total_amount: Money,
    currency: String,
    gateway_order_ref: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Construction
impl Order {
    /// Creates a pending order from a priced cart and an opened gateway intent.
    pub fn place(
        id: OrderId,
        customer: CustomerInfo,
        cart: PricedCart,
        currency: impl Into<String>,
        gateway_order_ref: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let gateway_order_ref = gateway_order_ref.into();
        if gateway_order_ref.trim().is_empty() {
            return Err(OrderError::MissingGatewayRef);
        }

        Ok(Self {
            id,
            customer,
            items: cart.items,
            total_amount: cart.total_amount,
            currency: currency.into(),
            gateway_order_ref,
            status: OrderStatus::Pending,
            created_at: at,
            updated_at: at,
        })
    }

    /// Rebuilds an order loaded from storage, re-checking the total invariant.
    pub fn restore(parts: OrderParts) -> Result<Self, OrderError> {
        let computed = Self::total_of(&parts.items)?;
        if computed != parts.total_amount {
            return Err(OrderError::TotalMismatch {
                stored: parts.total_amount,
                computed,
            });
        }

        Ok(Self {
            id: parts.id,
            customer: parts.customer,
            items: parts.items,
            total_amount: parts.total_amount,
            currency: parts.currency,
            gateway_order_ref: parts.gateway_order_ref,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    /// Computes `sum(unit_price * quantity)` exactly.
    ///
    /// Rejects empty carts, zero quantities, negative prices and overflow.
    pub fn total_of(items: &[OrderItem]) -> Result<Money, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        items.iter().try_fold(Money::zero(), |total, item| {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.to_string(),
                    price: item.unit_price.minor(),
                });
            }
            item.subtotal()
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or(OrderError::AmountOverflow)
        })
    }
}

// Query methods
impl Order {
    /// Returns the external order ID.
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Returns the customer's contact and shipping details.
    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    /// Returns the items in checkout order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the total fixed at creation.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the ISO currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns the gateway intent reference.
    pub fn gateway_order_ref(&self) -> &str {
        &self.gateway_order_ref
    }

    /// Returns the current status.
    pub fn status(&self) -> &OrderStatus {
        &self.status
    }

    /// Returns the gateway payment reference if the order is paid.
    pub fn gateway_payment_ref(&self) -> Option<&str> {
        self.status.payment_ref()
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the order last changed state.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// See [`OrderStatus::check_pay`].
    pub fn check_pay(&self, payment_ref: &str) -> Result<TransitionCheck, OrderError> {
        self.status.check_pay(payment_ref)
    }

    /// See [`OrderStatus::check_close`].
    pub fn check_close(&self, target: StatusKind) -> Result<TransitionCheck, OrderError> {
        self.status.check_close(target)
    }
}

// Transitions
impl Order {
    /// PENDING → PAID, recording the gateway payment reference.
    pub fn pay(&mut self, payment_ref: impl Into<String>, at: DateTime<Utc>) -> Result<(), OrderError> {
        let next = self.status.clone().pay(payment_ref)?;
        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    /// PENDING → FAILED or CANCELLED.
    pub fn close(&mut self, closing: Closing, at: DateTime<Utc>) -> Result<(), OrderError> {
        let next = self.status.clone().close(closing)?;
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ProductId;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
            shipping_address: "12 MG Road".to_string(),
            shipping_city: "Pune".to_string(),
            shipping_state: "MH".to_string(),
            shipping_pincode: "411001".to_string(),
        }
    }

    fn cart() -> PricedCart {
        PricedCart::new(vec![
            OrderItem::new("SKU-A", "Desk Lamp", 2, Money::from_major(100)),
            OrderItem::new("SKU-B", "Planter", 1, Money::from_major(50)),
        ])
        .unwrap()
    }

    fn pending_order() -> Order {
        let now = Utc::now();
        Order::place(
            OrderId::generate(now),
            customer(),
            cart(),
            "INR",
            "order_0001",
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_place_computes_total_from_snapshots() {
        let order = pending_order();
        assert_eq!(order.total_amount(), Money::from_major(250));
        assert_eq!(order.status(), &OrderStatus::Pending);
        assert_eq!(order.gateway_payment_ref(), None);
        assert_eq!(order.created_at(), order.updated_at());
    }

    #[test]
    fn test_place_requires_gateway_ref() {
        let now = Utc::now();
        let result = Order::place(OrderId::generate(now), customer(), cart(), "INR", " ", now);
        assert!(matches!(result, Err(OrderError::MissingGatewayRef)));
    }

    #[test]
    fn test_total_of_rejects_bad_items() {
        assert!(matches!(Order::total_of(&[]), Err(OrderError::NoItems)));

        let zero_qty = [OrderItem::new("SKU-A", "Lamp", 0, Money::from_major(1))];
        assert!(matches!(
            Order::total_of(&zero_qty),
            Err(OrderError::InvalidQuantity { .. })
        ));

        let negative = [OrderItem::new("SKU-A", "Lamp", 1, Money::from_minor(-1))];
        assert!(matches!(
            Order::total_of(&negative),
            Err(OrderError::InvalidPrice { .. })
        ));

        let huge = [
            OrderItem::new("SKU-A", "Lamp", u32::MAX, Money::from_minor(i64::MAX / 2)),
        ];
        assert!(matches!(
            Order::total_of(&huge),
            Err(OrderError::AmountOverflow)
        ));
    }

    #[test]
    fn test_pay_updates_timestamp_and_reference() {
        let mut order = pending_order();
        let later = order.created_at() + chrono::Duration::seconds(30);
        order.pay("pay_123", later).unwrap();

        assert_eq!(order.gateway_payment_ref(), Some("pay_123"));
        assert_eq!(order.updated_at(), later);
        assert!(order.is_terminal());
    }

    #[test]
    fn test_failed_transition_leaves_order_untouched() {
        let mut order = pending_order();
        order
            .close(
                Closing::Cancelled {
                    reason: "abandoned".to_string(),
                },
                Utc::now(),
            )
            .unwrap();
        let before = order.clone();

        assert!(order.pay("pay_123", Utc::now()).is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn test_restore_rejects_total_mismatch() {
        let order = pending_order();
        let parts = OrderParts {
            id: order.id().clone(),
            customer: order.customer().clone(),
            items: order.items().to_vec(),
            total_amount: Money::from_major(999),
            currency: "INR".to_string(),
            gateway_order_ref: order.gateway_order_ref().to_string(),
            status: OrderStatus::Pending,
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        };
        assert!(matches!(
            Order::restore(parts),
            Err(OrderError::TotalMismatch { .. })
        ));
    }

    #[test]
    fn test_items_keep_checkout_order() {
        let order = pending_order();
        let ids: Vec<&ProductId> = order.items().iter().map(|i| &i.product_id).collect();
        assert_eq!(ids, [&ProductId::new("SKU-A"), &ProductId::new("SKU-B")]);
    }
}
