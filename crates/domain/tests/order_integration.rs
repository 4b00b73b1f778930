//! Integration tests for the Order aggregate.
//!
//! These tests drive orders through the public API: validation, pricing,
//! transitions, and the events produced for terminal states.

use chrono::Utc;
use domain::{
    CartLine, Closing, CustomerInfo, Money, Order, OrderError, OrderEvent, OrderId, OrderItem,
    OrderStatus, PlaceOrder, PricedCart, StatusKind, TransitionCheck,
};

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

/// Prices validated lines with a fixed lookup table, as the checkout flow would.
fn price(cmd: &PlaceOrder) -> PricedCart {
    let validated = cmd.validate().unwrap();
    let items = validated
        .lines
        .iter()
        .map(|line| {
            let (name, price) = match line.product_id.as_str() {
                "SKU-A" => ("Desk Lamp", Money::from_major(100)),
                "SKU-B" => ("Planter", Money::from_major(50)),
                other => panic!("unknown product {other}"),
            };
            OrderItem::new(line.product_id.clone(), name, line.quantity, price)
        })
        .collect();
    PricedCart::new(items).unwrap()
}

fn place(cart: PricedCart) -> Order {
    let now = Utc::now();
    Order::place(OrderId::generate(now), customer(), cart, "INR", "order_0001", now).unwrap()
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn checkout_scenario_totals_and_pays() {
        let cmd = PlaceOrder::new(
            customer(),
            vec![CartLine::new("SKU-A", 2), CartLine::new("SKU-B", 1)],
        );
        let mut order = place(price(&cmd));

        assert_eq!(order.total_amount(), Money::from_major(250));
        assert_eq!(order.status().kind(), StatusKind::Pending);

        assert_eq!(order.check_pay("pay_1").unwrap(), TransitionCheck::Apply);
        order.pay("pay_1", Utc::now()).unwrap();

        assert_eq!(order.status().kind(), StatusKind::Paid);
        assert_eq!(
            order.check_pay("pay_1").unwrap(),
            TransitionCheck::AlreadyApplied
        );

        let event = OrderEvent::for_terminal(&order).unwrap();
        assert_eq!(event.event_type(), "OrderPaid");
    }

    #[test]
    fn merged_lines_price_once() {
        let cmd = PlaceOrder::new(
            customer(),
            vec![CartLine::new("SKU-A", 1), CartLine::new("SKU-A", 1)],
        );
        let order = place(price(&cmd));
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].quantity, 2);
        assert_eq!(order.total_amount(), Money::from_major(200));
    }

    #[test]
    fn failed_order_rejects_late_payment() {
        let cmd = PlaceOrder::new(customer(), vec![CartLine::new("SKU-B", 1)]);
        let mut order = place(price(&cmd));

        order
            .close(
                Closing::Failed {
                    reason: "card declined".to_string(),
                },
                Utc::now(),
            )
            .unwrap();

        let err = order.pay("pay_late", Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: StatusKind::Failed,
                action: "pay"
            }
        ));
        assert_eq!(
            order.status(),
            &OrderStatus::Failed {
                reason: "card declined".to_string()
            }
        );
    }
}

mod terminal_protection {
    use super::*;

    #[test]
    fn paid_order_cannot_be_failed_or_cancelled() {
        let cmd = PlaceOrder::new(customer(), vec![CartLine::new("SKU-A", 1)]);
        let mut order = place(price(&cmd));
        order.pay("pay_1", Utc::now()).unwrap();

        assert!(order.check_close(StatusKind::Failed).is_err());
        assert!(order.check_close(StatusKind::Cancelled).is_err());
        assert!(
            order
                .close(
                    Closing::Cancelled {
                        reason: "too late".to_string()
                    },
                    Utc::now()
                )
                .is_err()
        );
        assert_eq!(order.gateway_payment_ref(), Some("pay_1"));
    }

    #[test]
    fn second_payment_reference_is_a_conflict() {
        let cmd = PlaceOrder::new(customer(), vec![CartLine::new("SKU-A", 1)]);
        let mut order = place(price(&cmd));
        order.pay("pay_1", Utc::now()).unwrap();

        assert!(matches!(
            order.check_pay("pay_2"),
            Err(OrderError::PaymentRefMismatch { .. })
        ));
    }
}

mod price_snapshot {
    use super::*;

    #[test]
    fn order_round_trips_through_json_unchanged() {
        let cmd = PlaceOrder::new(customer(), vec![CartLine::new("SKU-A", 3)]);
        let order = place(price(&cmd));

        let json = serde_json::to_string(&order).unwrap();
        let restored: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, order);
        assert_eq!(restored.items()[0].unit_price, Money::from_major(100));
    }
}
