use checkout::gateway::signature;
use checkout::{
    CheckoutCoordinator, GatewayConfig, InMemoryGateway, LogNotifier, NotificationDispatcher,
    Secret,
};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartLine, ConfirmPayment, CustomerInfo, Money, PlaceOrder};
use ledger::{InMemoryStore, Product};

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Bench Customer".to_string(),
        email: "bench@example.com".to_string(),
        phone: "9000000000".to_string(),
        shipping_address: "1 Bench Street".to_string(),
        shipping_city: "Pune".to_string(),
        shipping_state: "MH".to_string(),
        shipping_pincode: "411001".to_string(),
    }
}

fn bench_verify_signature(c: &mut Criterion) {
    let secret = Secret::new("bench_key_secret");
    let valid = signature::sign_callback(&secret, "order_0001", "pay_0001");

    c.bench_function("checkout/verify_callback_signature", |b| {
        b.iter(|| signature::verify_callback(&secret, "order_0001", "pay_0001", &valid));
    });
}

fn bench_place_and_confirm(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let gateway = InMemoryGateway::new(GatewayConfig::new("rzp_bench", "bench_key_secret"));
    let coordinator = rt.block_on(async {
        let store = InMemoryStore::with_products([
            Product::new("SKU-1", "Widget", Money::from_minor(1999), u32::MAX),
            Product::new("SKU-2", "Gadget", Money::from_minor(4999), u32::MAX),
        ])
        .await;
        CheckoutCoordinator::new(
            store,
            gateway.clone(),
            NotificationDispatcher::spawn(LogNotifier),
        )
    });

    c.bench_function("checkout/place_and_confirm", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = coordinator
                    .place_order(PlaceOrder::new(
                        customer(),
                        vec![CartLine::new("SKU-1", 2), CartLine::new("SKU-2", 1)],
                    ))
                    .await
                    .unwrap();
                let signature = gateway.sign_callback(order.gateway_order_ref(), "pay_bench");
                coordinator
                    .confirm_payment(ConfirmPayment::new(
                        order.id().clone(),
                        "pay_bench",
                        signature,
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_verify_signature, bench_place_and_confirm);
criterion_main!(benches);
