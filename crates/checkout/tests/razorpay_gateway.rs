//! Razorpay adapter tests against a local mock of the Orders API.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use checkout::{GatewayConfig, GatewayError, IntentRequest, PaymentGateway, RazorpayGateway};
use domain::Money;
use serde_json::{Value, json};

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn create_order(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push((auth, body));
    (state.status, Json(state.body.clone()))
}

async fn spawn_mock(status: StatusCode, body: Value) -> (RazorpayGateway, MockState) {
    let state = MockState {
        status,
        body,
        seen: Arc::default(),
    };
    let app = Router::new()
        .route("/v1/orders", post(create_order))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let gateway = RazorpayGateway::new(
        GatewayConfig::new("rzp_test", "secret").with_api_base(format!("http://{addr}/v1")),
    )
    .unwrap();
    (gateway, state)
}

fn request() -> IntentRequest {
    IntentRequest {
        amount: Money::from_major(250),
        currency: "INR".to_string(),
        receipt: "ORD20250101120000ABCDEF12".to_string(),
    }
}

#[tokio::test]
async fn opens_intent_with_basic_auth() {
    let (gateway, state) = spawn_mock(
        StatusCode::OK,
        json!({"id": "order_Lx1", "amount": 25000, "currency": "INR", "status": "created"}),
    )
    .await;

    let intent = gateway.open_intent(request()).await.unwrap();

    assert_eq!(intent.gateway_order_ref, "order_Lx1");
    assert_eq!(intent.amount, Money::from_minor(25000));

    let seen = state.seen.lock().unwrap();
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Basic cnpwX3Rlc3Q6c2VjcmV0"));
    assert_eq!(body["amount"], 25000);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["receipt"], "ORD20250101120000ABCDEF12");
    assert_eq!(body["payment_capture"], 1);
}

#[tokio::test]
async fn error_status_is_rejection() {
    let (gateway, _) = spawn_mock(
        StatusCode::BAD_REQUEST,
        json!({"error": {"code": "BAD_REQUEST_ERROR", "description": "amount too small"}}),
    )
    .await;

    let result = gateway.open_intent(request()).await;

    assert!(matches!(result, Err(GatewayError::Rejected { status: 400, .. })));
}

#[tokio::test]
async fn unexpected_body_is_invalid_response() {
    let (gateway, _) = spawn_mock(StatusCode::OK, json!({"unexpected": true})).await;

    let result = gateway.open_intent(request()).await;

    assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
}

#[tokio::test]
async fn unreachable_gateway() {
    let gateway = RazorpayGateway::new(
        GatewayConfig::new("rzp_test", "secret").with_api_base("http://127.0.0.1:1/v1"),
    )
    .unwrap();

    let result = gateway.open_intent(request()).await;

    assert!(matches!(result, Err(GatewayError::Unreachable(_))));
}
