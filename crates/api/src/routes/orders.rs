//! Order placement, payment callback and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use checkout::{CheckoutCoordinator, PaymentGateway};
use common::OrderId;
use domain::{
    CancelOrder, CartLine, ConfirmPayment, CustomerInfo, FailPayment, Order, PlaceOrder,
};
use ledger::{CatalogStore, OrderLedger};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::ApiJson;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G>
where
    S: CatalogStore + OrderLedger,
    G: PaymentGateway,
{
    pub checkout: CheckoutCoordinator<S, G>,
}

impl<S, G> AppState<S, G>
where
    S: CatalogStore + OrderLedger,
    G: PaymentGateway,
{
    pub fn new(checkout: CheckoutCoordinator<S, G>) -> Self {
        Self { checkout }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_city: String,
    #[serde(default)]
    pub shipping_state: String,
    #[serde(default)]
    pub shipping_pincode: String,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    #[serde(default)]
    pub gateway_order_ref: Option<String>,
    #[serde(default)]
    pub gateway_payment_ref: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Deserialize)]
pub struct PaymentFailedRequest {
    pub order_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub email: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub gateway_order_ref: String,
    pub gateway_key_id: String,
    /// Total in minor currency units, as the hosted checkout expects it.
    pub amount: i64,
    pub total_amount: String,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: String,
    /// `false` when the request repeated an earlier transition.
    pub applied: bool,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub status_reason: Option<String>,
    pub gateway_order_ref: String,
    pub gateway_payment_ref: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_pincode: String,
    pub items: Vec<OrderItemResponse>,
    pub amount: i64,
    pub total_amount: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let customer = order.customer();
        Self {
            order_id: order.id().to_string(),
            status: order.status().kind().to_string(),
            status_reason: order.status().reason().map(str::to_string),
            gateway_order_ref: order.gateway_order_ref().to_string(),
            gateway_payment_ref: order.gateway_payment_ref().map(str::to_string),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            customer_phone: customer.phone.clone(),
            shipping_address: customer.shipping_address.clone(),
            shipping_city: customer.shipping_city.clone(),
            shipping_state: customer.shipping_state.clone(),
            shipping_pincode: customer.shipping_pincode.clone(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.to_string(),
                    subtotal: item
                        .subtotal()
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                })
                .collect(),
            amount: order.total_amount().minor(),
            total_amount: order.total_amount().to_string(),
            currency: order.currency().to_string(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

impl OrderStatusResponse {
    fn new(order: &Order, applied: bool) -> Self {
        Self {
            order_id: order.id().to_string(),
            status: order.status().kind().to_string(),
            applied,
        }
    }
}

// -- Handlers --

/// POST /orders/create — create a pending order and open a gateway intent.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let customer = CustomerInfo {
        name: req.customer_name,
        email: req.customer_email,
        phone: req.customer_phone,
        shipping_address: req.shipping_address,
        shipping_city: req.shipping_city,
        shipping_state: req.shipping_state,
        shipping_pincode: req.shipping_pincode,
    };
    let lines = req
        .items
        .into_iter()
        .map(|item| CartLine::new(item.product_id, item.quantity))
        .collect();

    let order = state
        .checkout
        .place_order(PlaceOrder::new(customer, lines))
        .await?;

    let response = OrderCreatedResponse {
        order_id: order.id().to_string(),
        gateway_order_ref: order.gateway_order_ref().to_string(),
        gateway_key_id: state.checkout.gateway().public_key().to_string(),
        amount: order.total_amount().minor(),
        total_amount: order.total_amount().to_string(),
        currency: order.currency().to_string(),
        customer_name: order.customer().name.clone(),
        customer_email: order.customer().email.clone(),
        customer_phone: order.customer().phone.clone(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /orders/verify-payment — confirm a payment from the checkout callback.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn verify_payment<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    ApiJson(req): ApiJson<VerifyPaymentRequest>,
) -> Result<Json<OrderStatusResponse>, ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&req.order_id)?;
    let mut command = ConfirmPayment::new(order_id, req.gateway_payment_ref, req.signature);
    if let Some(gateway_order_ref) = req.gateway_order_ref {
        command = command.with_gateway_order_ref(gateway_order_ref);
    }

    let transition = state.checkout.confirm_payment(command).await?;
    Ok(Json(OrderStatusResponse::new(
        &transition.order,
        transition.applied,
    )))
}

/// POST /orders/payment-failed — record a payment failure reported by the client.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn payment_failed<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    ApiJson(req): ApiJson<PaymentFailedRequest>,
) -> Result<Json<OrderStatusResponse>, ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&req.order_id)?;
    let transition = state
        .checkout
        .fail_payment(FailPayment::new(order_id, req.reason))
        .await?;
    Ok(Json(OrderStatusResponse::new(
        &transition.order,
        transition.applied,
    )))
}

/// POST /orders/{id}/cancel — cancel a pending order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&id)?;
    let transition = state
        .checkout
        .cancel_order(CancelOrder::new(order_id, None))
        .await?;
    Ok(Json(OrderStatusResponse::new(
        &transition.order,
        transition.applied,
    )))
}

/// GET /orders/{id} — current order state for status polling.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.checkout.get_order(&order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders?email= — a customer's orders, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: CatalogStore + OrderLedger + 'static,
    G: PaymentGateway + 'static,
{
    let orders = state
        .checkout
        .orders_for_customer(query.email.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(raw).map_err(|_| ApiError::NotFound(format!("Order {raw} not found")))
}
