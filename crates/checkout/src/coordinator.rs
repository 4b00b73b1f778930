//! Checkout coordinator: order placement and payment state transitions.

use std::time::Instant;

use chrono::Utc;
use common::OrderId;
use domain::{
    CancelOrder, Closing, ConfirmPayment, FailPayment, Order, OrderError, OrderEvent, OrderItem,
    PlaceOrder, PricedCart, StatusKind, TransitionCheck,
};
use ledger::{CatalogStore, Closure, OrderLedger, Settlement};

use crate::error::{CheckoutError, Result};
use crate::gateway::{GatewayError, IntentRequest, PaymentGateway};
use crate::notifications::NotificationDispatcher;
use crate::webhook::WebhookEvent;

/// Result of a confirm, fail or cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The order as persisted after the request.
    pub order: Order,

    /// `false` when the request repeated a transition that had already
    /// happened, so nothing was written and no event was emitted.
    pub applied: bool,
}

impl Transition {
    fn applied(order: Order) -> Self {
        Self {
            order,
            applied: true,
        }
    }

    fn unchanged(order: Order) -> Self {
        Self {
            order,
            applied: false,
        }
    }
}

/// What a verified webhook led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed(Transition),
    Failed(Transition),

    /// The event could not be applied without overwriting a terminal state,
    /// or stock ran out and the order was failed instead.
    Rejected { order_id: OrderId, reason: String },

    /// No order owns the gateway reference.
    UnknownOrder { gateway_order_ref: String },

    /// Event type the checkout does not handle.
    Ignored(String),
}

/// Drives orders from creation to a terminal payment state.
///
/// Every transition re-reads the ledger; the store's conditional updates
/// decide which of several concurrent callers performs a transition.
pub struct CheckoutCoordinator<S, G>
where
    S: CatalogStore + OrderLedger,
    G: PaymentGateway,
{
    store: S,
    gateway: G,
    notifications: NotificationDispatcher,
}

impl<S, G> CheckoutCoordinator<S, G>
where
    S: CatalogStore + OrderLedger,
    G: PaymentGateway,
{
    pub fn new(store: S, gateway: G, notifications: NotificationDispatcher) -> Self {
        Self {
            store,
            gateway,
            notifications,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    /// Creates a pending order priced from the current catalog and opens the
    /// matching gateway intent.
    ///
    /// The stock check here is advisory; scarcity is settled when the payment
    /// is confirmed. Nothing is persisted unless the intent was opened.
    #[tracing::instrument(
        skip(self, command),
        fields(customer_email = %command.customer.email, lines = command.lines.len())
    )]
    pub async fn place_order(&self, command: PlaceOrder) -> Result<Order> {
        let validated = command.validate()?;

        let mut items = Vec::with_capacity(validated.lines.len());
        for line in &validated.lines {
            let product = self
                .store
                .get_product(&line.product_id)
                .await?
                .filter(|p| p.is_available)
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;

            if line.quantity > product.stock_quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock_quantity,
                });
            }

            items.push(OrderItem::new(
                product.id,
                product.name,
                line.quantity,
                product.price,
            ));
        }
        let cart = PricedCart::new(items)?;

        let now = Utc::now();
        let order_id = OrderId::generate(now);
        let intent = self
            .gateway
            .open_intent(IntentRequest {
                amount: cart.total_amount(),
                currency: self.gateway.currency().to_string(),
                receipt: order_id.to_string(),
            })
            .await
            .inspect_err(|e| tracing::error!(order_id = %order_id, error = %e, "Failed to open payment intent"))?;

        if intent.amount != cart.total_amount() {
            return Err(GatewayError::InvalidResponse(format!(
                "intent amount {} does not match order total {}",
                intent.amount,
                cart.total_amount()
            ))
            .into());
        }

        let order = Order::place(
            order_id,
            validated.customer,
            cart,
            intent.currency,
            intent.gateway_order_ref,
            now,
        )?;
        self.store
            .insert_order(&order)
            .await
            .inspect_err(|e| tracing::error!(order_id = %order.id(), error = %e, "Failed to persist order"))?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            gateway_order_ref = %order.gateway_order_ref(),
            total_amount = %order.total_amount(),
            "Order placed"
        );
        Ok(order)
    }

    /// Confirms a payment from a signed checkout callback.
    ///
    /// The signature is checked against the stored gateway reference before
    /// anything else, including for repeats of an earlier confirmation.
    #[tracing::instrument(
        skip(self, command),
        fields(order_id = %command.order_id, payment_ref = %command.payment_ref)
    )]
    pub async fn confirm_payment(&self, command: ConfirmPayment) -> Result<Transition> {
        let started = Instant::now();
        command.validate()?;
        let payment_ref = command.payment_ref.trim();

        let order = self.load(&command.order_id).await?;

        if let Some(echoed) = &command.gateway_order_ref
            && echoed.trim() != order.gateway_order_ref()
        {
            Self::signature_rejected(order.id().as_str(), "gateway order reference mismatch");
            return Err(CheckoutError::InvalidSignature(order.id().to_string()));
        }

        let check = self.gateway.verify_callback(
            order.gateway_order_ref(),
            payment_ref,
            command.signature.trim(),
        );
        if !check.is_valid() {
            Self::signature_rejected(order.id().as_str(), "callback signature mismatch");
            return Err(CheckoutError::InvalidSignature(order.id().to_string()));
        }

        let result = self.settle_verified(order, payment_ref).await;
        metrics::histogram!("payment_confirm_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// Records a gateway-reported payment failure.
    #[tracing::instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn fail_payment(&self, command: FailPayment) -> Result<Transition> {
        let order = self.load(&command.order_id).await?;
        self.close_loaded(
            order,
            Closing::Failed {
                reason: command.reason,
            },
        )
        .await
    }

    /// Cancels a pending order at the customer's request.
    #[tracing::instrument(skip(self, command), fields(order_id = %command.order_id))]
    pub async fn cancel_order(&self, command: CancelOrder) -> Result<Transition> {
        let order = self.load(&command.order_id).await?;
        self.close_loaded(
            order,
            Closing::Cancelled {
                reason: command.reason,
            },
        )
        .await
    }

    /// Returns the current state of an order.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        self.load(order_id).await
    }

    /// Lists a customer's orders, newest first.
    pub async fn orders_for_customer(&self, email: &str) -> Result<Vec<Order>> {
        if email.trim().is_empty() {
            return Err(CheckoutError::invalid_field(
                "email",
                "This field is required.",
            ));
        }
        Ok(self.store.orders_for_customer(email.trim()).await?)
    }

    /// Applies a gateway webhook after checking the body signature.
    ///
    /// Conflicts and unknown orders are acknowledged rather than returned as
    /// errors, since the gateway would otherwise redeliver them forever.
    #[tracing::instrument(skip(self, body, signature), fields(body_len = body.len()))]
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<WebhookOutcome> {
        if !self.gateway.verify_webhook(body, signature.trim()).is_valid() {
            Self::signature_rejected("webhook", "webhook signature mismatch");
            return Err(CheckoutError::InvalidWebhookSignature);
        }

        let event =
            WebhookEvent::parse(body).map_err(|e| CheckoutError::invalid_field("payload", e))?;
        tracing::info!(event = event.name(), "Webhook received");

        match event {
            WebhookEvent::PaymentCaptured {
                gateway_order_ref,
                payment_ref,
            } => {
                let Some(order) = self.store.find_by_gateway_ref(&gateway_order_ref).await? else {
                    tracing::error!(%gateway_order_ref, "Webhook for unknown order");
                    return Ok(WebhookOutcome::UnknownOrder { gateway_order_ref });
                };
                let result = self.settle_verified(order, &payment_ref).await;
                acknowledge(result, WebhookOutcome::Confirmed)
            }
            WebhookEvent::PaymentFailed {
                gateway_order_ref,
                reason,
                ..
            } => {
                let Some(order) = self.store.find_by_gateway_ref(&gateway_order_ref).await? else {
                    tracing::error!(%gateway_order_ref, "Webhook for unknown order");
                    return Ok(WebhookOutcome::UnknownOrder { gateway_order_ref });
                };
                let reason = FailPayment::new(order.id().clone(), reason).reason;
                let result = self.close_loaded(order, Closing::Failed { reason }).await;
                acknowledge(result, WebhookOutcome::Failed)
            }
            WebhookEvent::Other(name) => {
                tracing::debug!(event = %name, "Ignoring webhook event");
                Ok(WebhookOutcome::Ignored(name))
            }
        }
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_id.to_string()))
    }

    /// PENDING → PAID for an order whose payment is already authenticated.
    async fn settle_verified(&self, order: Order, payment_ref: &str) -> Result<Transition> {
        match order.check_pay(payment_ref) {
            Ok(TransitionCheck::AlreadyApplied) => return Ok(Self::replayed(order)),
            Ok(TransitionCheck::Apply) => {}
            Err(e) => return Err(Self::conflict(&order, e)),
        }

        match self
            .store
            .settle_payment(order.id(), payment_ref, Utc::now())
            .await
            .inspect_err(|e| tracing::error!(order_id = %order.id(), error = %e, "Payment settlement failed"))?
        {
            Settlement::Applied(paid) => {
                metrics::counter!("payments_confirmed_total").increment(1);
                tracing::info!(order_id = %paid.id(), payment_ref, "Payment confirmed");
                self.announce(&paid);
                Ok(Transition::applied(paid))
            }
            Settlement::NotPending(current) => match current.check_pay(payment_ref) {
                Ok(_) => Ok(Self::replayed(current)),
                Err(e) => Err(Self::conflict(&current, e)),
            },
            Settlement::OutOfStock {
                order: failed,
                product_id,
                requested,
                available,
            } => {
                metrics::counter!("payment_out_of_stock_total").increment(1);
                tracing::warn!(
                    order_id = %failed.id(),
                    product_id = %product_id,
                    requested,
                    available,
                    "Stock ran out before payment confirmation, order failed"
                );
                self.announce(&failed);

                Err(CheckoutError::OutOfStock {
                    order_id: failed.id().clone(),
                    product_id,
                    requested,
                    available,
                })
            }
            Settlement::NotFound => Err(CheckoutError::OrderNotFound(order.id().to_string())),
        }
    }

    /// PENDING → FAILED/CANCELLED. Repeating the same closure is a no-op.
    async fn close_loaded(&self, order: Order, closing: Closing) -> Result<Transition> {
        let target = closing.kind();
        match order.check_close(target) {
            Ok(TransitionCheck::AlreadyApplied) => return Ok(Transition::unchanged(order)),
            Ok(TransitionCheck::Apply) => {}
            Err(e) => return Err(Self::conflict(&order, e)),
        }

        match self
            .store
            .close_order(order.id(), closing, Utc::now())
            .await
            .inspect_err(|e| tracing::error!(order_id = %order.id(), error = %e, "Order closure failed"))?
        {
            Closure::Closed(closed) => {
                match target {
                    StatusKind::Cancelled => {
                        metrics::counter!("orders_cancelled_total").increment(1)
                    }
                    _ => metrics::counter!("payments_failed_total").increment(1),
                }
                tracing::info!(
                    order_id = %closed.id(),
                    status = %target,
                    reason = closed.status().reason().unwrap_or_default(),
                    "Order closed"
                );
                self.announce(&closed);
                Ok(Transition::applied(closed))
            }
            Closure::NotPending(current) => match current.check_close(target) {
                Ok(_) => Ok(Transition::unchanged(current)),
                Err(e) => Err(Self::conflict(&current, e)),
            },
            Closure::NotFound => Err(CheckoutError::OrderNotFound(order.id().to_string())),
        }
    }

    fn announce(&self, order: &Order) {
        if let Some(event) = OrderEvent::for_terminal(order) {
            self.notifications.dispatch(event);
        }
    }

    fn replayed(order: Order) -> Transition {
        metrics::counter!("payment_confirmations_replayed_total").increment(1);
        tracing::info!(order_id = %order.id(), "Payment confirmation already applied");
        Transition::unchanged(order)
    }

    fn conflict(order: &Order, err: OrderError) -> CheckoutError {
        tracing::warn!(
            order_id = %order.id(),
            status = %order.status().kind(),
            error = %err,
            "Rejected transition on terminal order"
        );
        CheckoutError::Conflict {
            order_id: order.id().clone(),
            current: order.status().kind(),
            reason: err.to_string(),
        }
    }

    fn signature_rejected(subject: &str, detail: &'static str) {
        metrics::counter!("payment_signature_rejections_total").increment(1);
        tracing::warn!(subject, detail, "Rejected payment signature");
    }
}

fn acknowledge(
    result: Result<Transition>,
    wrap: fn(Transition) -> WebhookOutcome,
) -> Result<WebhookOutcome> {
    match result {
        Ok(transition) => Ok(wrap(transition)),
        Err(CheckoutError::Conflict {
            order_id, reason, ..
        }) => Ok(WebhookOutcome::Rejected { order_id, reason }),
        Err(CheckoutError::OutOfStock {
            order_id,
            product_id,
            ..
        }) => Ok(WebhookOutcome::Rejected {
            order_id,
            reason: format!("{product_id} out of stock"),
        }),
        Err(e) => Err(e),
    }
}
