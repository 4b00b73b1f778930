//! Checkout orchestration.
//!
//! The [`CheckoutCoordinator`] places pending orders against a priced catalog
//! snapshot, opens a payment intent at the gateway and turns verified gateway
//! callbacks into exactly-once order transitions. Terminal transitions are
//! announced to a [`NotificationDispatcher`] after they commit.

pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod notifications;
pub mod webhook;

pub use coordinator::{CheckoutCoordinator, Transition, WebhookOutcome};
pub use error::{CheckoutError, Result};
pub use gateway::{
    GatewayConfig, GatewayError, GatewayIntent, InMemoryGateway, IntentRequest, PaymentGateway,
    RazorpayGateway, Secret, SignatureCheck,
};
pub use notifications::{
    LogNotifier, NotificationDispatcher, Notifier, NotifyError, RecordingNotifier,
};
pub use webhook::WebhookEvent;
