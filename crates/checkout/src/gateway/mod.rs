//! Payment gateway adapter.
//!
//! The gateway opens a remote payment intent before the customer is redirected
//! and later vouches for the outcome through signed callbacks. Signature checks
//! are local HMAC computations; only [`PaymentGateway::open_intent`] goes over
//! the network.

mod memory;
mod razorpay;
pub mod signature;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryGateway;
pub use razorpay::RazorpayGateway;

pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com/v1";
pub const DEFAULT_CURRENCY: &str = "INR";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A credential that never shows up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Credentials and endpoint settings for a gateway adapter.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Public key ID handed to the client for the hosted checkout.
    pub key_id: String,

    /// Shared secret for API calls and callback signatures.
    pub key_secret: Secret,

    /// Secret for webhook body signatures. Without it every webhook is rejected.
    pub webhook_secret: Option<Secret>,

    pub api_base: String,
    pub currency: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Creates a config with default endpoint, currency and timeout.
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<Secret>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: None,
            api_base: DEFAULT_API_BASE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What to ask the gateway for when opening an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub amount: Money,
    pub currency: String,
    /// Internal order ID, echoed back by the gateway as the receipt.
    pub receipt: String,
}

/// A payment intent opened at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub gateway_order_ref: String,
    pub amount: Money,
    pub currency: String,
}

/// Outcome of a signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Invalid,
}

impl SignatureCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureCheck::Valid)
    }
}

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP client could not be built.
    #[error("Gateway client initialization failed: {0}")]
    Initialization(String),

    /// The gateway could not be reached.
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered with an error status.
    #[error("Gateway rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The gateway answered with a body we could not use.
    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// Operations the checkout needs from a payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Key ID the client uses to open the hosted checkout.
    fn public_key(&self) -> &str;

    /// Currency intents are opened in.
    fn currency(&self) -> &str;

    /// Opens a remote payment intent.
    async fn open_intent(&self, request: IntentRequest) -> Result<GatewayIntent, GatewayError>;

    /// Checks a checkout callback signature over `gateway_order_ref|payment_ref`.
    fn verify_callback(
        &self,
        gateway_order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> SignatureCheck;

    /// Checks a webhook signature over the raw request body.
    fn verify_webhook(&self, body: &[u8], signature: &str) -> SignatureCheck;
}
