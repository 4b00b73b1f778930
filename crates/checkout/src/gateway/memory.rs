use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    GatewayConfig, GatewayError, GatewayIntent, IntentRequest, PaymentGateway, SignatureCheck,
    signature,
};

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, GatewayIntent>,
    next_id: u32,
    fail_on_open: bool,
}

/// Gateway fake for tests and local runs.
///
/// Verifies signatures with the real HMAC scheme and can produce valid ones,
/// so callers can drive the full confirmation path without network access.
#[derive(Debug, Clone)]
pub struct InMemoryGateway {
    config: GatewayConfig,
    state: Arc<Mutex<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            state: Arc::default(),
        }
    }

    /// Configures the gateway to fail every intent request.
    pub fn set_fail_on_open(&self, fail: bool) {
        self.state().fail_on_open = fail;
    }

    /// Returns the number of intents opened so far.
    pub fn intent_count(&self) -> usize {
        self.state().intents.len()
    }

    /// Returns a previously opened intent.
    pub fn intent(&self, gateway_order_ref: &str) -> Option<GatewayIntent> {
        self.state().intents.get(gateway_order_ref).cloned()
    }

    /// Produces the signature the hosted checkout would send back.
    pub fn sign_callback(&self, gateway_order_ref: &str, payment_ref: &str) -> String {
        signature::sign_callback(&self.config.key_secret, gateway_order_ref, payment_ref)
    }

    /// Produces a webhook signature, if a webhook secret is configured.
    pub fn sign_webhook(&self, body: &[u8]) -> Option<String> {
        self.config
            .webhook_secret
            .as_ref()
            .map(|secret| signature::sign(secret, body))
    }

    fn state(&self) -> MutexGuard<'_, InMemoryGatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    fn public_key(&self) -> &str {
        &self.config.key_id
    }

    fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn open_intent(&self, request: IntentRequest) -> Result<GatewayIntent, GatewayError> {
        let mut state = self.state();
        if state.fail_on_open {
            return Err(GatewayError::Unreachable(
                "simulated gateway outage".to_string(),
            ));
        }

        state.next_id += 1;
        let intent = GatewayIntent {
            gateway_order_ref: format!("order_{:04}", state.next_id),
            amount: request.amount,
            currency: request.currency,
        };
        state
            .intents
            .insert(intent.gateway_order_ref.clone(), intent.clone());
        Ok(intent)
    }

    fn verify_callback(
        &self,
        gateway_order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> SignatureCheck {
        signature::verify_callback(
            &self.config.key_secret,
            gateway_order_ref,
            payment_ref,
            signature,
        )
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> SignatureCheck {
        signature::verify_webhook(self.config.webhook_secret.as_ref(), body, signature)
    }
}
