use async_trait::async_trait;
use domain::Money;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    GatewayConfig, GatewayError, GatewayIntent, IntentRequest, PaymentGateway, SignatureCheck,
    signature,
};

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
    notes: OrderNotes<'a>,
}

#[derive(Serialize)]
struct OrderNotes<'a> {
    internal_order_id: &'a str,
}

#[derive(Deserialize)]
struct CreatedOrder {
    id: String,
    amount: i64,
    currency: String,
}

/// Razorpay Orders API adapter.
#[derive(Clone)]
pub struct RazorpayGateway {
    config: GatewayConfig,
    client: Client,
}

impl RazorpayGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn public_key(&self) -> &str {
        &self.config.key_id
    }

    fn currency(&self) -> &str {
        &self.config.currency
    }

    #[tracing::instrument(skip(self), fields(amount = %request.amount, receipt = %request.receipt))]
    async fn open_intent(&self, request: IntentRequest) -> Result<GatewayIntent, GatewayError> {
        let body = CreateOrderBody {
            amount: request.amount.minor(),
            currency: &request.currency,
            receipt: &request.receipt,
            payment_capture: 1,
            notes: OrderNotes {
                internal_order_id: &request.receipt,
            },
        };

        let response = self
            .client
            .post(self.url("/orders"))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            tracing::warn!(status = status.as_u16(), "Gateway rejected intent");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if created.id.trim().is_empty() {
            return Err(GatewayError::InvalidResponse(
                "missing order id".to_string(),
            ));
        }

        tracing::debug!(gateway_order_ref = %created.id, "Gateway intent opened");
        Ok(GatewayIntent {
            gateway_order_ref: created.id,
            amount: Money::from_minor(created.amount),
            currency: created.currency,
        })
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let gateway = RazorpayGateway::new(
            GatewayConfig::new("rzp_test", "secret").with_api_base("http://localhost:9000/v1/"),
        )
        .unwrap();

        assert_eq!(gateway.url("/orders"), "http://localhost:9000/v1/orders");
    }

    #[test]
    fn test_request_body_shape() {
        let body = CreateOrderBody {
            amount: 25000,
            currency: "INR",
            receipt: "ORD20250101120000ABCDEF12",
            payment_capture: 1,
            notes: OrderNotes {
                internal_order_id: "ORD20250101120000ABCDEF12",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["amount"], 25000);
        assert_eq!(json["payment_capture"], 1);
        assert_eq!(json["notes"]["internal_order_id"], "ORD20250101120000ABCDEF12");
    }
}
