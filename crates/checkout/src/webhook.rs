//! Gateway webhook payloads.

use serde::Deserialize;

pub const PAYMENT_CAPTURED: &str = "payment.captured";
pub const PAYMENT_FAILED: &str = "payment.failed";

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
struct PaymentWrapper {
    entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// A webhook event the checkout acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentCaptured {
        gateway_order_ref: String,
        payment_ref: String,
    },
    PaymentFailed {
        gateway_order_ref: String,
        payment_ref: String,
        reason: Option<String>,
    },
    /// Any other event; acknowledged and ignored.
    Other(String),
}

impl WebhookEvent {
    /// Parses a verified webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| format!("invalid JSON: {e}"))?;

        if envelope.event != PAYMENT_CAPTURED && envelope.event != PAYMENT_FAILED {
            return Ok(WebhookEvent::Other(envelope.event));
        }

        let entity = envelope
            .payload
            .payment
            .map(|p| p.entity)
            .ok_or_else(|| format!("{} without payment entity", envelope.event))?;
        let gateway_order_ref = entity
            .order_id
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| format!("{} without order_id", envelope.event))?;

        Ok(if envelope.event == PAYMENT_CAPTURED {
            let payment_ref = entity.id.trim();
            if payment_ref.is_empty() {
                return Err(format!("{} without payment id", envelope.event));
            }
            WebhookEvent::PaymentCaptured {
                gateway_order_ref,
                payment_ref: payment_ref.to_string(),
            }
        } else {
            WebhookEvent::PaymentFailed {
                gateway_order_ref,
                payment_ref: entity.id,
                reason: entity.error_description.filter(|r| !r.trim().is_empty()),
            }
        })
    }

    pub fn name(&self) -> &str {
        match self {
            WebhookEvent::PaymentCaptured { .. } => PAYMENT_CAPTURED,
            WebhookEvent::PaymentFailed { .. } => PAYMENT_FAILED,
            WebhookEvent::Other(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_captured() {
        let body = br#"{
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"id": "pay_1", "order_id": "order_9", "amount": 25000}}}
        }"#;

        assert_eq!(
            WebhookEvent::parse(body).unwrap(),
            WebhookEvent::PaymentCaptured {
                gateway_order_ref: "order_9".to_string(),
                payment_ref: "pay_1".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_failed_with_reason() {
        let body = br#"{
            "event": "payment.failed",
            "payload": {"payment": {"entity": {"id": "pay_2", "order_id": "order_9", "error_description": "Card declined"}}}
        }"#;

        let event = WebhookEvent::parse(body).unwrap();

        assert_eq!(
            event,
            WebhookEvent::PaymentFailed {
                gateway_order_ref: "order_9".to_string(),
                payment_ref: "pay_2".to_string(),
                reason: Some("Card declined".to_string()),
            }
        );
        assert_eq!(event.name(), "payment.failed");
    }

    #[test]
    fn test_unhandled_event_is_other() {
        let body = br#"{"event": "refund.processed", "payload": {}}"#;

        assert_eq!(
            WebhookEvent::parse(body).unwrap(),
            WebhookEvent::Other("refund.processed".to_string())
        );
    }

    #[test]
    fn test_captured_without_order_ref_rejected() {
        let body = br#"{"event": "payment.captured", "payload": {"payment": {"entity": {"id": "pay_1"}}}}"#;

        assert!(WebhookEvent::parse(body).is_err());
    }

    #[test]
    fn test_captured_without_payment_id_rejected() {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"  ","order_id":"order_1"}}}}"#;
        assert!(WebhookEvent::parse(body).unwrap_err().contains("payment id"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(WebhookEvent::parse(b"not json").is_err());
    }
}
