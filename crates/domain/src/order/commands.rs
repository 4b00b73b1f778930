//! Order commands and their input validation.

use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{CustomerInfo, OrderError, ProductId};

/// A single validation failure tied to a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A requested product and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to create a pending order from a cart.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer: CustomerInfo,
    pub lines: Vec<CartLine>,
}

/// A cart line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A [`PlaceOrder`] with normalized customer fields and merged lines.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub customer: CustomerInfo,
    pub lines: Vec<ValidLine>,
}

impl PlaceOrder {
    pub fn new(customer: CustomerInfo, lines: Vec<CartLine>) -> Self {
        Self { customer, lines }
    }

    /// Checks every field and collects all failures at once.
    ///
    /// Lines naming the same product are merged into the first occurrence.
    pub fn validate(&self) -> Result<ValidatedOrder, OrderError> {
        let customer = self.customer.normalized();
        let mut errors = Vec::new();

        for (field, value) in customer.fields() {
            if value.is_empty() {
                errors.push(FieldError::new(field, "This field is required."));
            }
        }
        if !customer.email.is_empty() && !looks_like_email(&customer.email) {
            errors.push(FieldError::new(
                "customer_email",
                "Enter a valid email address.",
            ));
        }

        if self.lines.is_empty() {
            errors.push(FieldError::new("items", "At least one item is required."));
        }

        let mut lines: Vec<ValidLine> = Vec::with_capacity(self.lines.len());
        for (index, line) in self.lines.iter().enumerate() {
            let product_id = ProductId::new(line.product_id.as_str().trim());
            if product_id.as_str().is_empty() {
                errors.push(FieldError::new(
                    format!("items[{index}].product_id"),
                    "This field is required.",
                ));
                continue;
            }
            let quantity = match u32::try_from(line.quantity) {
                Ok(q) if q > 0 => q,
                _ => {
                    errors.push(FieldError::new(
                        format!("items[{index}].quantity"),
                        "Quantity must be a positive integer.",
                    ));
                    continue;
                }
            };

            match lines.iter_mut().find(|l| l.product_id == product_id) {
                Some(existing) => match existing.quantity.checked_add(quantity) {
                    Some(total) => existing.quantity = total,
                    None => errors.push(FieldError::new(
                        format!("items[{index}].quantity"),
                        "Quantity is too large.",
                    )),
                },
                None => lines.push(ValidLine {
                    product_id,
                    quantity,
                }),
            }
        }

        if errors.is_empty() {
            Ok(ValidatedOrder { customer, lines })
        } else {
            Err(OrderError::Validation(errors))
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Command to confirm a payment from a signed gateway callback.
#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    pub order_id: OrderId,

    /// Gateway intent reference echoed by the client, if supplied. Must match
    /// the stored reference.
    pub gateway_order_ref: Option<String>,

    pub payment_ref: String,
    pub signature: String,
}

impl ConfirmPayment {
    pub fn new(
        order_id: OrderId,
        payment_ref: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            gateway_order_ref: None,
            payment_ref: payment_ref.into(),
            signature: signature.into(),
        }
    }

    pub fn with_gateway_order_ref(mut self, gateway_order_ref: impl Into<String>) -> Self {
        self.gateway_order_ref = Some(gateway_order_ref.into());
        self
    }

    /// Rejects blank payment references and signatures.
    pub fn validate(&self) -> Result<(), OrderError> {
        let mut errors = Vec::new();
        if self.payment_ref.trim().is_empty() {
            errors.push(FieldError::new("gateway_payment_ref", "This field is required."));
        }
        if self.signature.trim().is_empty() {
            errors.push(FieldError::new("signature", "This field is required."));
        }
        if matches!(&self.gateway_order_ref, Some(r) if r.trim().is_empty()) {
            errors.push(FieldError::new("gateway_order_ref", "This field may not be blank."));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(OrderError::Validation(errors))
        }
    }
}

/// Command to record a gateway-reported payment failure.
#[derive(Debug, Clone)]
pub struct FailPayment {
    pub order_id: OrderId,
    pub reason: String,
}

impl FailPayment {
    pub const DEFAULT_REASON: &'static str = "Payment failed";

    pub fn new(order_id: OrderId, reason: Option<String>) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_REASON.to_string());
        Self { order_id, reason }
    }
}

/// Command to cancel a pending order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub reason: String,
}

impl CancelOrder {
    pub const DEFAULT_REASON: &'static str = "Cancelled by customer";

    pub fn new(order_id: OrderId, reason: Option<String>) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_REASON.to_string());
        Self { order_id, reason }
    }
}
