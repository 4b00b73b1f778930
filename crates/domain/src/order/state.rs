//! Order payment state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Storage label for an order's status.
///
/// ```text
/// PENDING ──┬──► PAID
///           ├──► FAILED
///           └──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl StatusKind {
    /// Returns true if no transition may leave this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusKind::Pending)
    }

    /// Returns the label stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Pending => "PENDING",
            StatusKind::Paid => "PAID",
            StatusKind::Failed => "FAILED",
            StatusKind::Cancelled => "CANCELLED",
        }
    }

    /// Parses a stored label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(StatusKind::Pending),
            "PAID" => Some(StatusKind::Paid),
            "FAILED" => Some(StatusKind::Failed),
            "CANCELLED" => Some(StatusKind::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The status of an order together with the data each state owns.
///
/// A payment reference exists only inside `Paid`, so an order cannot be paid
/// without one or carry one while unpaid. Transitions consume the current
/// status and return the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, awaiting the gateway callback.
    #[default]
    Pending,

    /// Payment captured and stock debited (terminal).
    Paid { payment_ref: String },

    /// Gateway reported failure or stock ran out at confirmation (terminal).
    Failed { reason: String },

    /// Abandoned by the customer or reaped while pending (terminal).
    Cancelled { reason: String },
}

/// Outcome of checking whether a requested transition still has work to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// The order is pending; the transition must be applied.
    Apply,

    /// The order already sits in the requested state; nothing to do.
    AlreadyApplied,
}

/// A terminal, non-paid destination for a pending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closing {
    Failed { reason: String },
    Cancelled { reason: String },
}

impl Closing {
    /// Returns the status label this closing leads to.
    pub fn kind(&self) -> StatusKind {
        match self {
            Closing::Failed { .. } => StatusKind::Failed,
            Closing::Cancelled { .. } => StatusKind::Cancelled,
        }
    }

    /// Returns the recorded reason.
    pub fn reason(&self) -> &str {
        match self {
            Closing::Failed { reason } | Closing::Cancelled { reason } => reason,
        }
    }
}

impl OrderStatus {
    /// Rebuilds a status from its stored columns, enforcing that a payment
    /// reference is present exactly when the order is paid.
    pub fn from_parts(
        kind: StatusKind,
        payment_ref: Option<String>,
        reason: Option<String>,
    ) -> Result<Self, OrderError> {
        let payment_ref = payment_ref.filter(|r| !r.is_empty());
        match (kind, payment_ref) {
            (StatusKind::Pending, None) => Ok(OrderStatus::Pending),
            (StatusKind::Paid, Some(payment_ref)) => Ok(OrderStatus::Paid { payment_ref }),
            (StatusKind::Failed, None) => Ok(OrderStatus::Failed {
                reason: reason.unwrap_or_default(),
            }),
            (StatusKind::Cancelled, None) => Ok(OrderStatus::Cancelled {
                reason: reason.unwrap_or_default(),
            }),
            (kind, payment_ref) => Err(OrderError::CorruptStatus {
                kind,
                has_payment_ref: payment_ref.is_some(),
            }),
        }
    }

    /// Returns the storage label.
    pub fn kind(&self) -> StatusKind {
        match self {
            OrderStatus::Pending => StatusKind::Pending,
            OrderStatus::Paid { .. } => StatusKind::Paid,
            OrderStatus::Failed { .. } => StatusKind::Failed,
            OrderStatus::Cancelled { .. } => StatusKind::Cancelled,
        }
    }

    /// Returns true if no transition may leave this state.
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Returns the gateway payment reference if the order is paid.
    pub fn payment_ref(&self) -> Option<&str> {
        match self {
            OrderStatus::Paid { payment_ref } => Some(payment_ref),
            _ => None,
        }
    }

    /// Returns the recorded reason for failed and cancelled orders.
    pub fn reason(&self) -> Option<&str> {
        match self {
            OrderStatus::Failed { reason } | OrderStatus::Cancelled { reason } => Some(reason),
            _ => None,
        }
    }

    /// PENDING → PAID.
    pub fn pay(self, payment_ref: impl Into<String>) -> Result<Self, OrderError> {
        let payment_ref = payment_ref.into();
        if payment_ref.trim().is_empty() {
            return Err(OrderError::MissingPaymentRef);
        }
        match self {
            OrderStatus::Pending => Ok(OrderStatus::Paid { payment_ref }),
            other => Err(OrderError::InvalidTransition {
                from: other.kind(),
                action: "pay",
            }),
        }
    }

    /// PENDING → FAILED.
    pub fn fail(self, reason: impl Into<String>) -> Result<Self, OrderError> {
        self.close(Closing::Failed {
            reason: reason.into(),
        })
    }

    /// PENDING → CANCELLED.
    pub fn cancel(self, reason: impl Into<String>) -> Result<Self, OrderError> {
        self.close(Closing::Cancelled {
            reason: reason.into(),
        })
    }

    /// PENDING → FAILED or CANCELLED, as described by `closing`.
    pub fn close(self, closing: Closing) -> Result<Self, OrderError> {
        match self {
            OrderStatus::Pending => Ok(match closing {
                Closing::Failed { reason } => OrderStatus::Failed { reason },
                Closing::Cancelled { reason } => OrderStatus::Cancelled { reason },
            }),
            other => Err(OrderError::InvalidTransition {
                from: other.kind(),
                action: match closing.kind() {
                    StatusKind::Cancelled => "cancel",
                    _ => "fail",
                },
            }),
        }
    }

    /// Decides what a payment confirmation carrying `payment_ref` means here.
    ///
    /// A repeat of the confirmation that already paid the order is a no-op.
    /// A different reference on a paid order, or any confirmation of a failed
    /// or cancelled order, is a conflict.
    pub fn check_pay(&self, payment_ref: &str) -> Result<TransitionCheck, OrderError> {
        match self {
            OrderStatus::Pending => Ok(TransitionCheck::Apply),
            OrderStatus::Paid { payment_ref: stored } if stored == payment_ref => {
                Ok(TransitionCheck::AlreadyApplied)
            }
            OrderStatus::Paid { payment_ref: stored } => Err(OrderError::PaymentRefMismatch {
                stored: stored.clone(),
                received: payment_ref.to_string(),
            }),
            other => Err(OrderError::InvalidTransition {
                from: other.kind(),
                action: "pay",
            }),
        }
    }

    /// Decides what a fail or cancel request means here.
    ///
    /// Repeating the request that already closed the order is a no-op; any
    /// other terminal state is a conflict.
    pub fn check_close(&self, target: StatusKind) -> Result<TransitionCheck, OrderError> {
        let current = self.kind();
        if current == StatusKind::Pending {
            Ok(TransitionCheck::Apply)
        } else if current == target {
            Ok(TransitionCheck::AlreadyApplied)
        } else {
            Err(OrderError::InvalidTransition {
                from: current,
                action: match target {
                    StatusKind::Cancelled => "cancel",
                    _ => "fail",
                },
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid(payment_ref: &str) -> OrderStatus {
        OrderStatus::Pending.pay(payment_ref).unwrap()
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_pending_can_reach_every_terminal_state() {
        assert_eq!(paid("pay_1").kind(), StatusKind::Paid);
        assert_eq!(paid("pay_1").payment_ref(), Some("pay_1"));

        let failed = OrderStatus::Pending.fail("card declined").unwrap();
        assert_eq!(failed.kind(), StatusKind::Failed);
        assert_eq!(failed.reason(), Some("card declined"));

        let cancelled = OrderStatus::Pending.cancel("abandoned").unwrap();
        assert_eq!(cancelled.kind(), StatusKind::Cancelled);
        assert_eq!(cancelled.payment_ref(), None);
    }

    #[test]
    fn test_no_transition_leaves_a_terminal_state() {
        let terminals = [
            paid("pay_1"),
            OrderStatus::Pending.fail("x").unwrap(),
            OrderStatus::Pending.cancel("x").unwrap(),
        ];
        for status in terminals {
            assert!(status.is_terminal());
            assert!(status.clone().pay("pay_2").is_err());
            assert!(status.clone().fail("y").is_err());
            assert!(status.clone().cancel("y").is_err());
        }
    }

    #[test]
    fn test_pay_requires_a_reference() {
        assert!(matches!(
            OrderStatus::Pending.pay("  "),
            Err(OrderError::MissingPaymentRef)
        ));
    }

    #[test]
    fn test_check_pay_distinguishes_replay_from_conflict() {
        assert_eq!(
            OrderStatus::Pending.check_pay("pay_1").unwrap(),
            TransitionCheck::Apply
        );
        assert_eq!(
            paid("pay_1").check_pay("pay_1").unwrap(),
            TransitionCheck::AlreadyApplied
        );
        assert!(matches!(
            paid("pay_1").check_pay("pay_2"),
            Err(OrderError::PaymentRefMismatch { .. })
        ));
        assert!(matches!(
            OrderStatus::Pending.fail("x").unwrap().check_pay("pay_1"),
            Err(OrderError::InvalidTransition {
                from: StatusKind::Failed,
                ..
            })
        ));
    }

    #[test]
    fn test_check_close() {
        let failed = OrderStatus::Pending.fail("x").unwrap();
        assert_eq!(
            failed.check_close(StatusKind::Failed).unwrap(),
            TransitionCheck::AlreadyApplied
        );
        assert!(failed.check_close(StatusKind::Cancelled).is_err());
        assert!(paid("pay_1").check_close(StatusKind::Failed).is_err());
        assert!(paid("pay_1").check_close(StatusKind::Cancelled).is_err());
    }

    #[test]
    fn test_from_parts_enforces_payment_ref_invariant() {
        assert_eq!(
            OrderStatus::from_parts(StatusKind::Paid, Some("pay_1".into()), None).unwrap(),
            paid("pay_1")
        );
        assert!(OrderStatus::from_parts(StatusKind::Paid, None, None).is_err());
        assert!(OrderStatus::from_parts(StatusKind::Paid, Some(String::new()), None).is_err());
        assert!(
            OrderStatus::from_parts(StatusKind::Pending, Some("pay_1".into()), None).is_err()
        );
        assert_eq!(
            OrderStatus::from_parts(StatusKind::Failed, None, Some("declined".into())).unwrap(),
            OrderStatus::Failed {
                reason: "declined".into()
            }
        );
    }

    #[test]
    fn test_status_labels() {
        for kind in [
            StatusKind::Pending,
            StatusKind::Paid,
            StatusKind::Failed,
            StatusKind::Cancelled,
        ] {
            assert_eq!(StatusKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(StatusKind::parse("SHIPPED"), None);
        assert_eq!(paid("pay_1").to_string(), "PAID");
    }
}
