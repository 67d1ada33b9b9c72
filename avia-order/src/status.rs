use avia_shared::StoreError;
use chrono::{DateTime, Utc};

use crate::models::{Order, OrderStatus, REFUND_PROCESSED};

/// The fixed table of allowed order status changes.
///
/// `cancelled` and `refunded` are terminal. Self-transitions are never listed.
pub struct OrderStateMachine;

impl OrderStateMachine {
    pub fn allowed_from(status: OrderStatus) -> &'static [OrderStatus] {
        match status {
            OrderStatus::Pending => &[OrderStatus::Paid, OrderStatus::Cancelled],
            OrderStatus::Paid => &[OrderStatus::Cancelled, OrderStatus::Refunded],
            OrderStatus::Cancelled | OrderStatus::Refunded => &[],
        }
    }

    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        Self::allowed_from(from).contains(&to)
    }

    /// Validates a requested change against the table.
    pub fn plan(order: &Order, request: &StatusChangeRequest) -> Result<TransitionPlan, OrderError> {
        let requested = match request.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => {
                return Err(OrderError::MissingStatus {
                    current: order.status,
                    available: order.available_statuses().to_vec(),
                })
            }
        };

        let to = match requested.parse::<OrderStatus>() {
            Ok(to) if order.can_transition_to(to) => to,
            _ => {
                return Err(OrderError::InvalidTransition {
                    current: order.status,
                    requested: requested.to_string(),
                    available: order.available_statuses().to_vec(),
                })
            }
        };

        let refund = request.refund
            && order.status == OrderStatus::Paid
            && to == OrderStatus::Cancelled;

        Ok(TransitionPlan { from: order.status, to, refund })
    }
}

impl Order {
    pub fn can_transition_to(&self, status: OrderStatus) -> bool {
        OrderStateMachine::can_transition(self.status, status)
    }

    pub fn available_statuses(&self) -> &'static [OrderStatus] {
        OrderStateMachine::allowed_from(self.status)
    }
}

/// Body of `PATCH /orders/{id}`: `{"status": "...", "refund": true}`
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StatusChangeRequest {
    pub status: Option<String>,
    #[serde(default)]
    pub refund: bool,
}

/// A validated status change.
///
/// `refund` is only ever set for `paid → cancelled`; it marks the refund as
/// processed and tells the caller to release one seat per ticket. A plain
/// `paid → cancelled` leaves the seats consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub refund: bool,
}

impl TransitionPlan {
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) {
        order.status = self.to;
        if self.refund {
            order.refund_status = Some(REFUND_PROCESSED.to_string());
        }
        order.updated_at = now;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(i64),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Status is required")]
    MissingStatus {
        current: OrderStatus,
        available: Vec<OrderStatus>,
    },

    #[error("Invalid status transition from {current} to {requested}")]
    InvalidTransition {
        current: OrderStatus,
        requested: String,
        available: Vec<OrderStatus>,
    },

    #[error("Cannot delete paid order. Cancel or refund it first.")]
    PaidOrderDeletion(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewOrder;

    fn order(status: OrderStatus) -> Order {
        NewOrder { user_id: 1, status, total: 100 }.into_order(1, Utc::now())
    }

    fn request(status: &str, refund: bool) -> StatusChangeRequest {
        StatusChangeRequest { status: Some(status.to_string()), refund }
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        let allowed = [(Pending, Paid), (Pending, Cancelled), (Paid, Cancelled), (Paid, Refunded)];

        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    OrderStateMachine::can_transition(from, to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        let paid = order(Paid);
        assert!(paid.can_transition_to(Refunded));
        assert!(!paid.can_transition_to(Paid));
        assert!(order(Cancelled).available_statuses().is_empty());
        assert!(order(Refunded).available_statuses().is_empty());
    }

    #[test]
    fn test_unknown_status_is_invalid_transition() {
        let err = OrderStateMachine::plan(&order(OrderStatus::Pending), &request("shipped", false)).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { ref requested, .. } if requested == "shipped"));
        assert!("archived".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_cancelled_to_paid_is_rejected() {
        let err = OrderStateMachine::plan(&order(OrderStatus::Cancelled), &request("paid", false))
            .unwrap_err();

        match err {
            OrderError::InvalidTransition { current, requested, available } => {
                assert_eq!(current, OrderStatus::Cancelled);
                assert_eq!(requested, "paid");
                assert!(available.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_status_lists_available() {
        let err = OrderStateMachine::plan(&order(OrderStatus::Paid), &StatusChangeRequest::default())
            .unwrap_err();

        match err {
            OrderError::MissingStatus { available, .. } => {
                assert_eq!(available, vec![OrderStatus::Cancelled, OrderStatus::Refunded]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_refund_only_applies_to_paid_cancellation() {
        let plan = OrderStateMachine::plan(&order(OrderStatus::Paid), &request("cancelled", true)).unwrap();
        assert!(plan.refund);

        let plan = OrderStateMachine::plan(&order(OrderStatus::Paid), &request("cancelled", false)).unwrap();
        assert!(!plan.refund);

        let plan = OrderStateMachine::plan(&order(OrderStatus::Pending), &request("cancelled", true)).unwrap();
        assert!(!plan.refund);

        let plan = OrderStateMachine::plan(&order(OrderStatus::Paid), &request("refunded", true)).unwrap();
        assert!(!plan.refund);
    }

    #[test]
    fn test_apply_marks_refund() {
        let mut paid = order(OrderStatus::Paid);
        let plan = OrderStateMachine::plan(&paid, &request("cancelled", true)).unwrap();
        plan.apply(&mut paid, Utc::now());

        assert_eq!(paid.status, OrderStatus::Cancelled);
        assert_eq!(paid.refund_status.as_deref(), Some(REFUND_PROCESSED));
    }
}
