use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::models::{Order, OrderStatus};
use crate::repository::{BookingStore, BookingTx};
use crate::status::{OrderError, OrderStateMachine, StatusChangeRequest};

/// Who is asking for an order change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    /// A customer may only touch their own orders; anything else looks missing.
    Customer(i64),
}

impl Actor {
    fn can_see(&self, order: &Order) -> bool {
        match self {
            Actor::Admin => true,
            Actor::Customer(user_id) => order.user_id == *user_id,
        }
    }
}

/// Applies status changes and deletions to existing orders, one transaction each.
pub struct ChangeHandler {
    store: Arc<dyn BookingStore>,
}

impl ChangeHandler {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Moves an order along the transition table. A refunded cancellation of
    /// a paid order releases one seat per ticket in the same transaction.
    pub async fn change_status(
        &self,
        order_id: i64,
        actor: Actor,
        request: &StatusChangeRequest,
    ) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::apply_status(tx.as_mut(), order_id, actor, request).await;
        Self::finish(tx, outcome).await
    }

    /// Removes a non-paid order and its tickets.
    pub async fn delete_order(&self, order_id: i64) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::apply_delete(tx.as_mut(), order_id).await;
        Self::finish(tx, outcome).await
    }

    async fn apply_status(
        tx: &mut dyn BookingTx,
        order_id: i64,
        actor: Actor,
        request: &StatusChangeRequest,
    ) -> Result<Order, OrderError> {
        let mut order = tx
            .lock_order(order_id)
            .await?
            .filter(|order| actor.can_see(order))
            .ok_or(OrderError::NotFound(order_id))?;

        let plan = OrderStateMachine::plan(&order, request)?;

        if plan.refund {
            for ticket in tx.order_tickets(order.id).await? {
                if tx.release_seats(ticket.flight_id, 1).await?.is_none() {
                    warn!(
                        order_id,
                        flight_id = ticket.flight_id,
                        "Flight no longer exists, seat not released"
                    );
                }
            }
        }

        plan.apply(&mut order, Utc::now());
        tx.save_order_status(&order).await?;

        info!(
            order_id,
            from = %plan.from,
            to = %plan.to,
            refund = plan.refund,
            ?actor,
            "Order status changed"
        );
        Ok(order)
    }

    async fn apply_delete(tx: &mut dyn BookingTx, order_id: i64) -> Result<Order, OrderError> {
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        if order.status == OrderStatus::Paid {
            return Err(OrderError::PaidOrderDeletion(order_id));
        }

        tx.delete_order(order_id).await?;
        info!(order_id, status = %order.status, "Order deleted");
        Ok(order)
    }

    async fn finish(tx: Box<dyn BookingTx>, outcome: Result<Order, OrderError>) -> Result<Order, OrderError> {
        match outcome {
            Ok(order) => {
                tx.commit().await?;
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Order change rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
