use std::collections::BTreeMap;
use std::sync::Arc;

use avia_catalog::SeatInventory;
use avia_shared::StoreError;
use tracing::{info, warn};

use crate::models::{CartLine, IssuedTicket, NewOrder, NewTicket, OrderStatus, OrderSummary, Ticket};
use crate::repository::{BookingStore, BookingTx};
use crate::ticket_number::TicketNumberGenerator;

/// Turns a user's cart into a paid order with one ticket per cart item.
///
/// Runs in a single transaction: the order, its tickets, the seat
/// decrements and the cart deletion commit together or not at all.
/// Payment is simulated, so the order is created directly as `paid`.
pub struct CheckoutWorkflow {
    store: Arc<dyn BookingStore>,
}

impl CheckoutWorkflow {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// `account_name` is the passenger name used for cart items without one.
    pub async fn checkout(&self, user_id: i64, account_name: &str) -> Result<OrderSummary, CheckoutError> {
        let mut tx = self.store.begin().await?;

        let outcome = Self::run(tx.as_mut(), user_id, account_name).await;
        match outcome {
            Ok(summary) => {
                tx.commit().await?;
                info!(
                    order_id = summary.id,
                    user_id,
                    total = summary.total,
                    tickets = summary.tickets.len(),
                    "Checkout completed"
                );
                Ok(summary)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Checkout rollback failed: {}", rollback_err);
                }
                info!(user_id, "Checkout aborted: {}", err);
                Err(err)
            }
        }
    }

    async fn run(tx: &mut dyn BookingTx, user_id: i64, account_name: &str) -> Result<OrderSummary, CheckoutError> {
        // 1. Cart with flights
        let lines = tx.cart_lines(user_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // 2. Availability for the whole cart before anything is written
        Self::verify_availability(&lines)?;

        // 3. Total at current prices
        let total: i64 = lines
            .iter()
            .filter_map(|line| line.flight.as_ref())
            .map(|flight| flight.price)
            .sum();

        // 4. Order, paid immediately
        let order = tx
            .insert_order(NewOrder { user_id, status: OrderStatus::Paid, total })
            .await?;

        // 5. Seats and tickets
        let mut tickets = Vec::with_capacity(lines.len());
        for line in &lines {
            let flight_id = line.item.flight_id;
            if tx.reserve_seats(flight_id, 1).await?.is_none() {
                return Err(CheckoutError::SeatsUnavailable { flight_id });
            }

            let ticket = Self::issue_ticket(tx, order.id, flight_id, line.item.passenger_or(account_name)).await?;

            tickets.push(IssuedTicket {
                ticket_number: ticket.ticket_number,
                passenger: ticket.passenger_name,
            });
        }

        // 6. Empty the cart
        tx.clear_cart(user_id).await?;

        Ok(OrderSummary {
            id: order.id,
            status: order.status,
            total: order.total,
            created_at: order.created_at,
            tickets,
        })
    }

    /// Inserts a ticket under a fresh number. A number drawn concurrently by
    /// another transaction surfaces as a duplicate; one redraw follows.
    async fn issue_ticket(
        tx: &mut dyn BookingTx,
        order_id: i64,
        flight_id: i64,
        passenger_name: String,
    ) -> Result<Ticket, StoreError> {
        let mut retried = false;
        loop {
            let ticket_number = TicketNumberGenerator::generate(tx).await?;
            let ticket = NewTicket {
                order_id,
                flight_id,
                ticket_number,
                passenger_name: passenger_name.clone(),
                seat_number: None,
            };

            match tx.insert_ticket(ticket).await {
                Err(StoreError::Duplicate(field)) if field == "ticket_number" && !retried => {
                    warn!(order_id, flight_id, "Ticket number collision, drawing again");
                    retried = true;
                }
                other => return other,
            }
        }
    }

    /// Every flight must still exist and hold at least as many free seats as
    /// the cart has items on it.
    fn verify_availability(lines: &[CartLine]) -> Result<(), CheckoutError> {
        let mut demand: BTreeMap<i64, i32> = BTreeMap::new();
        for line in lines {
            *demand.entry(line.item.flight_id).or_default() += 1;
        }

        for line in lines {
            let flight_id = line.item.flight_id;
            let Some(flight) = &line.flight else {
                return Err(CheckoutError::SeatsUnavailable { flight_id });
            };
            if !SeatInventory::has_available_seats(flight, demand[&flight_id]) {
                return Err(CheckoutError::SeatsUnavailable { flight_id });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("One or more seats no longer available")]
    SeatsUnavailable { flight_id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
