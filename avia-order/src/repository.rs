use async_trait::async_trait;
use avia_catalog::Flight;
use avia_shared::RepoResult;

use crate::models::{CartLine, NewOrder, NewTicket, Order, Ticket};

/// Opens transactional units of work for the booking workflows.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn BookingTx>>;
}

/// One transaction. Nothing written through it is visible to other
/// transactions until [`commit`](BookingTx::commit); dropping it without
/// committing discards every write.
#[async_trait]
pub trait BookingTx: Send {
    /// Cart rows of `user_id` in insertion order, each with its flight.
    async fn cart_lines(&mut self, user_id: i64) -> RepoResult<Vec<CartLine>>;

    /// Guarded decrement of `seats_available`. Returns the updated flight, or
    /// `None` when the flight is gone or has fewer than `count` seats left.
    async fn reserve_seats(&mut self, flight_id: i64, count: i32) -> RepoResult<Option<Flight>>;

    /// Increment of `seats_available` clamped to `seats_total`. `None` when the
    /// flight no longer exists.
    async fn release_seats(&mut self, flight_id: i64, count: i32) -> RepoResult<Option<Flight>>;

    async fn insert_order(&mut self, order: NewOrder) -> RepoResult<Order>;

    async fn ticket_number_exists(&mut self, ticket_number: &str) -> RepoResult<bool>;

    async fn insert_ticket(&mut self, ticket: NewTicket) -> RepoResult<Ticket>;

    async fn clear_cart(&mut self, user_id: i64) -> RepoResult<u64>;

    /// Loads an order and holds it against concurrent changes until the end
    /// of the transaction.
    async fn lock_order(&mut self, order_id: i64) -> RepoResult<Option<Order>>;

    async fn order_tickets(&mut self, order_id: i64) -> RepoResult<Vec<Ticket>>;

    /// Persists `status`, `refund_status` and `updated_at` of `order`.
    async fn save_order_status(&mut self, order: &Order) -> RepoResult<()>;

    /// Removes the order and its tickets.
    async fn delete_order(&mut self, order_id: i64) -> RepoResult<()>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;

    async fn rollback(self: Box<Self>) -> RepoResult<()>;
}
