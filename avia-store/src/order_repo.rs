use async_trait::async_trait;
use avia_catalog::Flight;
use avia_core::OrderQueries;
use avia_order::{BookingStore, BookingTx, CartLine, NewOrder, NewTicket, Order, OrderOverview, Ticket};
use avia_shared::{RepoResult, StoreError};
use sqlx::{PgPool, Postgres, Transaction};

use crate::rows::{store_err, CartLineRow, FlightRow, OrderOverviewRow, OrderRow, TicketRow, CART_LINE_SELECT, FLIGHT_COLUMNS};

const ORDER_COLUMNS: &str = "id, user_id, status, total, refund_status, created_at, updated_at";
const TICKET_COLUMNS: &str = "id, order_id, flight_id, ticket_number, passenger_name, seat_number, created_at";

const OVERVIEW_SELECT: &str = "SELECT o.id, o.user_id, o.status, o.total, o.refund_status, o.created_at, o.updated_at, \
     (SELECT COUNT(*) FROM tickets t WHERE t.order_id = o.id) AS tickets_count, \
     u.first_name || ' ' || u.last_name AS user_name \
     FROM orders o LEFT JOIN users u ON u.id = o.user_id";

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn overviews(&self, sql: &str, user_id: Option<i64>) -> RepoResult<Vec<OrderOverview>> {
        let mut query = sqlx::query_as::<_, OrderOverviewRow>(sql);
        if let Some(user_id) = user_id {
            query = query.bind(user_id);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(OrderOverview::try_from)
            .collect()
    }
}

#[async_trait]
impl OrderQueries for StoreOrderRepository {
    async fn list_for_user(&self, user_id: i64) -> RepoResult<Vec<OrderOverview>> {
        let sql = format!("{} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC", OVERVIEW_SELECT);
        self.overviews(&sql, Some(user_id)).await
    }

    async fn list_all(&self) -> RepoResult<Vec<OrderOverview>> {
        let sql = format!("{} ORDER BY o.created_at DESC, o.id DESC", OVERVIEW_SELECT);
        self.overviews(&sql, None).await
    }
}

/// Postgres unit of work for checkout and order status changes.
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn begin(&self) -> RepoResult<Box<dyn BookingTx>> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(Box::new(PostgresBookingTx { tx }))
    }
}

pub struct PostgresBookingTx {
    tx: Transaction<'static, Postgres>,
}

impl PostgresBookingTx {
    async fn flight_update(&mut self, sql: &str, flight_id: i64, count: i32) -> RepoResult<Option<Flight>> {
        sqlx::query_as::<_, FlightRow>(sql)
            .bind(flight_id)
            .bind(count)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?
            .map(Flight::try_from)
            .transpose()
    }
}

#[async_trait]
impl BookingTx for PostgresBookingTx {
    async fn cart_lines(&mut self, user_id: i64) -> RepoResult<Vec<CartLine>> {
        // Rows stay locked until commit so a concurrent checkout of the same
        // cart waits and then finds it empty.
        let sql = format!("{} WHERE c.user_id = $1 ORDER BY c.id FOR UPDATE OF c", CART_LINE_SELECT);
        sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(CartLine::try_from)
            .collect()
    }

    async fn reserve_seats(&mut self, flight_id: i64, count: i32) -> RepoResult<Option<Flight>> {
        let sql = format!(
            "UPDATE flights AS f SET seats_available = f.seats_available - $2, updated_at = NOW() \
             WHERE f.id = $1 AND $2 > 0 AND f.seats_available >= $2 RETURNING {}",
            FLIGHT_COLUMNS
        );
        self.flight_update(&sql, flight_id, count).await
    }

    async fn release_seats(&mut self, flight_id: i64, count: i32) -> RepoResult<Option<Flight>> {
        let sql = format!(
            "UPDATE flights AS f SET seats_available = LEAST(f.seats_total, f.seats_available + GREATEST($2, 0)), \
             updated_at = NOW() WHERE f.id = $1 RETURNING {}",
            FLIGHT_COLUMNS
        );
        self.flight_update(&sql, flight_id, count).await
    }

    async fn insert_order(&mut self, order: NewOrder) -> RepoResult<Order> {
        let sql = format!(
            "INSERT INTO orders (user_id, status, total) VALUES ($1, $2, $3) RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.user_id)
            .bind(order.status.as_str())
            .bind(order.total)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_err)?;

        Order::try_from(row)
    }

    async fn ticket_number_exists(&mut self, ticket_number: &str) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tickets WHERE ticket_number = $1)")
            .bind(ticket_number)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_err)
    }

    async fn insert_ticket(&mut self, ticket: NewTicket) -> RepoResult<Ticket> {
        let sql = format!(
            "INSERT INTO tickets (order_id, flight_id, ticket_number, passenger_name, seat_number) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (ticket_number) DO NOTHING RETURNING {}",
            TICKET_COLUMNS
        );
        // A conflict yields no row instead of aborting the transaction.
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(ticket.order_id)
            .bind(ticket.flight_id)
            .bind(&ticket.ticket_number)
            .bind(&ticket.passenger_name)
            .bind(&ticket.seat_number)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?
            .ok_or_else(|| StoreError::Duplicate("ticket_number".into()))?;

        Ok(row.into())
    }

    async fn clear_cart(&mut self, user_id: i64) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    async fn lock_order(&mut self, order_id: i64) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?
            .map(Order::try_from)
            .transpose()
    }

    async fn order_tickets(&mut self, order_id: i64) -> RepoResult<Vec<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE order_id = $1 ORDER BY id", TICKET_COLUMNS);
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn save_order_status(&mut self, order: &Order) -> RepoResult<()> {
        sqlx::query("UPDATE orders SET status = $2, refund_status = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id)
            .bind(order.status.as_str())
            .bind(&order.refund_status)
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_order(&mut self, order_id: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM tickets WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await.map_err(store_err)
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        self.tx.rollback().await.map_err(store_err)
    }
}
