use async_trait::async_trait;
use avia_catalog::{Airport, Flight, FlightListing, FlightSearch, FlightUpdate, NewFlight};
use avia_core::{FlightDeletion, FlightRepository};
use avia_shared::RepoResult;
use chrono::Utc;
use sqlx::PgPool;

use crate::rows::{contains_pattern, store_err, AirportRow, FlightListingRow, FlightRow, FLIGHT_COLUMNS, LISTING_SELECT};

pub struct PostgresFlightRepository {
    pool: PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn listings(rows: Vec<FlightListingRow>) -> RepoResult<Vec<FlightListing>> {
    rows.into_iter().map(FlightListing::try_from).collect()
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn find_airport_by_code(&self, code: &str) -> RepoResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>("SELECT id, code, name, city FROM airports WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(row.map(Airport::from))
    }

    async fn get(&self, id: i64) -> RepoResult<Option<Flight>> {
        let sql = format!("SELECT {} FROM flights f WHERE f.id = $1", FLIGHT_COLUMNS);
        sqlx::query_as::<_, FlightRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Flight::try_from)
            .transpose()
    }

    async fn get_listing(&self, id: i64) -> RepoResult<Option<FlightListing>> {
        let sql = format!("{} WHERE f.id = $1", LISTING_SELECT);
        sqlx::query_as::<_, FlightListingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(FlightListing::try_from)
            .transpose()
    }

    async fn list(&self) -> RepoResult<Vec<FlightListing>> {
        let sql = format!("{} ORDER BY f.departure_time, f.id", LISTING_SELECT);
        let rows = sqlx::query_as::<_, FlightListingRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        listings(rows)
    }

    async fn search(&self, search: &FlightSearch) -> RepoResult<Vec<FlightListing>> {
        let (day_start, day_end) = search.departure_window().unzip();
        let sql = format!(
            "{} WHERE f.seats_available >= $1 \
             AND ($2::text IS NULL OR da.city ILIKE $2) \
             AND ($3::text IS NULL OR aa.city ILIKE $3) \
             AND ($4::timestamptz IS NULL OR f.departure_time >= $4) \
             AND ($5::timestamptz IS NULL OR f.departure_time < $5) \
             AND ($6::text IS NULL OR f.category = $6) \
             ORDER BY f.departure_time, f.id",
            LISTING_SELECT
        );

        let rows = sqlx::query_as::<_, FlightListingRow>(&sql)
            .bind(search.passengers)
            .bind(search.from_city.as_deref().map(contains_pattern))
            .bind(search.to_city.as_deref().map(contains_pattern))
            .bind(day_start)
            .bind(day_end)
            .bind(search.category.map(|c| c.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        tracing::debug!(results = rows.len(), "Flight search executed");
        listings(rows)
    }

    async fn create(&self, flight: NewFlight) -> RepoResult<Flight> {
        let sql = format!(
            "INSERT INTO flights AS f (flight_number, departure_airport_id, arrival_airport_id, departure_time, \
             arrival_time, price, seats_total, seats_available, category) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8) RETURNING {}",
            FLIGHT_COLUMNS
        );

        let row = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(&flight.flight_number)
            .bind(flight.departure_airport_id)
            .bind(flight.arrival_airport_id)
            .bind(flight.departure_time)
            .bind(flight.arrival_time)
            .bind(flight.price)
            .bind(flight.seats_total)
            .bind(flight.category.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Flight::try_from(row)
    }

    async fn update(&self, id: i64, update: &FlightUpdate) -> RepoResult<Option<Flight>> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let select = format!("SELECT {} FROM flights f WHERE f.id = $1 FOR UPDATE", FLIGHT_COLUMNS);
        let Some(row) = sqlx::query_as::<_, FlightRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?
        else {
            return Ok(None);
        };

        let mut flight = Flight::try_from(row)?;
        update.apply(&mut flight, Utc::now());

        sqlx::query(
            "UPDATE flights SET price = $2, seats_total = $3, seats_available = $4, departure_time = $5, \
             arrival_time = $6, category = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(flight.id)
        .bind(flight.price)
        .bind(flight.seats_total)
        .bind(flight.seats_available)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.category.as_str())
        .bind(flight.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(Some(flight))
    }

    async fn delete_unless_paid(&self, id: i64) -> RepoResult<FlightDeletion> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM flights WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;
        if exists.is_none() {
            return Ok(FlightDeletion::NotFound);
        }

        let has_paid: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tickets t JOIN orders o ON o.id = t.order_id \
             WHERE t.flight_id = $1 AND o.status = 'paid')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;
        if has_paid {
            return Ok(FlightDeletion::HasPaidOrders);
        }

        sqlx::query("DELETE FROM cart_items WHERE flight_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(FlightDeletion::Deleted)
    }
}
