pub mod app_config;
pub mod database;
mod rows;
pub mod flight_repo;
pub mod cart_repo;
pub mod order_repo;
pub mod user_repo;
pub mod token_repo;
pub mod memory;

use std::sync::Arc;

use avia_core::{CartRepository, FlightRepository, OrderQueries, TokenBlacklistRepository, UserRepository};
use avia_order::BookingStore;
use avia_shared::StoreError;
use sqlx::PgPool;

pub use app_config::Config;
pub use database::DbClient;
pub use memory::MemoryStore;

/// Every repository the API needs, behind trait objects so the backend is
/// chosen once at startup.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenBlacklistRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub cart: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderQueries>,
    pub bookings: Arc<dyn BookingStore>,
}

impl Repositories {
    pub fn in_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            tokens: store.clone(),
            flights: store.clone(),
            cart: store.clone(),
            orders: store.clone(),
            bookings: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(user_repo::PostgresUserRepository::new(pool.clone())),
            tokens: Arc::new(token_repo::PostgresTokenBlacklist::new(pool.clone())),
            flights: Arc::new(flight_repo::PostgresFlightRepository::new(pool.clone())),
            cart: Arc::new(cart_repo::PostgresCartRepository::new(pool.clone())),
            orders: Arc::new(order_repo::StoreOrderRepository::new(pool.clone())),
            bookings: Arc::new(order_repo::PostgresBookingStore::new(pool)),
        }
    }

    /// Builds the backend selected by `database.in_memory`, running migrations
    /// when connecting to Postgres.
    pub async fn connect(config: &app_config::DatabaseConfig) -> Result<Self, StoreError> {
        if config.in_memory {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            return Ok(Self::in_memory(MemoryStore::new()));
        }

        let db = DbClient::new(config).await.map_err(StoreError::backend)?;
        db.migrate().await.map_err(StoreError::backend)?;
        tracing::info!("Connected to Postgres");
        Ok(Self::postgres(db.pool))
    }
}
