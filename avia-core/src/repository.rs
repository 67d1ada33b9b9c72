use async_trait::async_trait;
use avia_catalog::{Airport, Flight, FlightListing, FlightSearch, FlightUpdate, NewFlight};
use avia_order::{CartItem, CartLine, NewCartItem, OrderOverview};
use avia_shared::RepoResult;
use chrono::{DateTime, Utc};

use crate::identity::{NewUser, User};

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `StoreError::Duplicate("phone")` when the phone is taken.
    async fn create(&self, user: NewUser) -> RepoResult<User>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;

    async fn find_by_phone(&self, phone: &str) -> RepoResult<Option<User>>;

    /// Persists the profile fields of `user`. Same duplicate rule as `create`.
    async fn update_profile(&self, user: &User) -> RepoResult<User>;
}

/// Revoked bearer tokens, kept until they would have expired anyway.
#[async_trait]
pub trait TokenBlacklistRepository: Send + Sync {
    async fn add(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> RepoResult<()>;

    /// True when a matching entry expires after `now`.
    async fn is_blacklisted(&self, token: &str, now: DateTime<Utc>) -> RepoResult<bool>;

    /// Removes entries that expired before `now`; returns how many.
    async fn clean_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightDeletion {
    Deleted,
    NotFound,
    /// A ticket on the flight belongs to a paid order.
    HasPaidOrders,
}

/// Repository trait for flight data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn find_airport_by_code(&self, code: &str) -> RepoResult<Option<Airport>>;

    async fn get(&self, id: i64) -> RepoResult<Option<Flight>>;

    async fn get_listing(&self, id: i64) -> RepoResult<Option<FlightListing>>;

    /// All flights ordered by departure time.
    async fn list(&self) -> RepoResult<Vec<FlightListing>>;

    /// Flights matching every filter of `search`, ordered by departure time.
    /// A city filter that matches no airport yields nothing.
    async fn search(&self, search: &FlightSearch) -> RepoResult<Vec<FlightListing>>;

    async fn create(&self, flight: NewFlight) -> RepoResult<Flight>;

    /// Applies a partial update under a row lock. `None` when the flight is gone.
    async fn update(&self, id: i64, update: &FlightUpdate) -> RepoResult<Option<Flight>>;

    /// Deletes the flight together with cart items pointing at it, unless a
    /// paid order holds a ticket on it.
    async fn delete_unless_paid(&self, id: i64) -> RepoResult<FlightDeletion>;
}

/// Repository trait for cart rows
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn lines(&self, user_id: i64) -> RepoResult<Vec<CartLine>>;

    async fn add(&self, item: NewCartItem) -> RepoResult<CartItem>;

    /// Deletes the item only if it belongs to `user_id`. False when nothing matched.
    async fn remove(&self, user_id: i64, item_id: i64) -> RepoResult<bool>;
}

/// Read side of orders. Writes go through `avia_order::BookingStore`.
#[async_trait]
pub trait OrderQueries: Send + Sync {
    /// Orders of one user, newest first.
    async fn list_for_user(&self, user_id: i64) -> RepoResult<Vec<OrderOverview>>;

    /// Every order with its owner's name, newest first.
    async fn list_all(&self) -> RepoResult<Vec<OrderOverview>>;
}
