use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use avia_catalog::{Airport, Flight, FlightListing, FlightSearch, FlightUpdate, NewFlight, SeatInventory};
use avia_core::{
    CartRepository, FlightDeletion, FlightRepository, NewUser, OrderQueries, TokenBlacklistRepository, User,
    UserRepository,
};
use avia_order::{
    BookingStore, BookingTx, CartItem, CartLine, NewCartItem, NewOrder, NewTicket, Order, OrderOverview, OrderStatus,
    Ticket,
};
use avia_shared::{RepoResult, StoreError};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Airports available in a fresh store, matching the migration seed.
pub const DEFAULT_AIRPORTS: [(&str, &str, &str); 5] = [
    ("SVO", "Sheremetyevo", "Moscow"),
    ("DME", "Domodedovo", "Moscow"),
    ("LED", "Pulkovo", "Saint Petersburg"),
    ("AER", "Sochi International", "Sochi"),
    ("KZN", "Kazan International", "Kazan"),
];

#[derive(Debug, Clone)]
struct BlacklistEntry {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    users: BTreeMap<i64, User>,
    airports: BTreeMap<i64, Airport>,
    flights: BTreeMap<i64, Flight>,
    cart: BTreeMap<i64, CartItem>,
    orders: BTreeMap<i64, Order>,
    tickets: BTreeMap<i64, Ticket>,
    ticket_numbers: BTreeSet<String>,
    blacklist: Vec<BlacklistEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn listing(&self, flight: &Flight) -> RepoResult<FlightListing> {
        let airport = |id: i64| {
            self.airports
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::Corrupt(format!("flight {} references missing airport {}", flight.id, id)))
        };

        Ok(FlightListing {
            flight: flight.clone(),
            departure: airport(flight.departure_airport_id)?,
            arrival: airport(flight.arrival_airport_id)?,
        })
    }

    fn cart_lines(&self, user_id: i64) -> Vec<CartLine> {
        self.cart
            .values()
            .filter(|item| item.user_id == user_id)
            .map(|item| CartLine {
                item: item.clone(),
                flight: self.flights.get(&item.flight_id).cloned(),
            })
            .collect()
    }

    fn phone_taken(&self, phone: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|user| user.phone == phone && Some(user.id) != except)
    }

    fn overviews<F>(&self, filter: F) -> Vec<OrderOverview>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<OrderOverview> = self
            .orders
            .values()
            .filter(|order| filter(*order))
            .map(|order| OrderOverview {
                order: order.clone(),
                tickets_count: self.tickets.values().filter(|t| t.order_id == order.id).count() as i64,
                user_name: self.users.get(&order.user_id).map(User::full_name),
            })
            .collect();

        orders.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.order.id.cmp(&a.order.id))
        });
        orders
    }
}

/// Process-local store with the same transactional semantics as Postgres.
///
/// A booking transaction holds the store lock from `begin` until commit or
/// rollback and works on a private copy, so uncommitted writes are never
/// visible and concurrent transactions run one after another.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        for (code, name, city) in DEFAULT_AIRPORTS {
            let id = state.next_id();
            state.airports.insert(
                id,
                Airport { id, code: code.to_string(), name: name.to_string(), city: city.to_string() },
            );
        }

        Self { state: Arc::new(Mutex::new(state)) }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let mut state = self.state.lock().await;
        if state.phone_taken(&user.phone, None) {
            return Err(StoreError::Duplicate("phone".into()));
        }

        let id = state.next_id();
        let user = user.into_user(id, Utc::now());
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> RepoResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|user| user.phone == phone).cloned())
    }

    async fn update_profile(&self, user: &User) -> RepoResult<User> {
        let mut state = self.state.lock().await;
        if state.phone_taken(&user.phone, Some(user.id)) {
            return Err(StoreError::Duplicate("phone".into()));
        }

        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} vanished", user.id)))?;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.phone = user.phone.clone();
        stored.document_number = user.document_number.clone();
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }
}

#[async_trait]
impl TokenBlacklistRepository for MemoryStore {
    async fn add(&self, token: &str, _user_id: i64, expires_at: DateTime<Utc>) -> RepoResult<()> {
        self.state
            .lock()
            .await
            .blacklist
            .push(BlacklistEntry { token: token.to_string(), expires_at });
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str, now: DateTime<Utc>) -> RepoResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .blacklist
            .iter()
            .any(|entry| entry.token == token && entry.expires_at > now))
    }

    async fn clean_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.blacklist.len();
        state.blacklist.retain(|entry| entry.expires_at >= now);
        Ok((before - state.blacklist.len()) as u64)
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn find_airport_by_code(&self, code: &str) -> RepoResult<Option<Airport>> {
        let state = self.state.lock().await;
        Ok(state.airports.values().find(|a| a.code == code).cloned())
    }

    async fn get(&self, id: i64) -> RepoResult<Option<Flight>> {
        Ok(self.state.lock().await.flights.get(&id).cloned())
    }

    async fn get_listing(&self, id: i64) -> RepoResult<Option<FlightListing>> {
        let state = self.state.lock().await;
        state.flights.get(&id).map(|flight| state.listing(flight)).transpose()
    }

    async fn list(&self) -> RepoResult<Vec<FlightListing>> {
        let state = self.state.lock().await;
        let mut flights: Vec<&Flight> = state.flights.values().collect();
        flights.sort_by_key(|f| (f.departure_time, f.id));
        flights.into_iter().map(|f| state.listing(f)).collect()
    }

    async fn search(&self, search: &FlightSearch) -> RepoResult<Vec<FlightListing>> {
        let state = self.state.lock().await;
        let mut results = Vec::new();
        for flight in state.flights.values() {
            let listing = state.listing(flight)?;
            if search.matches(&listing.flight, &listing.departure, &listing.arrival) {
                results.push(listing);
            }
        }
        results.sort_by_key(|l| (l.flight.departure_time, l.flight.id));
        Ok(results)
    }

    async fn create(&self, flight: NewFlight) -> RepoResult<Flight> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let flight = flight.into_flight(id, Utc::now());
        state.flights.insert(id, flight.clone());
        Ok(flight)
    }

    async fn update(&self, id: i64, update: &FlightUpdate) -> RepoResult<Option<Flight>> {
        let mut state = self.state.lock().await;
        Ok(state.flights.get_mut(&id).map(|flight| {
            update.apply(flight, Utc::now());
            flight.clone()
        }))
    }

    async fn delete_unless_paid(&self, id: i64) -> RepoResult<FlightDeletion> {
        let mut state = self.state.lock().await;
        if !state.flights.contains_key(&id) {
            return Ok(FlightDeletion::NotFound);
        }

        let has_paid = state.tickets.values().any(|ticket| {
            ticket.flight_id == id
                && state
                    .orders
                    .get(&ticket.order_id)
                    .is_some_and(|order| order.status == OrderStatus::Paid)
        });
        if has_paid {
            return Ok(FlightDeletion::HasPaidOrders);
        }

        state.cart.retain(|_, item| item.flight_id != id);
        state.flights.remove(&id);
        Ok(FlightDeletion::Deleted)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn lines(&self, user_id: i64) -> RepoResult<Vec<CartLine>> {
        Ok(self.state.lock().await.cart_lines(user_id))
    }

    async fn add(&self, item: NewCartItem) -> RepoResult<CartItem> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let item = item.into_item(id, Utc::now());
        state.cart.insert(id, item.clone());
        Ok(item)
    }

    async fn remove(&self, user_id: i64, item_id: i64) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        let owned = state.cart.get(&item_id).is_some_and(|item| item.user_id == user_id);
        if owned {
            state.cart.remove(&item_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl OrderQueries for MemoryStore {
    async fn list_for_user(&self, user_id: i64) -> RepoResult<Vec<OrderOverview>> {
        Ok(self.state.lock().await.overviews(|order| order.user_id == user_id))
    }

    async fn list_all(&self) -> RepoResult<Vec<OrderOverview>> {
        Ok(self.state.lock().await.overviews(|_| true))
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> RepoResult<Box<dyn BookingTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn cart_lines(&mut self, user_id: i64) -> RepoResult<Vec<CartLine>> {
        Ok(self.work.cart_lines(user_id))
    }

    async fn reserve_seats(&mut self, flight_id: i64, count: i32) -> RepoResult<Option<Flight>> {
        let Some(flight) = self.work.flights.get_mut(&flight_id) else {
            return Ok(None);
        };
        Ok(SeatInventory::reserve(flight, count).ok().map(|()| {
            flight.updated_at = Utc::now();
            flight.clone()
        }))
    }

    async fn release_seats(&mut self, flight_id: i64, count: i32) -> RepoResult<Option<Flight>> {
        Ok(self.work.flights.get_mut(&flight_id).map(|flight| {
            SeatInventory::release(flight, count);
            flight.updated_at = Utc::now();
            flight.clone()
        }))
    }

    async fn insert_order(&mut self, order: NewOrder) -> RepoResult<Order> {
        let id = self.work.next_id();
        let order = order.into_order(id, Utc::now());
        self.work.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn ticket_number_exists(&mut self, ticket_number: &str) -> RepoResult<bool> {
        Ok(self.work.ticket_numbers.contains(ticket_number))
    }

    async fn insert_ticket(&mut self, ticket: NewTicket) -> RepoResult<Ticket> {
        if !self.work.ticket_numbers.insert(ticket.ticket_number.clone()) {
            return Err(StoreError::Duplicate("ticket_number".into()));
        }

        let id = self.work.next_id();
        let ticket = ticket.into_ticket(id, Utc::now());
        self.work.tickets.insert(id, ticket.clone());
        Ok(ticket)
    }

    async fn clear_cart(&mut self, user_id: i64) -> RepoResult<u64> {
        let before = self.work.cart.len();
        self.work.cart.retain(|_, item| item.user_id != user_id);
        Ok((before - self.work.cart.len()) as u64)
    }

    async fn lock_order(&mut self, order_id: i64) -> RepoResult<Option<Order>> {
        Ok(self.work.orders.get(&order_id).cloned())
    }

    async fn order_tickets(&mut self, order_id: i64) -> RepoResult<Vec<Ticket>> {
        Ok(self
            .work
            .tickets
            .values()
            .filter(|ticket| ticket.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn save_order_status(&mut self, order: &Order) -> RepoResult<()> {
        let stored = self
            .work
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::Corrupt(format!("order {} vanished", order.id)))?;
        stored.status = order.status;
        stored.refund_status = order.refund_status.clone();
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn delete_order(&mut self, order_id: i64) -> RepoResult<()> {
        let MemoryState { tickets, ticket_numbers, orders, .. } = &mut self.work;
        tickets.retain(|_, ticket| {
            if ticket.order_id == order_id {
                ticket_numbers.remove(&ticket.ticket_number);
                false
            } else {
                true
            }
        });
        orders.remove(&order_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        Ok(())
    }
}
