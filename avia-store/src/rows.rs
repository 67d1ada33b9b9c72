use avia_catalog::{Airport, Flight, FlightCategory, FlightListing};
use avia_core::{Role, User};
use avia_order::{CartItem, CartLine, Order, OrderOverview, OrderStatus, Ticket};
use avia_shared::StoreError;
use chrono::{DateTime, Utc};

/// Maps driver errors onto `StoreError`, naming the column on unique violations.
pub(crate) fn store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or("unique");
            let field = ["phone", "ticket_number", "code"]
                .into_iter()
                .find(|field| constraint.contains(field))
                .unwrap_or(constraint);
            return StoreError::Duplicate(field.to_string());
        }
    }
    StoreError::backend(err)
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("{} '{}'", what, value))
}

pub(crate) const FLIGHT_COLUMNS: &str = "f.id, f.flight_number, f.departure_airport_id, f.arrival_airport_id, \
     f.departure_time, f.arrival_time, f.price, f.seats_total, f.seats_available, f.category, \
     f.created_at, f.updated_at";

pub(crate) const LISTING_SELECT: &str = "SELECT f.id, f.flight_number, f.departure_airport_id, f.arrival_airport_id, \
     f.departure_time, f.arrival_time, f.price, f.seats_total, f.seats_available, f.category, \
     f.created_at, f.updated_at, \
     da.code AS dep_code, da.name AS dep_name, da.city AS dep_city, \
     aa.code AS arr_code, aa.name AS arr_name, aa.city AS arr_city \
     FROM flights f \
     JOIN airports da ON da.id = f.departure_airport_id \
     JOIN airports aa ON aa.id = f.arrival_airport_id";

#[derive(sqlx::FromRow)]
pub(crate) struct AirportRow {
    id: i64,
    code: String,
    name: String,
    city: String,
}

impl From<AirportRow> for Airport {
    fn from(row: AirportRow) -> Self {
        Airport { id: row.id, code: row.code, name: row.name, city: row.city }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    id: i64,
    flight_number: String,
    departure_airport_id: i64,
    arrival_airport_id: i64,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    price: i64,
    seats_total: i32,
    seats_available: i32,
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        let category: FlightCategory = row
            .category
            .parse()
            .map_err(|_| corrupt("flight category", &row.category))?;

        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            departure_airport_id: row.departure_airport_id,
            arrival_airport_id: row.arrival_airport_id,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            price: row.price,
            seats_total: row.seats_total,
            seats_available: row.seats_available,
            category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightListingRow {
    #[sqlx(flatten)]
    flight: FlightRow,
    dep_code: String,
    dep_name: String,
    dep_city: String,
    arr_code: String,
    arr_name: String,
    arr_city: String,
}

impl TryFrom<FlightListingRow> for FlightListing {
    type Error = StoreError;

    fn try_from(row: FlightListingRow) -> Result<Self, Self::Error> {
        let flight = Flight::try_from(row.flight)?;
        Ok(FlightListing {
            departure: Airport {
                id: flight.departure_airport_id,
                code: row.dep_code,
                name: row.dep_name,
                city: row.dep_city,
            },
            arrival: Airport {
                id: flight.arrival_airport_id,
                code: row.arr_code,
                name: row.arr_name,
                city: row.arr_city,
            },
            flight,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    phone: String,
    document_number: String,
    password_hash: String,
    photo_url: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|_| corrupt("user role", &row.role))?;
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            document_number: row.document_number,
            password_hash: row.password_hash,
            photo_url: row.photo_url,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct OrderRow {
    id: i64,
    user_id: i64,
    status: String,
    total: i64,
    refund_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|_| corrupt("order status", &row.status))?;

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            status,
            total: row.total,
            refund_status: row.refund_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct OrderOverviewRow {
    #[sqlx(flatten)]
    order: OrderRow,
    tickets_count: i64,
    user_name: Option<String>,
}

impl TryFrom<OrderOverviewRow> for OrderOverview {
    type Error = StoreError;

    fn try_from(row: OrderOverviewRow) -> Result<Self, Self::Error> {
        Ok(OrderOverview {
            order: Order::try_from(row.order)?,
            tickets_count: row.tickets_count,
            user_name: row.user_name,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TicketRow {
    id: i64,
    order_id: i64,
    flight_id: i64,
    ticket_number: String,
    passenger_name: String,
    seat_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            order_id: row.order_id,
            flight_id: row.flight_id,
            ticket_number: row.ticket_number,
            passenger_name: row.passenger_name,
            seat_number: row.seat_number,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CartItemRow {
    id: i64,
    user_id: i64,
    flight_id: i64,
    passenger_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            flight_id: row.flight_id,
            passenger_name: row.passenger_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Cart row left-joined with its flight; flight columns are null when the
/// flight is gone.
#[derive(sqlx::FromRow)]
pub(crate) struct CartLineRow {
    #[sqlx(flatten)]
    item: CartItemRow,
    f_flight_number: Option<String>,
    f_departure_airport_id: Option<i64>,
    f_arrival_airport_id: Option<i64>,
    f_departure_time: Option<DateTime<Utc>>,
    f_arrival_time: Option<DateTime<Utc>>,
    f_price: Option<i64>,
    f_seats_total: Option<i32>,
    f_seats_available: Option<i32>,
    f_category: Option<String>,
    f_created_at: Option<DateTime<Utc>>,
    f_updated_at: Option<DateTime<Utc>>,
}

pub(crate) const CART_LINE_SELECT: &str = "SELECT c.id, c.user_id, c.flight_id, c.passenger_name, c.created_at, c.updated_at, \
     f.flight_number AS f_flight_number, f.departure_airport_id AS f_departure_airport_id, \
     f.arrival_airport_id AS f_arrival_airport_id, f.departure_time AS f_departure_time, \
     f.arrival_time AS f_arrival_time, f.price AS f_price, f.seats_total AS f_seats_total, \
     f.seats_available AS f_seats_available, f.category AS f_category, \
     f.created_at AS f_created_at, f.updated_at AS f_updated_at \
     FROM cart_items c LEFT JOIN flights f ON f.id = c.flight_id";

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let flight = match (
            row.f_flight_number,
            row.f_departure_airport_id,
            row.f_arrival_airport_id,
            row.f_departure_time,
            row.f_arrival_time,
            row.f_price,
            row.f_seats_total,
            row.f_seats_available,
            row.f_category,
            row.f_created_at,
            row.f_updated_at,
        ) {
            (
                Some(flight_number),
                Some(departure_airport_id),
                Some(arrival_airport_id),
                Some(departure_time),
                Some(arrival_time),
                Some(price),
                Some(seats_total),
                Some(seats_available),
                Some(category),
                Some(created_at),
                Some(updated_at),
            ) => Some(Flight::try_from(FlightRow {
                id: row.item.flight_id,
                flight_number,
                departure_airport_id,
                arrival_airport_id,
                departure_time,
                arrival_time,
                price,
                seats_total,
                seats_available,
                category,
                created_at,
                updated_at,
            })?),
            _ => None,
        };

        Ok(CartLine { item: row.item.into(), flight })
    }
}

/// `%term%` for ILIKE, with the pattern metacharacters of `term` escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
