use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use avia_catalog::{Airport, Flight, FlightCategory, FlightListing, FlightUpdate, NewFlight};
use avia_core::FlightDeletion;
use avia_order::{Actor, OrderOverview, OrderStatus, StatusChangeRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{field_messages, AppError, FieldErrors};
use crate::extract::ApiJson;
use crate::orders::OrderChangeResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateFlightRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "Must be between 1 and 20 characters"))]
    pub flight_number: String,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Must be no less than 0"))]
    pub price: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Must be no less than 0"))]
    pub seats_total: i32,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFlightRequest {
    #[validate(range(min = 0, message = "Must be no less than 0"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "Must be no less than 0"))]
    pub seats_total: Option<i32>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminFlight {
    pub id: i64,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub seats_total: i32,
    pub seats_available: i32,
    pub category: FlightCategory,
}

impl From<FlightListing> for AdminFlight {
    fn from(listing: FlightListing) -> Self {
        let FlightListing { flight, departure, arrival } = listing;
        Self {
            id: flight.id,
            flight_number: flight.flight_number,
            departure_airport: departure.code,
            arrival_airport: arrival.code,
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            price: flight.price,
            seats_total: flight.seats_total,
            seats_available: flight.seats_available,
            category: flight.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminFlightResponse {
    pub flight: AdminFlight,
}

#[derive(Debug, Serialize)]
pub struct AdminFlightList {
    pub flights: Vec<AdminFlight>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FlightCapacity {
    pub id: i64,
    pub price: i64,
    pub seats_total: i32,
    pub seats_available: i32,
}

impl From<Flight> for FlightCapacity {
    fn from(flight: Flight) -> Self {
        Self {
            id: flight.id,
            price: flight.price,
            seats_total: flight.seats_total,
            seats_available: flight.seats_available,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlightCapacityResponse {
    pub flight: FlightCapacity,
}

#[derive(Debug, Serialize)]
pub struct AdminOrder {
    pub id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub status: OrderStatus,
    pub total: i64,
    pub refund_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tickets_count: i64,
}

impl From<OrderOverview> for AdminOrder {
    fn from(overview: OrderOverview) -> Self {
        let order = overview.order;
        Self {
            id: order.id,
            user_id: order.user_id,
            user_name: overview.user_name,
            status: order.status,
            total: order.total,
            refund_status: order.refund_status,
            created_at: order.created_at,
            tickets_count: overview.tickets_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminOrderList {
    pub orders: Vec<AdminOrder>,
    pub total: usize,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/flights", get(list_flights).post(create_flight))
        .route("/admin/flights/{id}", patch(update_flight).delete(delete_flight))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/{id}", patch(change_order_status).delete(delete_order))
}

fn flight_not_found() -> AppError {
    AppError::NotFoundError("Flight not found".to_string())
}

fn parse_category(raw: Option<&str>, errors: &mut FieldErrors) -> Option<FlightCategory> {
    let raw = raw?;
    match raw.parse() {
        Ok(category) => Some(category),
        Err(_) => {
            errors.insert("category".into(), vec!["Category is invalid".into()]);
            None
        }
    }
}

fn into_result(errors: FieldErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::fields(errors))
    }
}

// ============================================================================
// Flights
// ============================================================================

async fn list_flights(State(state): State<AppState>) -> Result<Json<AdminFlightList>, AppError> {
    let flights: Vec<AdminFlight> = state.flights.list().await?.into_iter().map(AdminFlight::from).collect();
    Ok(Json(AdminFlightList { total: flights.len(), flights }))
}

async fn find_airport(state: &AppState, field: &str, code: Option<&str>) -> Result<Airport, AppError> {
    let code = code.map(str::trim).filter(|c| !c.is_empty());
    let Some(code) = code else {
        return Err(AppError::field(field, "Required"));
    };

    state
        .flights
        .find_airport_by_code(code)
        .await?
        .ok_or_else(|| AppError::field(field, "Airport not found"))
}

async fn create_flight(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateFlightRequest>,
) -> Result<(StatusCode, Json<AdminFlightResponse>), AppError> {
    // Airports are resolved first; an unknown code is reported on its own.
    let departure = find_airport(&state, "departure_airport", request.departure_airport.as_deref()).await?;
    let arrival = find_airport(&state, "arrival_airport", request.arrival_airport.as_deref()).await?;

    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errs) => field_messages(&errs),
    };
    if request.departure_time.is_none() {
        errors.insert("departure_time".into(), vec!["Required".into()]);
    }
    if request.arrival_time.is_none() {
        errors.insert("arrival_time".into(), vec!["Required".into()]);
    }
    let category = parse_category(request.category.as_deref(), &mut errors).unwrap_or_default();
    into_result(errors)?;

    let (Some(departure_time), Some(arrival_time)) = (request.departure_time, request.arrival_time) else {
        return Err(AppError::field("departure_time", "Required"));
    };

    let flight = state
        .flights
        .create(NewFlight {
            flight_number: request.flight_number.trim().to_string(),
            departure_airport_id: departure.id,
            arrival_airport_id: arrival.id,
            departure_time,
            arrival_time,
            price: request.price,
            seats_total: request.seats_total,
            category,
        })
        .await?;

    tracing::info!(flight_id = flight.id, flight_number = %flight.flight_number, "Flight created");
    let listing = FlightListing { flight, departure, arrival };
    Ok((StatusCode::CREATED, Json(AdminFlightResponse { flight: listing.into() })))
}

async fn update_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<i64>,
    ApiJson(request): ApiJson<UpdateFlightRequest>,
) -> Result<Json<FlightCapacityResponse>, AppError> {
    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errs) => field_messages(&errs),
    };
    let category = parse_category(request.category.as_deref(), &mut errors);
    into_result(errors)?;

    let update = FlightUpdate {
        price: request.price,
        seats_total: request.seats_total,
        departure_time: request.departure_time,
        arrival_time: request.arrival_time,
        category,
    };

    let flight = state.flights.update(flight_id, &update).await?.ok_or_else(flight_not_found)?;

    tracing::info!(flight_id, seats_available = flight.seats_available, "Flight updated");
    Ok(Json(FlightCapacityResponse { flight: flight.into() }))
}

async fn delete_flight(State(state): State<AppState>, Path(flight_id): Path<i64>) -> Result<StatusCode, AppError> {
    match state.flights.delete_unless_paid(flight_id).await? {
        FlightDeletion::Deleted => {
            tracing::info!(flight_id, "Flight deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        FlightDeletion::NotFound => Err(flight_not_found()),
        FlightDeletion::HasPaidOrders => {
            Err(AppError::ConflictError("Cannot delete flight with paid orders".to_string()))
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

async fn list_orders(State(state): State<AppState>) -> Result<Json<AdminOrderList>, AppError> {
    let orders: Vec<AdminOrder> = state.orders.list_all().await?.into_iter().map(AdminOrder::from).collect();
    Ok(Json(AdminOrderList { total: orders.len(), orders }))
}

async fn change_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    ApiJson(request): ApiJson<StatusChangeRequest>,
) -> Result<Json<OrderChangeResponse>, AppError> {
    let order = state.changes.change_status(order_id, Actor::Admin, &request).await?;
    Ok(Json(OrderChangeResponse { order: order.into() }))
}

async fn delete_order(State(state): State<AppState>, Path(order_id): Path<i64>) -> Result<StatusCode, AppError> {
    state.changes.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
