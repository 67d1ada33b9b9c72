use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use avia_catalog::{FlightCategory, FlightListing, FlightSearch, FlightSearchParams};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct FlightResult {
    pub id: i64,
    pub flight_number: String,
    pub from: String,
    pub to: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub available_seats: i32,
    pub category: FlightCategory,
}

impl From<FlightListing> for FlightResult {
    fn from(listing: FlightListing) -> Self {
        let FlightListing { flight, departure, arrival } = listing;
        Self {
            id: flight.id,
            flight_number: flight.flight_number,
            from: departure.label(),
            to: arrival.label(),
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            price: flight.price,
            available_seats: flight.seats_available,
            category: flight.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub flights: Vec<FlightResult>,
    pub total: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/flights/search", get(search_flights))
}

async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<FlightSearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let search = FlightSearch::try_from(params)?;
    tracing::debug!(?search, "Searching flights");

    let flights: Vec<FlightResult> = state
        .flights
        .search(&search)
        .await?
        .into_iter()
        .map(FlightResult::from)
        .collect();

    Ok(Json(SearchResponse { total: flights.len(), flights }))
}
