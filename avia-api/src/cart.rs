use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use avia_catalog::SeatInventory;
use avia_order::{CartItem, CartLine, NewCartItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub flight_id: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Must be at most 200 characters"))]
    pub passenger_name: String,
}

#[derive(Debug, Serialize)]
pub struct CartFlight {
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: i64,
    pub flight_id: i64,
    pub passenger_name: String,
    /// `null` once the flight has been removed from the schedule.
    pub flight: Option<CartFlight>,
}

impl From<CartLine> for CartItemView {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.item.id,
            flight_id: line.item.flight_id,
            passenger_name: line.item.passenger_name,
            flight: line.flight.map(|f| CartFlight {
                flight_number: f.flight_number,
                departure_time: f.departure_time,
                price: f.price,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct AddedItem {
    pub id: i64,
    pub flight_id: i64,
    pub passenger_name: String,
}

impl From<CartItem> for AddedItem {
    fn from(item: CartItem) -> Self {
        Self { id: item.id, flight_id: item.flight_id, passenger_name: item.passenger_name }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(list_cart).post(add_to_cart))
        .route("/cart/{id}", delete(remove_from_cart))
}

async fn list_cart(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<CartResponse>, AppError> {
    let items: Vec<CartItemView> = state
        .cart
        .lines(user.id)
        .await?
        .into_iter()
        .map(CartItemView::from)
        .collect();

    Ok(Json(CartResponse { total: items.len(), items }))
}

/// Availability is only checked here, not held; checkout re-checks it.
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(request): ApiJson<AddCartItemRequest>,
) -> Result<(StatusCode, Json<AddedItem>), AppError> {
    let flight_id = request.flight_id.ok_or_else(|| AppError::field("flight_id", "Required"))?;
    request.validate()?;

    let flight = state
        .flights
        .get(flight_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Flight not found".to_string()))?;

    if !SeatInventory::has_available_seats(&flight, 1) {
        return Err(AppError::ConflictError("No available seats".to_string()));
    }

    let passenger_name = match request.passenger_name.trim() {
        "" => user.full_name(),
        name => name.to_string(),
    };

    let item = state
        .cart
        .add(NewCartItem { user_id: user.id, flight_id, passenger_name })
        .await?;

    tracing::debug!(user_id = user.id, flight_id, item_id = item.id, "Cart item added");
    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.cart.remove(user.id, item_id).await? {
        return Err(AppError::NotFoundError("Item not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
