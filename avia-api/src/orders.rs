use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use avia_order::{Actor, Order, OrderOverview, OrderStatus, OrderSummary, StatusChangeRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct OrderListItem {
    pub id: i64,
    pub status: OrderStatus,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub tickets_count: i64,
}

impl From<OrderOverview> for OrderListItem {
    fn from(overview: OrderOverview) -> Self {
        let order = overview.order;
        Self {
            id: order.id,
            status: order.status,
            total: order.total,
            created_at: order.created_at,
            tickets_count: overview.tickets_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderListItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderSummary,
}

/// Result of a status change, shared with the admin routes.
#[derive(Debug, Serialize)]
pub struct OrderChange {
    pub id: i64,
    pub status: OrderStatus,
    pub refund_status: Option<String>,
}

impl From<Order> for OrderChange {
    fn from(order: Order) -> Self {
        Self { id: order.id, status: order.status, refund_status: order.refund_status }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderChangeResponse {
    pub order: OrderChange,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/checkout", post(checkout))
        .route("/orders/{id}", patch(change_status))
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<OrderListResponse>, AppError> {
    let orders = state
        .orders
        .list_for_user(user.id)
        .await?
        .into_iter()
        .map(OrderListItem::from)
        .collect();

    Ok(Json(OrderListResponse { orders }))
}

async fn checkout(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let order = state.checkout.checkout(user.id, &user.full_name()).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { order })))
}

async fn change_status(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
    ApiJson(request): ApiJson<StatusChangeRequest>,
) -> Result<Json<OrderChangeResponse>, AppError> {
    let order = state
        .changes
        .change_status(order_id, Actor::Customer(user.id), &request)
        .await?;

    Ok(Json(OrderChangeResponse { order: order.into() }))
}
