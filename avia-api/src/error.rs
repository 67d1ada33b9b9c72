use std::collections::BTreeMap;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use avia_catalog::CatalogError;
use avia_core::{AuthError, CoreError};
use avia_order::{CheckoutError, OrderError, OrderStatus};
use avia_shared::StoreError;
use serde_json::{json, Map, Value};

use crate::state::AppState;

/// Field name to messages, rendered as `errors` in validation responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    BadRequest(String),
    ValidationError {
        errors: FieldErrors,
        details: Map<String, Value>,
    },
    InvalidTransition {
        current: OrderStatus,
        requested: String,
        available: Vec<OrderStatus>,
    },
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
}

/// Internal error text, carried on the response so the dev-mode middleware
/// can put it back into the body.
#[derive(Debug, Clone)]
struct InternalDetail(String);

impl AppError {
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        AppError::fields(errors)
    }

    pub fn fields(errors: FieldErrors) -> Self {
        AppError::ValidationError { errors, details: Map::new() }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

fn status_note(current: OrderStatus, available: &[OrderStatus]) -> String {
    let names: Vec<&str> = available.iter().map(OrderStatus::as_str).collect();
    format!("Available statuses for current status \"{}\": {}", current, names.join(", "))
}

pub(crate) fn error_body(status: StatusCode, message: &str, details: Map<String, Value>) -> Response {
    let mut error = Map::new();
    error.insert("code".into(), json!(status.as_u16()));
    error.insert("message".into(), json!(message));
    error.extend(details);

    (status, Json(json!({ "error": error }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, Map::new()),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg, Map::new()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Map::new()),
            AppError::ValidationError { errors, mut details } => {
                details.insert("errors".into(), json!(errors));
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation error".to_string(), details)
            }
            AppError::InvalidTransition { current, requested, available } => {
                let mut details = Map::new();
                details.insert("current_status".into(), json!(current));
                details.insert("requested_status".into(), json!(requested));
                details.insert("available_statuses".into(), json!(available));
                details.insert("note".into(), json!(status_note(current, &available)));
                (StatusCode::BAD_REQUEST, "Invalid status transition".to_string(), details)
            }
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, Map::new()),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, Map::new()),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                let mut response =
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Map::new());
                response.extensions_mut().insert(InternalDetail(msg));
                return response;
            }
        };

        error_body(status, &message, details)
    }
}

/// Rewrites 500 bodies with the underlying message when
/// `server.expose_internal_errors` is on.
pub async fn expose_internal_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let detail = response.extensions_mut().remove::<InternalDetail>();

    match detail {
        Some(InternalDetail(msg)) if state.expose_internal_errors => {
            error_body(StatusCode::INTERNAL_SERVER_ERROR, &msg, Map::new())
        }
        _ => response,
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => AppError::ConflictError(format!("Duplicate value for {}", field)),
            other => AppError::internal(other),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => AppError::BadRequest(err.to_string()),
            CheckoutError::SeatsUnavailable { .. } => AppError::ConflictError(err.to_string()),
            CheckoutError::Store(store) => AppError::internal(format!("Failed to create order: {}", store)),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_) => AppError::NotFoundError("Order not found".to_string()),
            OrderError::UnknownStatus(status) => AppError::BadRequest(format!("Unknown order status: {}", status)),
            OrderError::MissingStatus { current, available } => {
                let mut errors = FieldErrors::new();
                errors.insert("status".into(), vec!["Required".into()]);

                let mut details = Map::new();
                details.insert("available_statuses".into(), json!(available));
                details.insert("current_status".into(), json!(current));
                details.insert("note".into(), json!(status_note(current, &available)));
                AppError::ValidationError { errors, details }
            }
            OrderError::InvalidTransition { current, requested, available } => {
                AppError::InvalidTransition { current, requested, available }
            }
            OrderError::PaidOrderDeletion(_) => AppError::ConflictError(err.to_string()),
            OrderError::Store(store) => store.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden => AppError::AuthorizationError(err.to_string()),
            AuthError::Encoding(_) => AppError::internal(err),
            AuthError::Store(store) => store.into(),
            other => AppError::AuthenticationError(other.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::BadRequest(msg),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Flattens validator output into field name to messages.
pub fn field_messages(errs: &validator::ValidationErrors) -> FieldErrors {
    errs.field_errors()
        .into_iter()
        .map(|(field, list)| {
            let messages = list
                .iter()
                .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        AppError::fields(field_messages(&errs))
    }
}
