use axum::{
    http::{header, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod orders;
pub mod profile;
pub mod search;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT]);

    let public = Router::new().merge(auth::routes()).merge(search::routes());

    let authenticated = Router::new()
        .merge(auth::session_routes())
        .merge(profile::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::require_user));

    // Layers run bottom-up: the user is resolved before the role check.
    let admin = admin::routes()
        .route_layer(from_fn(middleware::require_admin))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_user));

    Router::new()
        .nest("/api", public.merge(authenticated).merge(admin))
        .layer(from_fn_with_state(state.clone(), error::expose_internal_errors))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
