use std::sync::Arc;

use avia_core::{AuthGateway, CartRepository, FlightRepository, OrderQueries, UserRepository};
use avia_order::{ChangeHandler, CheckoutWorkflow};
use avia_store::Repositories;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub cart: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderQueries>,
    pub checkout: Arc<CheckoutWorkflow>,
    pub changes: Arc<ChangeHandler>,
    pub auth: Arc<AuthGateway>,
    pub expose_internal_errors: bool,
}

impl AppState {
    pub fn new(repos: Repositories, auth: avia_core::AuthConfig, expose_internal_errors: bool) -> Self {
        Self {
            checkout: Arc::new(CheckoutWorkflow::new(repos.bookings.clone())),
            changes: Arc::new(ChangeHandler::new(repos.bookings)),
            auth: Arc::new(AuthGateway::new(auth, repos.tokens)),
            users: repos.users,
            flights: repos.flights,
            cart: repos.cart,
            orders: repos.orders,
            expose_internal_errors,
        }
    }
}
