pub mod identity;
pub mod auth;
pub mod repository;

pub use auth::{bearer_token, AdminAuthorizer, AuthConfig, AuthError, AuthGateway, Claims, IssuedToken};
pub use identity::{hash_password, verify_password, NewUser, ProfileUpdate, Role, User, UserProfile};
pub use repository::{
    CartRepository, FlightDeletion, FlightRepository, OrderQueries, TokenBlacklistRepository,
    UserRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
