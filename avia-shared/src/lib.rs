pub mod pii;

pub use pii::Masked;

/// Failure raised by any repository or unit of work, independent of the backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate value for {0}")]
    Duplicate(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

pub type RepoResult<T> = Result<T, StoreError>;
