use thiserror::Error;

use ghostchat_shared::{BackendError, ValidationError};
use ghostchat_store::StoreError;

/// Errors surfaced by client operations.
///
/// `Clone` so a single coalesced refresh can hand its outcome to every
/// waiting consumer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to preload image: {0}")]
    Preload(String),

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Failed to read file: {0}")]
    Io(String),

    #[error("Cached value for {0} has an unexpected type")]
    TypeMismatch(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<StoreError> for ClientError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
