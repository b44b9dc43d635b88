use thiserror::Error;

/// Local rejection of user input, raised before any remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a valid image file (JPG, PNG, or WebP)")]
    UnsupportedImageType(String),

    #[error("Please select an image file")]
    NotAnImage(String),

    #[error("File size must be less than {}MB", max / 1024 / 1024)]
    FileTooLarge { size: usize, max: usize },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Message is empty")]
    EmptyMessage,
}

/// Failure reported by (or while reaching) the remote backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Actor not available")]
    Unavailable,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),
}
