//! # ghostchat-shared
//!
//! Types shared by the storage and client crates: the backend's domain
//! model, blob references, client-side upload validation and the error
//! types that cross crate boundaries.

pub mod blob;
pub mod constants;
pub mod error;
pub mod types;
pub mod validation;

pub use blob::ExternalBlob;
pub use error::{BackendError, ValidationError};
pub use types::*;
