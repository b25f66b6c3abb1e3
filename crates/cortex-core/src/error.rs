use core::result::Result as CoreResult;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors raised by backend collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend call failed at the transport or service level.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The named backend is not configured or not reachable.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A backend returned a payload that could not be interpreted.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// A backend call exceeded its deadline.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}
