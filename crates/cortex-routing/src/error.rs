//! Error type shared by every routing component.

use cortex_core::Error as CoreError;
use serde_json::Error as JsonError;
use std::io;
use std::result::Result as StdResult;
use thiserror::Error;
use toml::de::Error as TomlDeError;
use toml::ser::Error as TomlSerError;

/// Result type for routing operations
pub type Result<T> = StdResult<T, RoutingError>;

/// Errors raised by the routing core.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A backend collaborator call failed.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Reading or writing the config file failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A JSON payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// The config file is not valid TOML.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] TomlDeError),

    /// The config could not be written as TOML.
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] TomlSerError),

    /// Required collaborator wiring is missing or a setting is out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend needed for the selected target is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Every attempt to produce a response failed, fallback included.
    #[error("Routing failed: {0}")]
    Routing(String),

    /// Decomposition or a single-task run failed.
    #[error("Orchestration failed: {0}")]
    Orchestration(String),

    /// The request was cancelled between stages.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// A request with this id is already executing.
    #[error("Request {0} is already active")]
    DuplicateRequest(String),

    /// A pipeline stage failed; wraps the stage's own error.
    #[error("stage {stage} failed: {source}")]
    StageFailed {
        /// Name of the failing stage
        stage: String,
        /// Error the stage returned
        #[source]
        source: Box<RoutingError>,
    },

    /// A backend call exceeded its deadline, in milliseconds.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl RoutingError {
    /// Wraps an error raised by the named pipeline stage.
    #[must_use]
    pub fn stage(stage: &str, source: Self) -> Self {
        Self::StageFailed {
            stage: stage.to_owned(),
            source: Box::new(source),
        }
    }

    /// Whether this error, or the stage error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled(_) => true,
            Self::StageFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
