//! Error types for tickio-log.

/// Result type alias for tickio-log.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for logger configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A level name that is not one of the known levels.
    #[error("level unrecognized: {0}")]
    UnknownLevel(String),

    /// Fields could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fields must serialize to a JSON object.
    #[error("fields must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
