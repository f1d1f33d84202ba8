//! Error taxonomy shared by the store and the operations layered on it.

use serde_json::Value;
use thiserror::Error;

/// All catalog errors.
///
/// Store-layer failures are classified here once, so callers can tell a
/// missing document from a stale revision without inspecting messages.
#[derive(Debug, Error)]
pub enum Error {
    /// No document under the given key.
    #[error("document not found: {collection}/{key}")]
    NotFound { collection: String, key: String },

    /// Revision check failed (the document changed underneath the caller).
    #[error("conflict on {collection}/{key}: expected revision {expected}, found {actual}")]
    Conflict {
        collection: String,
        key: String,
        expected: String,
        actual: String,
    },

    /// Insert collided with an existing key.
    #[error("unique constraint violated: {collection}/{key}")]
    DuplicateKey { collection: String, key: String },

    #[error("illegal document key: {0:?}")]
    InvalidKey(String),

    /// A request body is missing fields a composite operation needs.
    #[error("validation failed: {message}")]
    ValidationFailed {
        message: String,
        missing: Vec<String>,
    },

    /// An ancestor walk came back to an id it had already visited.
    #[error("cycle detected in ancestor chain at id {id}")]
    CycleDetected { id: Value },

    #[error("ancestor chain exceeds maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },

    /// The backing storage could not be read or written.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    /// A stored or supplied document could not be decoded.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(collection: &str, key: &str) -> Self {
        Error::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn duplicate_key(collection: &str, key: &str) -> Self {
        Error::DuplicateKey {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    /// Build a validation failure naming every missing field.
    pub fn missing_fields(message: impl Into<String>, missing: Vec<String>) -> Self {
        Error::ValidationFailed {
            message: message.into(),
            missing,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Conflict { .. } => "CONFLICT",
            Error::DuplicateKey { .. } => "DUPLICATE_KEY",
            Error::InvalidKey(_) => "INVALID_KEY",
            Error::ValidationFailed { .. } => "VALIDATION_FAILED",
            Error::CycleDetected { .. } => "CYCLE_DETECTED",
            Error::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            Error::Unavailable(_) => "STORE_UNAVAILABLE",
            Error::Malformed(_) => "MALFORMED_DOCUMENT",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Malformed(err.to_string())
    }
}
