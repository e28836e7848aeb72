//! Error types for docshelf.

use thiserror::Error;

/// Result type alias using docshelf's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docshelf operations.
///
/// The filter engine and preview classifier never produce these; only
/// operations that cross the document store boundary do.
#[derive(Error, Debug)]
pub enum Error {
    /// Store unreachable, or the store rejected the query
    #[error("Connection error: {0}")]
    Connection(String),

    /// A required field was missing or malformed before a create/upload call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// File exceeds the upload ceiling
    #[error("File of {size} bytes exceeds the upload limit of {limit} bytes")]
    SizeLimit { size: u64, limit: u64 },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the store could not be reached or refused the request.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// True for both generic and document-specific not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::DocumentNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Serialization(e.to_string())
        } else {
            Error::Connection(e.to_string())
        }
    }
}
