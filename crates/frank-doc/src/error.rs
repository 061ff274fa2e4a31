//! Error types for schema loading and indexing

use thiserror::Error;

/// Result type alias using SchemaError
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Error shape crossing the service boundary.
///
/// Mirrors the editor backend's error responses: an HTTP-like status code,
/// at least one human-readable message and an optional machine-readable
/// code for the frontend to dispatch on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed with status {status}: {}", .messages.join("; "))]
pub struct TransportError {
    pub status: u16,
    pub messages: Vec<String>,
    pub code: Option<String>,
}

impl TransportError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            messages: vec![message.into()],
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

/// Errors that can occur while loading or indexing a schema document
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// The schema document failed structural validation
    #[error("schema document is malformed: {0}")]
    Malformed(String),

    /// The schema could not be fetched from its source
    #[error(transparent)]
    Transport(#[from] TransportError),
}
