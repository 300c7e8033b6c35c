//! Error types for the document layer.

use thiserror::Error;

/// Result type for document parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while parsing a License or Status Document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid UTF-8.
    #[error("document is not valid UTF-8")]
    InvalidUtf8,

    /// The document JSON is malformed or missing required fields.
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    /// A link required by the format is absent.
    #[error("document has no '{0}' link")]
    MissingLink(&'static str),

    /// A base64 field could not be decoded.
    #[error("invalid base64 in '{field}': {reason}")]
    InvalidBase64 {
        field: &'static str,
        reason: String,
    },
}
