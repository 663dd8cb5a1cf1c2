//! Error types for the fallible edges of the engine
//!
//! Unmapped positions, overlaps and cascade invalidations are expected
//! conditions and are reported as data, never through these types.

use thiserror::Error;

/// Result type for engine operations that can fail.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised by document mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The replaced range is inverted or runs past the document end.
    #[error("invalid range {from}..{to} for document of size {size}")]
    InvalidRange { from: usize, to: usize, size: usize },
    /// A range endpoint does not sit inside block content.
    #[error("position {0} is not inside a text block")]
    NotInTextBlock(usize),
}

/// Errors raised at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The source reported `success: false`.
    #[error("suggestion source reported failure")]
    SourceFailed,
    /// The response body could not be parsed.
    #[error("malformed suggestion response: {0}")]
    Malformed(String),
    /// The response belongs to a superseded or cancelled request.
    #[error("stale response for request generation {0}")]
    Stale(u64),
}

/// Errors raised while loading persisted sessions or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("json error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Json(err.to_string())
    }
}

/// Umbrella error for the editor facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocumentError::InvalidRange {
            from: 5,
            to: 2,
            size: 10,
        };
        assert_eq!(err.to_string(), "invalid range 5..2 for document of size 10");

        let wrapped: EngineError = err.into();
        assert!(matches!(wrapped, EngineError::Document(_)));
    }

    #[test]
    fn test_session_error_from_json() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let session: SessionError = err.into();
        assert!(session.to_string().starts_with("json error"));
    }
}
