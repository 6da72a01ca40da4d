//! # Document Errors

use thiserror::Error;

/// Result type for codec operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Raised when stored profile text is not a well-formed document.
///
/// Carries the byte offset where the scanner gave up so operators can find
/// the damage in the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed document at byte {offset}: {reason}")]
pub struct ParseError {
    offset: usize,
    reason: String,
}

impl ParseError {
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }

    /// Byte offset into the raw text
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
