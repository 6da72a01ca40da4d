//! # Path Errors

use thiserror::Error;

/// Result type for path parsing
pub type PathResult<T> = Result<T, PathSyntaxError>;

/// Path syntax errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathSyntaxError {
    #[error("Empty path")]
    Empty,

    #[error("Path must start with '/': {0}")]
    NotAbsolute(String),

    #[error("Empty segment at position {position} in path {path}")]
    EmptySegment { path: String, position: usize },

    #[error("Invalid segment '{segment}' in path {path}")]
    InvalidSegment { path: String, segment: String },

    #[error("Malformed value predicate in path {0}")]
    MalformedPredicate(String),

    #[error("Value predicate not allowed here: {0}")]
    UnexpectedPredicate(String),

    #[error("Path has no parent segment: {0}")]
    NoParent(String),

    #[error("Path {path} is deeper than {limit} segments")]
    TooDeep { path: String, limit: usize },
}
