//! # Engine Errors

use thiserror::Error;

use crate::document::NodeAddress;
use crate::path::PathSyntaxError;

/// Result type for attribute engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of a single document mutation.
///
/// When an operation returns one of these, the document it was given has
/// been dropped; nothing of the attempt survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    PathSyntax(#[from] PathSyntaxError),

    #[error("Path {path} is outside the document rooted at '{root}'")]
    PathOutsideDocument { path: String, root: String },

    #[error("Cannot add '{child}' under '{parent}': it holds text")]
    MixedContent { parent: String, child: String },

    #[error("No node at child index trail {0:?}")]
    DanglingAddress(NodeAddress),
}
