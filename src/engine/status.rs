//! Write outcomes

use std::fmt;

use serde::Serialize;

use crate::document::Document;

/// What a write did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum WriteStatus {
    /// Nothing to do; the document is untouched and must not be stored
    Unchanged,
    /// An existing value was overwritten
    Updated,
    /// New values were appended
    Inserted(usize),
    /// Fields were detached
    Deleted(usize),
    /// Delete target absent; the document is untouched
    NotFound,
}

impl WriteStatus {
    /// True if the new document differs from the input and must be stored
    pub fn requires_persist(&self) -> bool {
        matches!(
            self,
            WriteStatus::Updated | WriteStatus::Inserted(_) | WriteStatus::Deleted(_)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStatus::Unchanged => "unchanged",
            WriteStatus::Updated => "updated",
            WriteStatus::Inserted(_) => "inserted",
            WriteStatus::Deleted(_) => "deleted",
            WriteStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStatus::Inserted(n) | WriteStatus::Deleted(n) => {
                write!(f, "{}({})", self.as_str(), n)
            }
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// Result of a document mutation: the new document and what changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub document: Document,
    pub status: WriteStatus,
}

impl Mutation {
    pub fn new(document: Document, status: WriteStatus) -> Self {
        Self { document, status }
    }

    pub fn unchanged(document: Document) -> Self {
        Self::new(document, WriteStatus::Unchanged)
    }
}
