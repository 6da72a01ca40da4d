//! # Profile Store Errors

use thiserror::Error;

use crate::document::ParseError;
use crate::engine::EngineError;
use crate::path::PathSyntaxError;

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Result type for profile store operations
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Failure reported by storage, mapping or index collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<std::io::Error> for CollaboratorError {
    fn from(err: std::io::Error) -> Self {
        CollaboratorError::Io(err.to_string())
    }
}

/// Profile store errors
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Stored profile is malformed: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    PathSyntax(#[from] PathSyntaxError),

    #[error("Path {path} does not start at document root <{root}>")]
    PathOutsideDocument { path: String, root: String },

    #[error("Cannot add <{child}> under text field <{parent}>")]
    MixedContent { parent: String, child: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] CollaboratorError),

    #[error("Item {item_id} (type {item_type_id}) is not registered for tenant {tenant_id}")]
    ItemNotRegistered {
        tenant_id: u32,
        item_id: u32,
        item_type_id: u32,
    },

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Unknown item type: {0}")]
    UnknownItemType(String),

    #[error("{0} is not configured")]
    MissingCollaborator(&'static str),

    #[error("Profile lock poisoned")]
    Lock,

    #[error("Engine fault: {0}")]
    EngineFault(String),
}

impl ProfileError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ProfileError::Parse(_) => "PROFILE_PARSE_ERROR",
            ProfileError::PathSyntax(_) => "PROFILE_PATH_SYNTAX",
            ProfileError::PathOutsideDocument { .. } => "PROFILE_PATH_OUTSIDE_DOCUMENT",
            ProfileError::MixedContent { .. } => "PROFILE_MIXED_CONTENT",
            ProfileError::StorageUnavailable(_) => "PROFILE_STORAGE_UNAVAILABLE",
            ProfileError::ItemNotRegistered { .. } => "PROFILE_ITEM_NOT_REGISTERED",
            ProfileError::UnknownItem(_) => "PROFILE_UNKNOWN_ITEM",
            ProfileError::UnknownItemType(_) => "PROFILE_UNKNOWN_ITEM_TYPE",
            ProfileError::MissingCollaborator(_) => "PROFILE_MISSING_COLLABORATOR",
            ProfileError::Lock => "PROFILE_LOCK_POISONED",
            ProfileError::EngineFault(_) => "PROFILE_ENGINE_FAULT",
        }
    }

    /// Caller input was at fault, not the store
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProfileError::PathSyntax(_)
                | ProfileError::PathOutsideDocument { .. }
                | ProfileError::MixedContent { .. }
                | ProfileError::UnknownItem(_)
                | ProfileError::UnknownItemType(_)
        )
    }
}

impl From<EngineError> for ProfileError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::PathSyntax(e) => ProfileError::PathSyntax(e),
            EngineError::PathOutsideDocument { path, root } => {
                ProfileError::PathOutsideDocument { path, root }
            }
            EngineError::MixedContent { parent, child } => {
                ProfileError::MixedContent { parent, child }
            }
            err @ EngineError::DanglingAddress(_) => ProfileError::EngineFault(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ProfileError::Lock.code(), "PROFILE_LOCK_POISONED");
        assert_eq!(
            ProfileError::from(CollaboratorError::Unavailable("down".into())).code(),
            "PROFILE_STORAGE_UNAVAILABLE"
        );
        assert_eq!(
            ProfileError::from(ParseError::new(3, "unexpected end")).code(),
            "PROFILE_PARSE_ERROR"
        );
    }

    #[test]
    fn test_engine_errors_map_one_to_one() {
        let err: ProfileError = EngineError::PathOutsideDocument {
            path: "/item/name".into(),
            root: "profile".into(),
        }
        .into();
        assert_eq!(err.code(), "PROFILE_PATH_OUTSIDE_DOCUMENT");
        assert!(err.is_client_error());

        let err: ProfileError = EngineError::PathSyntax(PathSyntaxError::Empty).into();
        assert_eq!(err.code(), "PROFILE_PATH_SYNTAX");
    }

    #[test]
    fn test_storage_failure_is_not_client_error() {
        let err = ProfileError::from(CollaboratorError::Io("disk full".into()));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("disk full"));
    }
}
