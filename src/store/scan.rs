//! Record scan shared by the reference reverse indexes

use crate::document::DocumentCodec;
use crate::engine::PathResolver;
use crate::observability::{log_event_with_fields, Event};
use crate::path::Path;

use super::collaborators::ProfileKey;
use super::errors::{CollaboratorError, CollaboratorResult};

/// Field-value query compiled once per scan
#[derive(Debug)]
pub(crate) struct ValueQuery {
    path: Path,
}

impl ValueQuery {
    pub(crate) fn new(path: &str, value: &str) -> CollaboratorResult<Self> {
        let invalid =
            |e: crate::path::PathSyntaxError| CollaboratorError::InvalidQuery(e.to_string());
        let path = Path::parse(path).map_err(invalid)?;
        path.require_plain().map_err(invalid)?;
        Ok(Self {
            path: path.with_predicate(value),
        })
    }

    /// True if the profile holds the value; unreadable records never match
    pub(crate) fn matches(&self, key: &ProfileKey, text: &str) -> bool {
        match DocumentCodec::default().parse(text) {
            Ok(doc) => PathResolver::exists(&doc, &self.path),
            Err(e) => {
                let key = key.to_string();
                let reason = e.to_string();
                log_event_with_fields(
                    Event::IndexRecordSkipped,
                    &[("key", &key), ("reason", &reason)],
                );
                false
            }
        }
    }
}
