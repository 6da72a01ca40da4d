//! Observable events
//!
//! Every line the store logs names one of these events.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// Data directory created
    DataDirInitialized,

    // Profile reads
    /// Stored profile text fetched and parsed
    ProfileLoaded,
    /// Stored profile text is malformed
    ProfileParseFailed,

    // Profile writes
    /// Profile text written to storage
    ProfileStored,
    /// Storage refused the profile (item not in its catalog)
    ProfileRejected,
    /// Whole profile removed
    ProfileDeleted,
    /// Field write changed nothing; storage not touched
    WriteSkipped,
    /// Field write applied
    FieldWritten,
    /// Field detached
    FieldDeleted,

    // Collaborators
    /// Storage, mapping or index call failed
    StorageFailed,
    /// Reverse index skipped a record it could not read
    IndexRecordSkipped,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DataDirInitialized => "DATA_DIR_INITIALIZED",
            Event::ProfileLoaded => "PROFILE_LOADED",
            Event::ProfileParseFailed => "PROFILE_PARSE_FAILED",
            Event::ProfileStored => "PROFILE_STORED",
            Event::ProfileRejected => "PROFILE_REJECTED",
            Event::ProfileDeleted => "PROFILE_DELETED",
            Event::WriteSkipped => "WRITE_SKIPPED",
            Event::FieldWritten => "FIELD_WRITTEN",
            Event::FieldDeleted => "FIELD_DELETED",
            Event::StorageFailed => "STORAGE_FAILED",
            Event::IndexRecordSkipped => "INDEX_RECORD_SKIPPED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ProfileLoaded | Event::WriteSkipped => Severity::Trace,
            Event::ProfileRejected | Event::IndexRecordSkipped => Severity::Warn,
            Event::ProfileParseFailed | Event::StorageFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
