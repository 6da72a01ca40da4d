//! Operation counters
//!
//! Monotonic counters, reset only when the registry is created. Relaxed
//! ordering throughout; values are exact once all writers are done.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one profile store
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Profiles fetched from storage
    loads: AtomicU64,
    /// Profiles written to storage
    stores: AtomicU64,
    /// Field writes that changed nothing and skipped storage
    skipped_writes: AtomicU64,
    /// Field deletes
    field_deletes: AtomicU64,
    /// Whole-profile deletes
    profile_deletes: AtomicU64,
    /// Stored profiles that failed to parse
    parse_failures: AtomicU64,
    /// Collaborator calls that failed
    storage_failures: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_loads(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stores(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped_writes(&self) {
        self.skipped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_field_deletes(&self) {
        self.field_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_profile_deletes(&self) {
        self.profile_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parse_failures(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_storage_failures(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            loads: self.loads.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
            field_deletes: self.field_deletes.load(Ordering::Relaxed),
            profile_deletes: self.profile_deletes.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub loads: u64,
    pub stores: u64,
    pub skipped_writes: u64,
    pub field_deletes: u64,
    pub profile_deletes: u64,
    pub parse_failures: u64,
    pub storage_failures: u64,
}
