//! # Local Filesystem Storage
//!
//! One JSON record per profile at `<data_dir>/<tenant>/<type>/<item>.json`.
//!
//! - Every record carries a CRC32 of its text; every read verifies it
//! - Writes go to a temporary file first and are renamed into place
//! - A checksum mismatch is reported, never repaired

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event};

use super::collaborators::{ItemTypeId, ProfileKey, ProfileStorage, ReverseIndex, TenantId};
use super::errors::{CollaboratorError, CollaboratorResult};
use super::scan::ValueQuery;

const RECORD_EXTENSION: &str = "json";

/// On-disk profile record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub key: ProfileKey,
    pub text: String,
    pub checksum: u32,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn new(key: ProfileKey, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            key,
            checksum: compute_checksum(text.as_bytes()),
            text,
            updated_at: Utc::now(),
        }
    }

    pub fn is_intact(&self) -> bool {
        compute_checksum(self.text.as_bytes()) == self.checksum
    }
}

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Profile storage rooted at a data directory
#[derive(Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open storage at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> CollaboratorResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn type_dir(&self, tenant_id: TenantId, item_type_id: ItemTypeId) -> PathBuf {
        self.root
            .join(tenant_id.to_string())
            .join(item_type_id.to_string())
    }

    fn record_path(&self, key: &ProfileKey) -> PathBuf {
        self.type_dir(key.tenant_id, key.item_type_id)
            .join(format!("{}.{}", key.item_id, RECORD_EXTENSION))
    }

    /// Read and verify the record for `key`
    pub fn read_record(&self, key: &ProfileKey) -> CollaboratorResult<Option<ProfileRecord>> {
        let path = self.record_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: ProfileRecord =
            serde_json::from_slice(&bytes).map_err(|e| CollaboratorError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        if record.key != *key {
            return Err(CollaboratorError::Corrupt {
                key: key.to_string(),
                reason: format!("record belongs to {}", record.key),
            });
        }
        if !record.is_intact() {
            return Err(CollaboratorError::Corrupt {
                key: key.to_string(),
                reason: "checksum mismatch".into(),
            });
        }
        Ok(Some(record))
    }

    fn write_record(&self, record: &ProfileRecord) -> CollaboratorResult<()> {
        let path = self.record_path(&record.key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(record).map_err(|e| CollaboratorError::Io(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Keys stored for one tenant and type, ascending by item id
    fn keys_of_type(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
    ) -> CollaboratorResult<Vec<ProfileKey>> {
        let dir = self.type_dir(tenant_id, item_type_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let item_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok());
            if let Some(item_id) = item_id {
                keys.push(ProfileKey::new(tenant_id, item_id, item_type_id));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl ProfileStorage for LocalStorage {
    fn get(&self, key: &ProfileKey) -> CollaboratorResult<Option<String>> {
        Ok(self.read_record(key)?.map(|record| record.text))
    }

    fn put(&self, key: &ProfileKey, text: &str) -> CollaboratorResult<bool> {
        self.write_record(&ProfileRecord::new(*key, text))?;
        Ok(true)
    }

    fn delete(&self, key: &ProfileKey) -> CollaboratorResult<bool> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl ReverseIndex for LocalStorage {
    fn find_items_by_field_value(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        path: &str,
        value: &str,
    ) -> CollaboratorResult<Vec<ProfileKey>> {
        let query = ValueQuery::new(path, value)?;
        let mut hits = Vec::new();
        for key in self.keys_of_type(tenant_id, item_type_id)? {
            match self.read_record(&key) {
                Ok(Some(record)) if query.matches(&key, &record.text) => hits.push(key),
                Ok(_) => {}
                Err(e) => {
                    let key = key.to_string();
                    let reason = e.to_string();
                    log_event_with_fields(
                        Event::IndexRecordSkipped,
                        &[("key", &key), ("reason", &reason)],
                    );
                }
            }
        }
        Ok(hits)
    }

    fn find_items_by_type(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        limit: usize,
    ) -> CollaboratorResult<Vec<ProfileKey>> {
        let mut keys = self.keys_of_type(tenant_id, item_type_id)?;
        keys.truncate(limit);
        Ok(keys)
    }
}
