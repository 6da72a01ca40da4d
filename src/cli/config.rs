//! Configuration file
//!
//! Single JSON object. Only `data_dir` is required:
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/profiledb",
//!   "root_tag": "profile",
//!   "xml_declaration": true,
//!   "serialize_writes": true,
//!   "log_level": "info",
//!   "item_types": { "ITEM": 1, "USER": 2 },
//!   "external_ids": { "sku-1": 1 }
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::DeclarationPolicy;
use crate::observability::Severity;
use crate::path::is_valid_segment;
use crate::store::{
    CollaboratorResult, ItemId, ItemTypeId, MemoryIdentityMapping, MemoryTypeRegistry,
    ProfileStoreOptions, DEFAULT_ROOT_TAG,
};

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Root tag of new profile documents (default "profile")
    #[serde(default = "default_root_tag")]
    pub root_tag: String,

    /// Write an XML declaration in front of stored profiles (default true)
    #[serde(default = "default_true")]
    pub xml_declaration: bool,

    /// Serialize writes per profile inside the process (default true)
    #[serde(default = "default_true")]
    pub serialize_writes: bool,

    /// Minimum log level: trace, info, warn, error, fatal (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Item type name → item type id
    #[serde(default)]
    pub item_types: BTreeMap<String, ItemTypeId>,

    /// External item id → internal item id
    #[serde(default)]
    pub external_ids: BTreeMap<String, ItemId>,
}

fn default_root_tag() -> String {
    DEFAULT_ROOT_TAG.to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if !is_valid_segment(&self.root_tag) {
            return Err(CliError::config_error(format!(
                "Invalid root_tag: '{}'",
                self.root_tag
            )));
        }

        self.severity()?;

        let mut seen = HashSet::new();
        for (name, id) in &self.item_types {
            if name.is_empty() {
                return Err(CliError::config_error("item_types contains an empty name"));
            }
            if !seen.insert(*id) {
                return Err(CliError::config_error(format!(
                    "Duplicate item type id {} (at '{}')",
                    id, name
                )));
            }
        }

        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    pub fn store_options(&self) -> ProfileStoreOptions {
        ProfileStoreOptions {
            root_tag: self.root_tag.clone(),
            declaration: if self.xml_declaration {
                DeclarationPolicy::Standalone
            } else {
                DeclarationPolicy::Omit
            },
            serialize_writes: self.serialize_writes,
        }
    }

    pub fn type_registry(&self) -> MemoryTypeRegistry {
        MemoryTypeRegistry::from_names(
            self.item_types
                .iter()
                .map(|(name, id)| (name.clone(), *id)),
        )
    }

    pub fn identity_mapping(&self) -> CollaboratorResult<MemoryIdentityMapping> {
        let mapping = MemoryIdentityMapping::new();
        for (external, id) in &self.external_ids {
            mapping.register(external.clone(), *id)?;
        }
        Ok(mapping)
    }
}
