//! CLI command implementations
//!
//! Every command loads the configuration, opens the store on the data
//! directory, runs one operation and prints one JSON response.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use crate::observability::{log_event_with_fields, Event, Logger};
use crate::store::{LocalStorage, ProfileError, ProfileKey, ProfileStore};

use super::args::{Cli, Command, FieldAction, ItemArgs};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_profile_text, write_error, write_response};

/// Marker file written by `init`
const INIT_MARKER: &str = ".profiledb";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args())
}

/// Run a parsed invocation and print its response
pub fn run_command(cli: Cli) -> CliResult<()> {
    match execute(&cli.config, cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command and return its response payload
pub fn execute(config_path: &Path, command: Command) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("data_dir", &config.data_dir), ("root_tag", &config.root_tag)],
    );

    match command {
        Command::Init => init(&config),
        Command::Get { item } => {
            let store = open_store(&config)?;
            let key = resolve(&store, &item)?;
            let profile = store.get(&key)?;
            Ok(json!({"key": key, "profile": profile}))
        }
        Command::Put { item, file } => {
            let text = read_profile_text(file.as_deref())?;
            let store = open_store(&config)?;
            let key = resolve(&store, &item)?;
            let stored = store.put(&key, &text)?;
            Ok(json!({"key": key, "stored": stored}))
        }
        Command::Delete { item } => {
            let store = open_store(&config)?;
            let key = resolve(&store, &item)?;
            let deleted = store.delete_profile(&key)?;
            Ok(json!({"key": key, "deleted": deleted}))
        }
        Command::Field { action } => field(&config, action),
        Command::Search {
            tenant,
            item_type,
            path,
            value,
        } => {
            let store = open_store(&config)?;
            let items = store.items_by_dimension_value(tenant, &item_type, &path, &value)?;
            Ok(json!({"items": items}))
        }
        Command::List {
            tenant,
            item_type,
            limit,
        } => {
            let store = open_store(&config)?;
            let items = store.items_by_item_type(tenant, &item_type, limit)?;
            Ok(json!({"items": items}))
        }
    }
}

/// Initialize a new data directory
///
/// Creates the directory and its marker. Refuses an initialized directory.
pub fn init(config: &Config) -> CliResult<Value> {
    let data_dir = config.data_path();
    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    fs::create_dir_all(data_dir).map_err(|e| {
        CliError::config_error(format!("Failed to create directory {:?}: {}", data_dir, e))
    })?;
    let marker = json!({
        "root_tag": config.root_tag,
        "created_at": Utc::now().to_rfc3339(),
    });
    fs::write(data_dir.join(INIT_MARKER), serde_json::to_vec(&marker)?)?;

    log_event_with_fields(Event::DataDirInitialized, &[("data_dir", &config.data_dir)]);
    Ok(json!({"initialized": true, "data_dir": config.data_dir}))
}

fn field(config: &Config, action: FieldAction) -> CliResult<Value> {
    let store = open_store(config)?;
    let value = match action {
        FieldAction::Get { item, path } => {
            let key = resolve(&store, &item)?;
            let value = store.get_simple_dimension(&key, &path)?;
            json!({"key": key, "path": path, "value": value})
        }
        FieldAction::Values { item, path } => {
            let key = resolve(&store, &item)?;
            let values = store.get_multi_dimension(&key, &path)?;
            json!({"key": key, "path": path, "values": values})
        }
        FieldAction::Exists { item, path } => {
            let key = resolve(&store, &item)?;
            let exists = store.field_exists(&key, &path)?;
            json!({"key": key, "path": path, "exists": exists})
        }
        FieldAction::Set { item, path, value } => {
            let key = resolve(&store, &item)?;
            let status = store.upsert_simple_dimension(&key, &path, &value)?;
            json!({"key": key, "path": path, "result": status})
        }
        FieldAction::Add { item, path, values } => {
            let key = resolve(&store, &item)?;
            let status = store.upsert_multi_dimension(&key, &path, values)?;
            json!({"key": key, "path": path, "result": status})
        }
        FieldAction::Delete { item, path } => {
            let key = resolve(&store, &item)?;
            let status = store.delete_field(&key, &path)?;
            json!({"key": key, "path": path, "result": status})
        }
    };
    Ok(value)
}

fn open_store(config: &Config) -> CliResult<ProfileStore<LocalStorage>> {
    let data_dir = config.data_path();
    if !is_initialized(data_dir) {
        return Err(CliError::not_initialized());
    }

    let storage = LocalStorage::open(data_dir).map_err(ProfileError::from)?;
    let index = LocalStorage::open(data_dir).map_err(ProfileError::from)?;
    let identity = config.identity_mapping().map_err(ProfileError::from)?;

    Ok(ProfileStore::new(storage, config.store_options())
        .with_type_registry(config.type_registry())
        .with_identity_mapping(identity)
        .with_reverse_index(index))
}

fn resolve(store: &ProfileStore<LocalStorage>, item: &ItemArgs) -> CliResult<ProfileKey> {
    Ok(store.resolve_key(item.tenant, &item.item_ref(), &item.item_type)?)
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(INIT_MARKER).exists()
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> PathBuf {
        let config_path = temp_dir.path().join("profiledb.json");
        let data_dir = temp_dir.path().join("data");

        let config = json!({
            "data_dir": data_dir.to_string_lossy(),
            "log_level": "error",
            "item_types": {"ITEM": 1, "USER": 2},
            "external_ids": {"sku-1": 11}
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn item(id: u32) -> ItemArgs {
        ItemArgs {
            tenant: 1,
            item_type: "ITEM".into(),
            item: Some(id),
            external: None,
        }
    }

    fn set(config: &Path, id: u32, path: &str, value: &str) -> Value {
        execute(
            config,
            Command::Field {
                action: FieldAction::Set {
                    item: item(id),
                    path: path.into(),
                    value: value.into(),
                },
            },
        )
        .unwrap()
    }

    #[test]
    fn test_init_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        execute(&config_path, Command::Init).unwrap();
        assert!(temp_dir.path().join("data").join(INIT_MARKER).exists());
    }

    #[test]
    fn test_init_refuses_reinit() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        execute(&config_path, Command::Init).unwrap();
        let result = execute(&config_path, Command::Init);
        assert_eq!(
            result.unwrap_err().code(),
            &CliErrorCode::AlreadyInitialized
        );
    }

    #[test]
    fn test_commands_require_init() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let result = execute(&config_path, Command::Get { item: item(1) });
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::NotInitialized);
    }

    #[test]
    fn test_field_set_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        execute(&config_path, Command::Init).unwrap();

        let first = set(&config_path, 1, "/profile/name", "Anna");
        assert_eq!(first["result"]["status"], "inserted");
        assert_eq!(first["result"]["count"], 1);

        let again = set(&config_path, 1, "/profile/name", "Anna");
        assert_eq!(again["result"]["status"], "unchanged");

        let read = execute(
            &config_path,
            Command::Field {
                action: FieldAction::Get {
                    item: item(1),
                    path: "/profile/name".into(),
                },
            },
        )
        .unwrap();
        assert_eq!(read["value"], "Anna");
        assert_eq!(read["key"]["item_id"], 1);
    }

    #[test]
    fn test_external_id_and_search() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        execute(&config_path, Command::Init).unwrap();

        let external = ItemArgs {
            tenant: 1,
            item_type: "ITEM".into(),
            item: None,
            external: Some("sku-1".into()),
        };
        execute(
            &config_path,
            Command::Field {
                action: FieldAction::Add {
                    item: external,
                    path: "/profile/genre".into(),
                    values: vec!["rock".into(), "jazz".into()],
                },
            },
        )
        .unwrap();
        set(&config_path, 2, "/profile/genre", "pop");

        let found = execute(
            &config_path,
            Command::Search {
                tenant: 1,
                item_type: "ITEM".into(),
                path: "/profile/genre".into(),
                value: "jazz".into(),
            },
        )
        .unwrap();
        assert_eq!(found["items"].as_array().unwrap().len(), 1);
        assert_eq!(found["items"][0]["item_id"], 11);

        let listed = execute(
            &config_path,
            Command::List {
                tenant: 1,
                item_type: "ITEM".into(),
                limit: 10,
            },
        )
        .unwrap();
        assert_eq!(listed["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_profile_errors_keep_code() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        execute(&config_path, Command::Init).unwrap();

        let err = execute(
            &config_path,
            Command::Field {
                action: FieldAction::Set {
                    item: item(1),
                    path: "/item/name".into(),
                    value: "x".into(),
                },
            },
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "PROFILE_PATH_OUTSIDE_DOCUMENT");

        let mut unknown = item(1);
        unknown.item_type = "MOVIE".into();
        let err = execute(&config_path, Command::Get { item: unknown }).unwrap_err();
        assert_eq!(err.code_str(), "PROFILE_UNKNOWN_ITEM_TYPE");
    }

    #[test]
    fn test_delete_profile() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        execute(&config_path, Command::Init).unwrap();
        set(&config_path, 3, "/profile/name", "x");

        let deleted = execute(&config_path, Command::Delete { item: item(3) }).unwrap();
        assert_eq!(deleted["deleted"], true);
        let read = execute(&config_path, Command::Get { item: item(3) }).unwrap();
        assert!(read["profile"].is_null());
    }
}
