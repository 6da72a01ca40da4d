//! # Profile Store
//!
//! Facade tying storage, codec and attribute engine together. Every field
//! operation is one load, one engine call and at most one store:
//!
//! 1. fetch the raw text (absent profile → fresh document with the root tag)
//! 2. parse; malformed text fails the call and is left in storage as is
//! 3. apply the engine operation
//! 4. store the serialized result only if the engine changed something
//!
//! With `serialize_writes` on, steps 1-4 for one key never interleave with
//! another write to the same key inside this process.

use std::collections::BTreeSet;

use crate::document::{DeclarationPolicy, Document, DocumentCodec};
use crate::engine::{AttributeEngine, Mutation, PathResolver, WriteStatus};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};
use crate::path::Path;

use super::collaborators::{
    IdentityMapping, ItemRef, ItemTypeId, ProfileKey, ProfileStorage, ReverseIndex, TenantId,
    TypeRegistry,
};
use super::errors::{CollaboratorError, ProfileError, ProfileResult};
use super::locks::KeyLocks;

/// Root tag of every profile document unless configured otherwise
pub const DEFAULT_ROOT_TAG: &str = "profile";

/// Store construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStoreOptions {
    /// Root tag of newly created documents
    pub root_tag: String,
    /// Declaration written in front of stored documents
    pub declaration: DeclarationPolicy,
    /// Serialize read-modify-write cycles per key
    pub serialize_writes: bool,
}

impl Default for ProfileStoreOptions {
    fn default() -> Self {
        Self {
            root_tag: DEFAULT_ROOT_TAG.to_string(),
            declaration: DeclarationPolicy::Standalone,
            serialize_writes: true,
        }
    }
}

/// Path-addressed access to stored profiles
#[derive(Debug)]
pub struct ProfileStore<S: ProfileStorage> {
    storage: S,
    codec: DocumentCodec,
    root_tag: String,
    locks: Option<KeyLocks>,
    identity: Option<Box<dyn IdentityMapping>>,
    types: Option<Box<dyn TypeRegistry>>,
    index: Option<Box<dyn ReverseIndex>>,
    metrics: MetricsRegistry,
}

impl<S: ProfileStorage> ProfileStore<S> {
    pub fn new(storage: S, options: ProfileStoreOptions) -> Self {
        Self {
            storage,
            codec: DocumentCodec::new(options.declaration),
            root_tag: options.root_tag,
            locks: options.serialize_writes.then(KeyLocks::new),
            identity: None,
            types: None,
            index: None,
            metrics: MetricsRegistry::new(),
        }
    }

    pub fn with_identity_mapping(mut self, mapping: impl IdentityMapping + 'static) -> Self {
        self.identity = Some(Box::new(mapping));
        self
    }

    pub fn with_type_registry(mut self, registry: impl TypeRegistry + 'static) -> Self {
        self.types = Some(Box::new(registry));
        self
    }

    pub fn with_reverse_index(mut self, index: impl ReverseIndex + 'static) -> Self {
        self.index = Some(Box::new(index));
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn root_tag(&self) -> &str {
        &self.root_tag
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ==================
    // Whole profiles
    // ==================

    /// Raw stored text
    pub fn get(&self, key: &ProfileKey) -> ProfileResult<Option<String>> {
        let text = self
            .storage
            .get(key)
            .map_err(|e| self.collaborator_failure("get", key, e))?;
        self.metrics.increment_loads();
        Ok(text)
    }

    /// Store raw text as is; `false` if storage does not know the item
    pub fn put(&self, key: &ProfileKey, text: &str) -> ProfileResult<bool> {
        let stored = self
            .storage
            .put(key, text)
            .map_err(|e| self.collaborator_failure("put", key, e))?;
        let key_str = key.to_string();
        if stored {
            self.metrics.increment_stores();
            log_event_with_fields(Event::ProfileStored, &[("key", &key_str)]);
        } else {
            log_event_with_fields(Event::ProfileRejected, &[("key", &key_str)]);
        }
        Ok(stored)
    }

    /// Remove the whole profile; `false` if there was none
    pub fn delete_profile(&self, key: &ProfileKey) -> ProfileResult<bool> {
        self.guarded(key, || {
            let removed = self
                .storage
                .delete(key)
                .map_err(|e| self.collaborator_failure("delete", key, e))?;
            if removed {
                self.metrics.increment_profile_deletes();
                log_event_with_fields(Event::ProfileDeleted, &[("key", &key.to_string())]);
            }
            Ok(removed)
        })
    }

    /// Parsed profile, `None` if the item has no stored profile
    pub fn load_document(&self, key: &ProfileKey) -> ProfileResult<Option<Document>> {
        let Some(text) = self.get(key)? else {
            return Ok(None);
        };
        match self.codec.parse(&text) {
            Ok(doc) => {
                log_event_with_fields(Event::ProfileLoaded, &[("key", &key.to_string())]);
                Ok(Some(doc))
            }
            Err(e) => {
                self.metrics.increment_parse_failures();
                let key_str = key.to_string();
                let reason = e.to_string();
                log_event_with_fields(
                    Event::ProfileParseFailed,
                    &[("key", &key_str), ("reason", &reason)],
                );
                Err(e.into())
            }
        }
    }

    // ==================
    // Field reads
    // ==================

    /// Value of a single-valued field
    pub fn get_simple_dimension(
        &self,
        key: &ProfileKey,
        path: &str,
    ) -> ProfileResult<Option<String>> {
        let path = Path::parse(path)?;
        match self.load_document(key)? {
            Some(doc) => Ok(AttributeEngine::get_simple(&doc, &path)?),
            None => Ok(None),
        }
    }

    /// Distinct values of a repeatable field
    pub fn get_multi_dimension(
        &self,
        key: &ProfileKey,
        path: &str,
    ) -> ProfileResult<BTreeSet<String>> {
        let path = Path::parse(path)?;
        match self.load_document(key)? {
            Some(doc) => Ok(AttributeEngine::get_multi(&doc, &path)?),
            None => Ok(BTreeSet::new()),
        }
    }

    /// True if the field exists; a trailing `[text()='v']` also requires
    /// one of its values to equal `v`
    pub fn field_exists(&self, key: &ProfileKey, path: &str) -> ProfileResult<bool> {
        let path = Path::parse(path)?;
        Ok(self
            .load_document(key)?
            .map_or(false, |doc| PathResolver::exists(&doc, &path)))
    }

    // ==================
    // Field writes
    // ==================

    /// Set a single-valued field, creating it if missing
    pub fn upsert_simple_dimension(
        &self,
        key: &ProfileKey,
        path: &str,
        value: &str,
    ) -> ProfileResult<WriteStatus> {
        let path = Path::parse(path)?;
        self.modify(key, &path, |doc| AttributeEngine::upsert_simple(doc, &path, value))
    }

    /// Add values to a repeatable field; values already present are skipped
    pub fn upsert_multi_dimension<I, V>(
        &self,
        key: &ProfileKey,
        path: &str,
        values: I,
    ) -> ProfileResult<WriteStatus>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let path = Path::parse(path)?;
        self.modify(key, &path, |doc| AttributeEngine::upsert_multi(doc, &path, values))
    }

    /// Remove a field with all its values
    pub fn delete_field(&self, key: &ProfileKey, path: &str) -> ProfileResult<WriteStatus> {
        let path = Path::parse(path)?;
        self.guarded(key, || {
            let Some(doc) = self.load_document(key)? else {
                return Ok(WriteStatus::NotFound);
            };
            let status = self.commit(key, &path, AttributeEngine::delete_field(doc, &path)?)?;
            if let WriteStatus::Deleted(_) = status {
                self.metrics.increment_field_deletes();
                log_event_with_fields(
                    Event::FieldDeleted,
                    &[("key", &key.to_string()), ("path", &path.to_string())],
                );
            }
            Ok(status)
        })
    }

    // ==================
    // Lookups
    // ==================

    /// Key for an item addressed by internal or external id and type name
    pub fn resolve_key(
        &self,
        tenant_id: TenantId,
        item: &ItemRef,
        type_name: &str,
    ) -> ProfileResult<ProfileKey> {
        let item_type_id = self.item_type_id(tenant_id, type_name)?;
        let item_id = match item {
            ItemRef::Internal(id) => *id,
            ItemRef::External(external) => {
                let mapping = self
                    .identity
                    .as_deref()
                    .ok_or(ProfileError::MissingCollaborator("identity mapping"))?;
                mapping
                    .lookup(external)
                    .map_err(|e| self.lookup_failure("identity", external, e))?
                    .ok_or_else(|| ProfileError::UnknownItem(external.clone()))?
            }
        };
        Ok(ProfileKey::new(tenant_id, item_id, item_type_id))
    }

    /// Items of a type whose profile holds `value` at `path`
    pub fn items_by_dimension_value(
        &self,
        tenant_id: TenantId,
        type_name: &str,
        path: &str,
        value: &str,
    ) -> ProfileResult<Vec<ProfileKey>> {
        let path = Path::parse(path)?;
        path.require_plain()?;
        let item_type_id = self.item_type_id(tenant_id, type_name)?;
        let path = path.to_string();
        self.reverse_index()?
            .find_items_by_field_value(tenant_id, item_type_id, &path, value)
            .map_err(|e| self.lookup_failure("index", &path, e))
    }

    /// Items of a type that have a profile, at most `limit`
    pub fn items_by_item_type(
        &self,
        tenant_id: TenantId,
        type_name: &str,
        limit: usize,
    ) -> ProfileResult<Vec<ProfileKey>> {
        let item_type_id = self.item_type_id(tenant_id, type_name)?;
        self.reverse_index()?
            .find_items_by_type(tenant_id, item_type_id, limit)
            .map_err(|e| self.lookup_failure("index", type_name, e))
    }

    // ==================
    // Internals
    // ==================

    fn modify<F>(&self, key: &ProfileKey, path: &Path, apply: F) -> ProfileResult<WriteStatus>
    where
        F: FnOnce(Document) -> crate::engine::EngineResult<Mutation>,
    {
        self.guarded(key, || {
            let doc = self
                .load_document(key)?
                .unwrap_or_else(|| Document::new(self.root_tag.clone()));
            let status = self.commit(key, path, apply(doc)?)?;
            if status.requires_persist() {
                log_event_with_fields(
                    Event::FieldWritten,
                    &[
                        ("key", &key.to_string()),
                        ("path", &path.to_string()),
                        ("status", &status.to_string()),
                    ],
                );
            }
            Ok(status)
        })
    }

    /// Store the mutated document if it changed
    fn commit(
        &self,
        key: &ProfileKey,
        path: &Path,
        mutation: Mutation,
    ) -> ProfileResult<WriteStatus> {
        let Mutation { document, status } = mutation;
        if !status.requires_persist() {
            self.metrics.increment_skipped_writes();
            log_event_with_fields(
                Event::WriteSkipped,
                &[
                    ("key", &key.to_string()),
                    ("path", &path.to_string()),
                    ("status", status.as_str()),
                ],
            );
            return Ok(status);
        }

        let text = self.codec.serialize(&document);
        if !self.put(key, &text)? {
            return Err(ProfileError::ItemNotRegistered {
                tenant_id: key.tenant_id,
                item_id: key.item_id,
                item_type_id: key.item_type_id,
            });
        }
        Ok(status)
    }

    fn guarded<T, F>(&self, key: &ProfileKey, f: F) -> ProfileResult<T>
    where
        F: FnOnce() -> ProfileResult<T>,
    {
        match &self.locks {
            Some(locks) => locks.run(key, f),
            None => f(),
        }
    }

    fn item_type_id(&self, tenant_id: TenantId, type_name: &str) -> ProfileResult<ItemTypeId> {
        let types = self
            .types
            .as_deref()
            .ok_or(ProfileError::MissingCollaborator("type registry"))?;
        types
            .id_of_type(tenant_id, type_name)
            .map_err(|e| self.lookup_failure("types", type_name, e))?
            .ok_or_else(|| ProfileError::UnknownItemType(type_name.to_string()))
    }

    fn reverse_index(&self) -> ProfileResult<&dyn ReverseIndex> {
        self.index
            .as_deref()
            .ok_or(ProfileError::MissingCollaborator("reverse index"))
    }

    fn collaborator_failure(
        &self,
        op: &str,
        key: &ProfileKey,
        err: CollaboratorError,
    ) -> ProfileError {
        self.metrics.increment_storage_failures();
        let key_str = key.to_string();
        let reason = err.to_string();
        log_event_with_fields(
            Event::StorageFailed,
            &[("key", &key_str), ("op", op), ("reason", &reason)],
        );
        ProfileError::StorageUnavailable(err)
    }

    fn lookup_failure(&self, op: &str, subject: &str, err: CollaboratorError) -> ProfileError {
        self.metrics.increment_storage_failures();
        let reason = err.to_string();
        log_event_with_fields(
            Event::StorageFailed,
            &[("op", op), ("reason", &reason), ("subject", subject)],
        );
        ProfileError::StorageUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryIdentityMapping, MemoryStorage, MemoryTypeRegistry};

    const STORED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><profile><description>Description stored as a profile.</description><name>profileItem</name><property1>propvalue1</property1></profile>"#;

    fn key() -> ProfileKey {
        ProfileKey::new(1, 1, 1)
    }

    fn seeded() -> (ProfileStore<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::new();
        storage.insert_raw(key(), STORED).unwrap();
        let store = ProfileStore::new(storage.clone(), ProfileStoreOptions::default());
        (store, storage)
    }

    #[test]
    fn test_get_simple_dimension() {
        let (store, _) = seeded();
        assert_eq!(
            store.get_simple_dimension(&key(), "/profile/name").unwrap(),
            Some("profileItem".to_string())
        );
        assert_eq!(store.get_simple_dimension(&key(), "/profile/age").unwrap(), None);
    }

    #[test]
    fn test_read_without_profile() {
        let store = ProfileStore::new(MemoryStorage::new(), ProfileStoreOptions::default());
        assert_eq!(store.get_simple_dimension(&key(), "/profile/name").unwrap(), None);
        assert!(store.get_multi_dimension(&key(), "/profile/genre").unwrap().is_empty());
        assert!(!store.field_exists(&key(), "/profile/name").unwrap());
    }

    #[test]
    fn test_unchanged_write_skips_put() {
        let (store, storage) = seeded();
        let status = store
            .upsert_simple_dimension(&key(), "/profile/name", "profileItem")
            .unwrap();
        assert_eq!(status, WriteStatus::Unchanged);
        assert_eq!(storage.put_count(), 0);
        assert_eq!(store.metrics().skipped_writes, 1);
    }

    #[test]
    fn test_update_stores_once() {
        let (store, storage) = seeded();
        let status = store
            .upsert_simple_dimension(&key(), "/profile/name", "my new name")
            .unwrap();
        assert_eq!(status, WriteStatus::Updated);
        assert_eq!(storage.put_count(), 1);
        assert!(storage.peek(&key()).unwrap().contains("<name>my new name</name>"));
    }

    #[test]
    fn test_first_write_creates_document() {
        let storage = MemoryStorage::new();
        let store = ProfileStore::new(storage.clone(), ProfileStoreOptions::default());
        let status = store.upsert_simple_dimension(&key(), "/profile/id", "id 1").unwrap();
        assert_eq!(status, WriteStatus::Inserted(1));
        assert_eq!(
            storage.peek(&key()).unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><profile><id>id 1</id></profile>"#
        );
    }

    #[test]
    fn test_first_write_outside_root_fails() {
        let storage = MemoryStorage::new();
        let store = ProfileStore::new(storage.clone(), ProfileStoreOptions::default());
        let err = store.upsert_simple_dimension(&key(), "/item/id", "1").unwrap_err();
        assert_eq!(err.code(), "PROFILE_PATH_OUTSIDE_DOCUMENT");
        assert_eq!(storage.put_count(), 0);
    }

    #[test]
    fn test_parse_error_propagates_without_put() {
        let storage = MemoryStorage::new();
        storage.insert_raw(key(), "<profile><name>x</profile>").unwrap();
        let store = ProfileStore::new(storage.clone(), ProfileStoreOptions::default());
        let err = store.upsert_simple_dimension(&key(), "/profile/name", "y").unwrap_err();
        assert!(matches!(err, ProfileError::Parse(_)));
        assert_eq!(storage.put_count(), 0);
        assert_eq!(storage.peek(&key()).unwrap(), "<profile><name>x</profile>");
        assert_eq!(store.metrics().parse_failures, 1);
    }

    #[test]
    fn test_bad_path_never_touches_storage() {
        let (store, storage) = seeded();
        assert!(matches!(
            store.upsert_simple_dimension(&key(), "profile/name", "x"),
            Err(ProfileError::PathSyntax(_))
        ));
        assert_eq!(storage.get_count(), 0);
    }

    #[test]
    fn test_unregistered_item() {
        let storage = MemoryStorage::with_catalog(Vec::new());
        let store = ProfileStore::new(storage, ProfileStoreOptions::default());
        let err = store.upsert_simple_dimension(&key(), "/profile/id", "1").unwrap_err();
        assert_eq!(err.code(), "PROFILE_ITEM_NOT_REGISTERED");
    }

    #[test]
    fn test_storage_unavailable() {
        let (store, storage) = seeded();
        storage.set_unavailable(true);
        let err = store.get_simple_dimension(&key(), "/profile/name").unwrap_err();
        assert!(matches!(
            err,
            ProfileError::StorageUnavailable(CollaboratorError::Unavailable(_))
        ));
        assert_eq!(store.metrics().storage_failures, 1);
    }

    #[test]
    fn test_delete_field_on_missing_profile() {
        let storage = MemoryStorage::new();
        let store = ProfileStore::new(storage.clone(), ProfileStoreOptions::default());
        assert_eq!(
            store.delete_field(&key(), "/profile/name").unwrap(),
            WriteStatus::NotFound
        );
        assert_eq!(storage.put_count(), 0);
    }

    #[test]
    fn test_delete_field() {
        let (store, storage) = seeded();
        assert_eq!(
            store.delete_field(&key(), "/profile/property1").unwrap(),
            WriteStatus::Deleted(1)
        );
        assert_eq!(storage.peek(&key()).unwrap(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><profile><description>Description stored as a profile.</description><name>profileItem</name></profile>"#);
        assert_eq!(store.metrics().field_deletes, 1);
    }

    #[test]
    fn test_delete_profile() {
        let (store, storage) = seeded();
        assert!(store.delete_profile(&key()).unwrap());
        assert!(!store.delete_profile(&key()).unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_field_exists_with_predicate() {
        let (store, _) = seeded();
        store
            .upsert_multi_dimension(&key(), "/profile/genre", ["g1", "g2"])
            .unwrap();
        assert!(store.field_exists(&key(), "/profile/genre[text()='g2']").unwrap());
        assert!(!store.field_exists(&key(), "/profile/genre[text()='g3']").unwrap());
        assert!(store.field_exists(&key(), "/profile/name").unwrap());
    }

    #[test]
    fn test_resolve_key() {
        let mapping = MemoryIdentityMapping::new();
        mapping.register("sku-9", 9).unwrap();
        let store = ProfileStore::new(MemoryStorage::new(), ProfileStoreOptions::default())
            .with_identity_mapping(mapping)
            .with_type_registry(MemoryTypeRegistry::from_names([("ITEM", 1)]));

        assert_eq!(
            store.resolve_key(2, &ItemRef::External("sku-9".into()), "ITEM").unwrap(),
            ProfileKey::new(2, 9, 1)
        );
        assert_eq!(
            store.resolve_key(2, &ItemRef::Internal(4), "ITEM").unwrap(),
            ProfileKey::new(2, 4, 1)
        );
        assert_eq!(
            store
                .resolve_key(2, &ItemRef::External("sku-0".into()), "ITEM")
                .unwrap_err()
                .code(),
            "PROFILE_UNKNOWN_ITEM"
        );
        assert_eq!(
            store.resolve_key(2, &ItemRef::Internal(4), "MOVIE").unwrap_err().code(),
            "PROFILE_UNKNOWN_ITEM_TYPE"
        );
    }

    #[test]
    fn test_lookups_need_collaborators() {
        let store = ProfileStore::new(MemoryStorage::new(), ProfileStoreOptions::default());
        assert!(matches!(
            store.items_by_item_type(1, "ITEM", 10),
            Err(ProfileError::MissingCollaborator(_))
        ));
    }

    #[test]
    fn test_items_by_dimension_value() {
        let storage = MemoryStorage::new();
        let store = ProfileStore::new(storage.clone(), ProfileStoreOptions::default())
            .with_type_registry(MemoryTypeRegistry::from_names([("ITEM", 1)]))
            .with_reverse_index(storage);
        for (item, genre) in [(1, "rock"), (2, "jazz"), (3, "rock")] {
            store
                .upsert_multi_dimension(&ProfileKey::new(1, item, 1), "/profile/genre", [genre])
                .unwrap();
        }

        let hits = store
            .items_by_dimension_value(1, "ITEM", "/profile/genre", "rock")
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|k| k.item_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(store.items_by_item_type(1, "ITEM", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_writes_without_locks() {
        let storage = MemoryStorage::new();
        let options = ProfileStoreOptions {
            serialize_writes: false,
            ..ProfileStoreOptions::default()
        };
        let store = ProfileStore::new(storage.clone(), options);
        store.upsert_simple_dimension(&key(), "/profile/id", "1").unwrap();
        assert_eq!(storage.put_count(), 1);
    }
}
