//! # In-Memory Collaborators
//!
//! Map-backed implementations of every collaborator trait. Handles are
//! cheap to clone and share state, so a test can keep one handle for
//! inspection while the store owns another.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::collaborators::{
    IdentityMapping, ItemId, ItemTypeId, ProfileKey, ProfileStorage, ReverseIndex, TenantId,
    TypeRegistry,
};
use super::errors::{CollaboratorError, CollaboratorResult};
use super::scan::ValueQuery;

#[derive(Debug, Default)]
struct MemoryInner {
    profiles: RwLock<BTreeMap<ProfileKey, String>>,
    /// Known items; `None` accepts every key
    catalog: RwLock<Option<BTreeSet<ProfileKey>>>,
    gets: AtomicU64,
    puts: AtomicU64,
    unavailable: AtomicBool,
}

/// Profile storage held in a sorted map
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

impl MemoryStorage {
    /// Storage accepting puts for any key
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage accepting puts only for keys in `catalog`
    pub fn with_catalog<I>(catalog: I) -> Self
    where
        I: IntoIterator<Item = ProfileKey>,
    {
        let storage = Self::new();
        if let Ok(mut slot) = storage.inner.catalog.write() {
            *slot = Some(catalog.into_iter().collect());
        }
        storage
    }

    /// Seed a profile without counting a put
    pub fn insert_raw(&self, key: ProfileKey, text: impl Into<String>) -> CollaboratorResult<()> {
        self.profiles_mut()?.insert(key, text.into());
        Ok(())
    }

    /// Make every subsequent call fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get` calls answered
    pub fn get_count(&self) -> u64 {
        self.inner.gets.load(Ordering::SeqCst)
    }

    /// Number of `put` calls answered
    pub fn put_count(&self) -> u64 {
        self.inner.puts.load(Ordering::SeqCst)
    }

    /// Stored text without counting a get
    pub fn peek(&self, key: &ProfileKey) -> Option<String> {
        self.inner
            .profiles
            .read()
            .ok()
            .and_then(|profiles| profiles.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.profiles.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> CollaboratorResult<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("memory storage offline".into()));
        }
        Ok(())
    }

    fn profiles_mut(
        &self,
    ) -> CollaboratorResult<std::sync::RwLockWriteGuard<'_, BTreeMap<ProfileKey, String>>> {
        self.inner
            .profiles
            .write()
            .map_err(|_| CollaboratorError::Poisoned("memory profiles"))
    }

    fn is_registered(&self, key: &ProfileKey) -> CollaboratorResult<bool> {
        let catalog = self
            .inner
            .catalog
            .read()
            .map_err(|_| CollaboratorError::Poisoned("memory catalog"))?;
        Ok(catalog.as_ref().map_or(true, |known| known.contains(key)))
    }

    fn scan<F>(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        mut keep: F,
    ) -> CollaboratorResult<Vec<ProfileKey>>
    where
        F: FnMut(&ProfileKey, &str) -> bool,
    {
        self.check_available()?;
        let profiles = self
            .inner
            .profiles
            .read()
            .map_err(|_| CollaboratorError::Poisoned("memory profiles"))?;
        Ok(profiles
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id && key.item_type_id == item_type_id)
            .filter(|(key, text)| keep(key, text))
            .map(|(key, _)| *key)
            .collect())
    }
}

impl ProfileStorage for MemoryStorage {
    fn get(&self, key: &ProfileKey) -> CollaboratorResult<Option<String>> {
        self.check_available()?;
        self.inner.gets.fetch_add(1, Ordering::SeqCst);
        let profiles = self
            .inner
            .profiles
            .read()
            .map_err(|_| CollaboratorError::Poisoned("memory profiles"))?;
        Ok(profiles.get(key).cloned())
    }

    fn put(&self, key: &ProfileKey, text: &str) -> CollaboratorResult<bool> {
        self.check_available()?;
        self.inner.puts.fetch_add(1, Ordering::SeqCst);
        if !self.is_registered(key)? {
            return Ok(false);
        }
        self.profiles_mut()?.insert(*key, text.to_string());
        Ok(true)
    }

    fn delete(&self, key: &ProfileKey) -> CollaboratorResult<bool> {
        self.check_available()?;
        Ok(self.profiles_mut()?.remove(key).is_some())
    }
}

impl ReverseIndex for MemoryStorage {
    fn find_items_by_field_value(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        path: &str,
        value: &str,
    ) -> CollaboratorResult<Vec<ProfileKey>> {
        let query = ValueQuery::new(path, value)?;
        self.scan(tenant_id, item_type_id, |key, text| query.matches(key, text))
    }

    fn find_items_by_type(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        limit: usize,
    ) -> CollaboratorResult<Vec<ProfileKey>> {
        let mut keys = self.scan(tenant_id, item_type_id, |_, _| true)?;
        keys.truncate(limit);
        Ok(keys)
    }
}

/// External id table
#[derive(Debug, Default)]
pub struct MemoryIdentityMapping {
    ids: RwLock<HashMap<String, ItemId>>,
}

impl MemoryIdentityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        external_id: impl Into<String>,
        item_id: ItemId,
    ) -> CollaboratorResult<()> {
        self.ids
            .write()
            .map_err(|_| CollaboratorError::Poisoned("identity mapping"))?
            .insert(external_id.into(), item_id);
        Ok(())
    }
}

impl IdentityMapping for MemoryIdentityMapping {
    fn lookup(&self, external_id: &str) -> CollaboratorResult<Option<ItemId>> {
        let ids = self
            .ids
            .read()
            .map_err(|_| CollaboratorError::Poisoned("identity mapping"))?;
        Ok(ids.get(external_id).copied())
    }
}

/// Type name table, shared by every tenant unless overridden
#[derive(Debug, Default)]
pub struct MemoryTypeRegistry {
    shared: HashMap<String, ItemTypeId>,
    per_tenant: HashMap<(TenantId, String), ItemTypeId>,
}

impl MemoryTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose names resolve the same for every tenant
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (S, ItemTypeId)>,
        S: Into<String>,
    {
        Self {
            shared: names.into_iter().map(|(name, id)| (name.into(), id)).collect(),
            per_tenant: HashMap::new(),
        }
    }

    /// Override one name for one tenant
    pub fn with_tenant_type(
        mut self,
        tenant_id: TenantId,
        name: impl Into<String>,
        id: ItemTypeId,
    ) -> Self {
        self.per_tenant.insert((tenant_id, name.into()), id);
        self
    }
}

impl TypeRegistry for MemoryTypeRegistry {
    fn id_of_type(
        &self,
        tenant_id: TenantId,
        type_name: &str,
    ) -> CollaboratorResult<Option<ItemTypeId>> {
        Ok(self
            .per_tenant
            .get(&(tenant_id, type_name.to_string()))
            .or_else(|| self.shared.get(type_name))
            .copied())
    }
}
