//! # Collaborator Traits
//!
//! The profile store owns no data. Storage, identity mapping, type lookup
//! and reverse search are supplied by the embedding application through
//! these traits.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::CollaboratorResult;

pub type TenantId = u32;
pub type ItemId = u32;
pub type ItemTypeId = u32;

/// Identity of one stored profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileKey {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub item_type_id: ItemTypeId,
}

impl ProfileKey {
    pub fn new(tenant_id: TenantId, item_id: ItemId, item_type_id: ItemTypeId) -> Self {
        Self {
            tenant_id,
            item_id,
            item_type_id,
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.item_type_id, self.item_id)
    }
}

/// How a caller names an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    /// Store-internal numeric id
    Internal(ItemId),
    /// Application-facing id, translated through [`IdentityMapping`]
    External(String),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Internal(id) => write!(f, "#{}", id),
            ItemRef::External(id) => write!(f, "{}", id),
        }
    }
}

/// Raw profile persistence
pub trait ProfileStorage: Send + Sync + fmt::Debug {
    /// Stored text, `None` if the item has no profile
    fn get(&self, key: &ProfileKey) -> CollaboratorResult<Option<String>>;

    /// Store text; `false` if the item is not known to the backend
    fn put(&self, key: &ProfileKey, text: &str) -> CollaboratorResult<bool>;

    /// Remove the stored text; `false` if there was none
    fn delete(&self, key: &ProfileKey) -> CollaboratorResult<bool>;
}

/// External item id to internal item id
pub trait IdentityMapping: Send + Sync + fmt::Debug {
    fn lookup(&self, external_id: &str) -> CollaboratorResult<Option<ItemId>>;
}

/// Item type name to item type id, per tenant
pub trait TypeRegistry: Send + Sync + fmt::Debug {
    fn id_of_type(&self, tenant_id: TenantId, type_name: &str)
        -> CollaboratorResult<Option<ItemTypeId>>;
}

/// Search over stored profiles
pub trait ReverseIndex: Send + Sync + fmt::Debug {
    /// Items of one type whose profile holds `value` at `path`
    fn find_items_by_field_value(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        path: &str,
        value: &str,
    ) -> CollaboratorResult<Vec<ProfileKey>>;

    /// Items of one type that have a profile, at most `limit`
    fn find_items_by_type(
        &self,
        tenant_id: TenantId,
        item_type_id: ItemTypeId,
        limit: usize,
    ) -> CollaboratorResult<Vec<ProfileKey>>;
}
