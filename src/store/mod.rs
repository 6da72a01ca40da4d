//! # Profile Store
//!
//! Stored-profile access on top of the attribute engine.
//!
//! ## Design Principles
//!
//! - Exactly one storage read and at most one storage write per call
//! - A write the engine reports as unchanged or not found is never stored
//! - Malformed stored text fails the call; it is never replaced
//! - Collaborator failures surface unchanged, without retry
//!
//! Persistence, identity mapping, type lookup and search are collaborators
//! behind the traits in [`collaborators`]. In-memory and local-filesystem
//! implementations are provided.

pub mod collaborators;
pub mod errors;
pub mod local;
pub mod locks;
pub mod memory;
pub mod profile_store;
mod scan;

pub use collaborators::{
    IdentityMapping, ItemId, ItemRef, ItemTypeId, ProfileKey, ProfileStorage, ReverseIndex,
    TenantId, TypeRegistry,
};
pub use errors::{CollaboratorError, CollaboratorResult, ProfileError, ProfileResult};
pub use local::{LocalStorage, ProfileRecord};
pub use locks::KeyLocks;
pub use memory::{MemoryIdentityMapping, MemoryStorage, MemoryTypeRegistry};
pub use profile_store::{ProfileStore, ProfileStoreOptions, DEFAULT_ROOT_TAG};
