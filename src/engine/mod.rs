//! Path-addressed attribute engine
//!
//! Resolves field paths against profile documents, synthesizes missing
//! structure on write, and applies the write-avoidance and set policies.
//!
//! # Invariants
//!
//! - New nodes are appended after existing siblings; nothing is reordered
//! - A write either yields a complete new document or fails
//! - A write that changes nothing reports `Unchanged`
//! - Reads and writes resolve paths with the same walk
//!
//! The engine performs no I/O and holds no state between calls.

mod attributes;
mod errors;
mod resolver;
mod status;
mod synthesizer;

pub use attributes::AttributeEngine;
pub use errors::{EngineError, EngineResult};
pub use resolver::{PathResolver, Resolution};
pub use status::{Mutation, WriteStatus};
pub use synthesizer::{LeafContent, StructureSynthesizer};
