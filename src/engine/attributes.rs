//! Attribute engine
//!
//! Get, upsert and delete of profile fields addressed by path.
//!
//! Every write takes the document by value and hands back a [`Mutation`].
//! On error the document is dropped, so a failed write can never leak a
//! half-built tree to the caller. A write that would not change the document
//! reports `Unchanged` and returns it untouched; callers must then skip
//! persistence.

use std::collections::{BTreeSet, HashSet};

use crate::document::{Document, Node, NodeAddress};
use crate::path::Path;

use super::errors::{EngineError, EngineResult};
use super::resolver::PathResolver;
use super::status::{Mutation, WriteStatus};
use super::synthesizer::{LeafContent, StructureSynthesizer};

/// Stateless attribute engine
pub struct AttributeEngine;

impl AttributeEngine {
    /// Text content of the single node at `path`
    pub fn get_simple(doc: &Document, path: &Path) -> EngineResult<Option<String>> {
        path.require_plain()?;
        Ok(PathResolver::resolve_exact(doc, path).map(|node| node.text_content().into_owned()))
    }

    /// Distinct text contents of every node at `path`
    pub fn get_multi(doc: &Document, path: &Path) -> EngineResult<BTreeSet<String>> {
        path.require_plain()?;
        Ok(PathResolver::resolve_all_siblings(doc, path)
            .into_iter()
            .map(|node| node.text_content().into_owned())
            .collect())
    }

    /// Set the single value at `path`, creating missing structure.
    ///
    /// - same value already stored → `Unchanged`
    /// - different value stored → overwritten in place, `Updated`
    /// - field missing → missing suffix appended under the deepest
    ///   existing ancestor, `Inserted(1)`
    pub fn upsert_simple(mut doc: Document, path: &Path, value: &str) -> EngineResult<Mutation> {
        path.require_plain()?;
        path.split_leaf()?;

        if let Some(node) =
            PathResolver::locate_exact(&doc, path).and_then(|address| doc.node_at_mut(&address))
        {
            if node.text_content() == value {
                return Ok(Mutation::unchanged(doc));
            }
            node.set_text(value);
            return Ok(Mutation::new(doc, WriteStatus::Updated));
        }

        let (ancestor, missing) = Self::deepest_existing(&doc, path)?;
        StructureSynthesizer::synthesize(&mut doc, &ancestor, missing, LeafContent::Text(value))?;
        Ok(Mutation::new(doc, WriteStatus::Inserted(1)))
    }

    /// Add values to the repeatable field at `path`.
    ///
    /// Candidates are deduplicated; those already present under the field's
    /// parent are dropped. The remaining ones are appended as new leaves in
    /// input order under the parent, which is created if missing.
    pub fn upsert_multi<I, S>(mut doc: Document, path: &Path, values: I) -> EngineResult<Mutation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        path.require_plain()?;
        let (parent, leaf) = path.split_leaf()?;

        let mut seen = HashSet::new();
        let candidates: Vec<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|value| seen.insert(value.clone()))
            .filter(|value| PathResolver::find_value(&doc, path, value).is_none())
            .collect();

        if candidates.is_empty() {
            return Ok(Mutation::unchanged(doc));
        }

        // The parent is always re-resolved from the truncated path, never
        // taken from the existence scan above.
        let (ancestor, missing) = Self::deepest_existing(&doc, &parent)?;
        let parent_address =
            StructureSynthesizer::synthesize(&mut doc, &ancestor, missing, LeafContent::Children)?;

        let inserted = candidates.len();
        for value in candidates {
            StructureSynthesizer::append_child(&mut doc, &parent_address, Node::leaf(leaf, value))?;
        }
        Ok(Mutation::new(doc, WriteStatus::Inserted(inserted)))
    }

    /// Detach every node at `path` from its parent.
    ///
    /// Removes the whole field, all values of a repeatable one included.
    pub fn delete_field(mut doc: Document, path: &Path) -> EngineResult<Mutation> {
        path.require_plain()?;
        let (parent, leaf) = path.split_leaf()?;

        let Some(node) =
            PathResolver::locate_exact(&doc, &parent).and_then(|address| doc.node_at_mut(&address))
        else {
            return Ok(Mutation::new(doc, WriteStatus::NotFound));
        };
        let removed = match node {
            Node::Element { children, .. } => {
                let before = children.len();
                children.retain(|child| child.tag() != leaf);
                before - children.len()
            }
            Node::Leaf { .. } => 0,
        };

        let status = if removed == 0 {
            WriteStatus::NotFound
        } else {
            WriteStatus::Deleted(removed)
        };
        Ok(Mutation::new(doc, status))
    }

    /// Deepest existing node along `path` and the segments missing below it.
    ///
    /// Equivalent to trimming trailing segments until the prefix resolves:
    /// the resolver's walk stops exactly at the longest resolvable prefix.
    fn deepest_existing<'p>(
        doc: &Document,
        path: &'p Path,
    ) -> EngineResult<(NodeAddress, &'p [String])> {
        let resolution = PathResolver::resolve(doc, path);
        match resolution.last {
            Some(address) => Ok((address, resolution.remaining)),
            None => Err(EngineError::PathOutsideDocument {
                path: path.to_string(),
                root: doc.root().tag().to_string(),
            }),
        }
    }
}
