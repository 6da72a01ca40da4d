//! Missing-structure synthesis
//!
//! Builds the chain of nodes a write needs below the deepest existing
//! ancestor. New nodes are always appended after existing siblings; nothing
//! already in the document moves.

use crate::document::{Document, Node, NodeAddress, TextLeaf};

use super::errors::{EngineError, EngineResult};

/// What the deepest synthesized node should hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafContent<'v> {
    /// Simple dimension: a leaf carrying the value
    Text(&'v str),
    /// Multi dimension: an empty element awaiting value leaves
    Children,
}

/// Stateless structure synthesizer
pub struct StructureSynthesizer;

impl StructureSynthesizer {
    /// Append `missing` as a chain under the node at `ancestor`.
    ///
    /// Returns the address of the deepest new node, or `ancestor` itself
    /// when `missing` is empty.
    ///
    /// # Errors
    ///
    /// `MixedContent` if the ancestor is a leaf holding text,
    /// `DanglingAddress` if `ancestor` does not address a node of `doc`.
    pub fn synthesize(
        doc: &mut Document,
        ancestor: &NodeAddress,
        missing: &[String],
        content: LeafContent<'_>,
    ) -> EngineResult<NodeAddress> {
        let Some((last, intermediate)) = missing.split_last() else {
            return Ok(ancestor.clone());
        };

        let mut chain = match content {
            LeafContent::Text(value) => Node::leaf(last.as_str(), value),
            LeafContent::Children => Node::element(last.as_str()),
        };
        for segment in intermediate.iter().rev() {
            chain = Node::element(segment.as_str()).with_child(chain);
        }

        let index = Self::append_child(doc, ancestor, chain)?;

        let mut deepest = ancestor.child(index);
        for _ in intermediate {
            deepest.push(0);
        }
        Ok(deepest)
    }

    /// Append `child` as the last child of the node at `parent`, returning
    /// its index. Fails like `synthesize` on a bad parent.
    pub fn append_child(
        doc: &mut Document,
        parent: &NodeAddress,
        child: Node,
    ) -> EngineResult<usize> {
        let Some(node) = doc.node_at_mut(parent) else {
            return Err(EngineError::DanglingAddress(parent.clone()));
        };
        let parent_tag = node.tag().to_string();
        match node.children_mut() {
            Ok(children) => {
                children.push(child);
                Ok(children.len() - 1)
            }
            Err(TextLeaf) => Err(EngineError::MixedContent {
                parent: parent_tag,
                child: child.tag().to_string(),
            }),
        }
    }
}
