//! Path resolution against a document tree
//!
//! Resolution walks from the root and consumes one segment per level,
//! following the first child whose tag matches. Reads and writes share this
//! walk, so "the field exists" means the same thing on both sides.

use crate::document::{Document, Node, NodeAddress};
use crate::path::Path;

/// Outcome of walking a path as far as the document allows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'p> {
    /// Number of leading segments that matched, root included
    pub matched: usize,
    /// Deepest matched node; `None` when the root itself did not match
    pub last: Option<NodeAddress>,
    /// Segments left after the deepest match
    pub remaining: &'p [String],
}

impl Resolution<'_> {
    /// True if every segment matched
    pub fn is_complete(&self) -> bool {
        self.matched > 0 && self.remaining.is_empty()
    }
}

/// Stateless resolver over [`Document`] trees
pub struct PathResolver;

impl PathResolver {
    /// Walk `path` and report the longest matching prefix.
    ///
    /// The value predicate, if any, is ignored.
    pub fn resolve<'p>(doc: &Document, path: &'p Path) -> Resolution<'p> {
        let segments = path.segments();
        let root = doc.root();
        if root.tag() != segments[0] {
            return Resolution {
                matched: 0,
                last: None,
                remaining: segments,
            };
        }

        let mut node = root;
        let mut address = NodeAddress::root();
        let mut matched = 1;
        for segment in &segments[1..] {
            match node.position_of(segment) {
                Some(index) => {
                    node = &node.children()[index];
                    address.push(index);
                    matched += 1;
                }
                None => break,
            }
        }

        Resolution {
            matched,
            last: Some(address),
            remaining: &segments[matched..],
        }
    }

    /// Address of the node at `path`, if every segment resolves
    pub fn locate_exact(doc: &Document, path: &Path) -> Option<NodeAddress> {
        let resolution = Self::resolve(doc, path);
        if resolution.is_complete() {
            resolution.last
        } else {
            None
        }
    }

    /// The node at `path`, if every segment resolves
    pub fn resolve_exact<'d>(doc: &'d Document, path: &Path) -> Option<&'d Node> {
        Self::locate_exact(doc, path).and_then(|address| doc.node_at(&address))
    }

    /// Every node addressed by `path`: ancestors resolve normally, then all
    /// children of the parent carrying the last tag, in document order.
    pub fn resolve_all_siblings<'d>(doc: &'d Document, path: &Path) -> Vec<&'d Node> {
        let Some(parent) = path.parent() else {
            return Self::resolve_exact(doc, path).into_iter().collect();
        };
        match Self::resolve_exact(doc, &parent) {
            Some(node) => node.children_tagged(path.leaf()).collect(),
            None => Vec::new(),
        }
    }

    /// The node among the siblings addressed by `path` whose text content
    /// equals `literal`.
    ///
    /// Only the children of the path's own parent are searched.
    pub fn find_value<'d>(doc: &'d Document, path: &Path, literal: &str) -> Option<&'d Node> {
        Self::resolve_all_siblings(doc, path)
            .into_iter()
            .find(|node| node.text_content() == literal)
    }

    /// Existence check: honors the path's value predicate when present
    pub fn exists(doc: &Document, path: &Path) -> bool {
        match path.predicate() {
            Some(literal) => Self::find_value(doc, path, literal).is_some(),
            None => Self::locate_exact(doc, path).is_some(),
        }
    }
}
