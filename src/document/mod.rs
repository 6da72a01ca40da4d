//! Profile documents
//!
//! A profile is an ordered markup tree with one fixed root tag per document
//! family. This module owns the tree model and the codec that moves it to and
//! from stored text.
//!
//! # Design Principles
//!
//! - Explicit node variants: elements hold children, leaves hold text
//! - Codec is a plain value with no shared state
//! - Canonical output: same tree, same bytes
//! - Malformed input is an error, never an empty document

mod codec;
mod errors;
mod node;

pub use codec::{DeclarationPolicy, DocumentCodec, MAX_DEPTH};
pub use errors::{ParseError, ParseResult};
pub use node::{Attribute, Document, Node, NodeAddress, TextLeaf};
