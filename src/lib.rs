//! profiledb - path-addressed attribute profiles
//!
//! Items carry a profile: a small markup document with one fixed root tag.
//! Fields are addressed by absolute paths such as `/profile/genre` and read,
//! set, extended or removed without the caller handling the document.

pub mod cli;
pub mod document;
pub mod engine;
pub mod observability;
pub mod path;
pub mod store;
