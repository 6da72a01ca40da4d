//! Field paths
//!
//! Paths address a field inside a profile document, e.g. `/profile/name`,
//! or a single value of a repeatable field, e.g.
//! `/profile/genre[text()='g1']`.

mod errors;
mod syntax;

pub use errors::{PathResult, PathSyntaxError};
pub use syntax::{is_valid_segment, Path};
