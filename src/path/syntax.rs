//! Slash-delimited field paths
//!
//! Grammar:
//!
//! ```text
//! path      := '/' segment ( '/' segment )* predicate?
//! segment   := name-start name-char*
//! predicate := "[text()=" quoted "]"
//! quoted    := "'" [^']* "'" | '"' [^"]* '"'
//! ```
//!
//! `name-start` is a letter or `_`; `name-char` adds digits, `-` and `.`.
//! Empty segments (`//`), a trailing `/`, `/` alone and the empty string are
//! rejected. The first `[` opens the predicate, so the literal may contain
//! `/`. A predicate anywhere but after the last segment is malformed.
//! A path may have at most [`MAX_DEPTH`] segments, the nesting the codec
//! reads back.

use std::fmt;
use std::str::FromStr;

use super::errors::{PathResult, PathSyntaxError};
use crate::document::MAX_DEPTH;

const PREDICATE_OPEN: &str = "[text()=";

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
    predicate: Option<String>,
}

/// True if `segment` is a valid tag name for a path segment
pub fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn check_depth(raw: &str, depth: usize) -> PathResult<()> {
    if depth > MAX_DEPTH {
        return Err(PathSyntaxError::TooDeep {
            path: raw.to_string(),
            limit: MAX_DEPTH,
        });
    }
    Ok(())
}

impl Path {
    /// Parse a raw path string
    pub fn parse(raw: &str) -> PathResult<Self> {
        if raw.is_empty() {
            return Err(PathSyntaxError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PathSyntaxError::NotAbsolute(raw.to_string()));
        }

        let (body, predicate) = match raw.find('[') {
            Some(idx) => (&raw[..idx], Some(parse_predicate(raw, &raw[idx..])?)),
            None => (raw, None),
        };

        let body = &body[1..];
        if body.is_empty() {
            return Err(PathSyntaxError::Empty);
        }

        let mut segments = Vec::new();
        for (position, segment) in body.split('/').enumerate() {
            if segment.is_empty() {
                return Err(PathSyntaxError::EmptySegment {
                    path: raw.to_string(),
                    position,
                });
            }
            if !is_valid_segment(segment) {
                return Err(PathSyntaxError::InvalidSegment {
                    path: raw.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        check_depth(raw, segments.len())?;

        Ok(Self {
            segments,
            predicate,
        })
    }

    /// Build a path from already separated segments
    pub fn from_segments<I, S>(segments: I) -> PathResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathSyntaxError::Empty);
        }
        let joined = format!("/{}", segments.join("/"));
        for segment in &segments {
            if !is_valid_segment(segment) {
                return Err(PathSyntaxError::InvalidSegment {
                    path: joined,
                    segment: segment.clone(),
                });
            }
        }
        check_depth(&joined, segments.len())?;
        Ok(Self {
            segments,
            predicate: None,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments, root included
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a parsed path has at least the root segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The root segment
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// The last segment
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// True if the path addresses only the root
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn predicate(&self) -> Option<&str> {
        self.predicate.as_deref()
    }

    /// The path without its last segment; `None` for a root-only path
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(self.prefix(self.segments.len() - 1))
    }

    /// The first `len` segments, without predicate
    pub fn prefix(&self, len: usize) -> Path {
        let len = len.clamp(1, self.segments.len());
        Path {
            segments: self.segments[..len].to_vec(),
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, value: impl Into<String>) -> Path {
        self.predicate = Some(value.into());
        self
    }

    pub fn without_predicate(&self) -> Path {
        Path {
            segments: self.segments.clone(),
            predicate: None,
        }
    }

    /// Reject a path carrying a value predicate
    pub fn require_plain(&self) -> PathResult<&Self> {
        match self.predicate {
            Some(_) => Err(PathSyntaxError::UnexpectedPredicate(self.to_string())),
            None => Ok(self),
        }
    }

    /// Split into parent path and leaf tag
    pub fn split_leaf(&self) -> PathResult<(Path, &str)> {
        match self.parent() {
            Some(parent) => Ok((parent, self.leaf())),
            None => Err(PathSyntaxError::NoParent(self.to_string())),
        }
    }
}

fn parse_predicate(raw: &str, source: &str) -> PathResult<String> {
    let malformed = || PathSyntaxError::MalformedPredicate(raw.to_string());
    let quoted = source
        .strip_prefix(PREDICATE_OPEN)
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(malformed)?;
    let quote = match quoted.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(malformed()),
    };
    let inner = quoted
        .strip_prefix(quote)
        .and_then(|s| s.strip_suffix(quote))
        .ok_or_else(malformed)?;
    if inner.contains(quote) {
        return Err(malformed());
    }
    Ok(inner.to_string())
}

impl FromStr for Path {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        if let Some(value) = &self.predicate {
            let quote = if value.contains('\'') { '"' } else { '\'' };
            write!(f, "{}{}{}{}]", PREDICATE_OPEN, quote, value, quote)?;
        }
        Ok(())
    }
}
