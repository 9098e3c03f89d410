//! Hierarchical location keys.
//!
//! A [`PathKey`] is an ordered list of segments such as `dir1/dir2/dir3`. It
//! addresses a node in a [`PathTree`](crate::domain::PathTree) and, in the
//! generator, a directory relative to the root directory.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, RangeBounds};
use std::path::{Component, Path};

use crate::domain::error::{DomainError, DomainResult};

/// Separator used when none is given explicitly.
pub const DEFAULT_SEPARATOR: char = '/';

/// Ordered sequence of location segments.
///
/// The empty key is valid and denotes the root location. Equality and hashing
/// only look at the segments, so `a/b` and `a\b` (with `\` as separator) are
/// the same key.
#[derive(Debug, Clone)]
pub struct PathKey {
    segments: Vec<String>,
    separator: char,
}

impl PathKey {
    /// The root location (no segments).
    pub fn root(separator: char) -> Self {
        Self {
            segments: Vec::new(),
            separator,
        }
    }

    /// Split `raw` on `separator`.
    ///
    /// The empty string yields the root key. Empty segments between two
    /// separators are kept (`a//b` has three segments).
    pub fn parse(raw: &str, separator: char) -> Self {
        if raw.is_empty() {
            return Self::root(separator);
        }
        Self {
            segments: raw.split(separator).map(str::to_string).collect(),
            separator,
        }
    }

    /// Build a key from already split segments.
    ///
    /// Fails if a segment contains the separator.
    pub fn from_segments<I, S>(segments: I, separator: char) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if let Some(bad) = segments.iter().find(|s| s.contains(separator)) {
            return Err(DomainError::InvalidLocation {
                location: bad.clone(),
                reason: format!("segment contains separator '{separator}'"),
            });
        }
        Ok(Self {
            segments,
            separator,
        })
    }

    /// Build a key from a relative filesystem path.
    ///
    /// `.` components are skipped, so `.` and `""` both map to the root key.
    /// Absolute paths and `..` components are rejected: a relative directory
    /// must stay below the root it is relative to.
    pub fn from_relative_path(path: &Path) -> DomainResult<Self> {
        let mut key = Self::default();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| DomainError::InvalidLocation {
                        location: path.display().to_string(),
                        reason: "path is not valid UTF-8".to_string(),
                    })?;
                    key.push(name);
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DomainError::InvalidLocation {
                        location: path.display().to_string(),
                        reason: "expected a relative path below the root".to_string(),
                    });
                }
            }
        }
        Ok(key)
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().map(String::as_str)
    }

    /// All but the last segment. The root key is its own parent.
    pub fn parent(&self) -> Self {
        self.slice(..self.segment_count().saturating_sub(1))
    }

    /// Growing prefixes: `a`, `a/b`, `a/b/c`.
    pub fn cumulative(&self) -> impl Iterator<Item = PathKey> + '_ {
        (1..=self.segment_count()).map(move |end| self.slice(..end))
    }

    /// New key over a sub-range of the segments.
    ///
    /// Bounds past the end are clamped, and an inverted range gives the
    /// empty key instead of panicking.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let len = self.segments.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);

        let segments = if start < end {
            self.segments[start..end].to_vec()
        } else {
            Vec::new()
        };
        Self {
            segments,
            separator: self.separator,
        }
    }

    /// `self ++ other` as a new key.
    pub fn concat(&self, other: &PathKey) -> DomainResult<Self> {
        let mut joined = self.clone();
        joined.extend(other)?;
        Ok(joined)
    }

    /// Append `other` in place.
    pub fn extend(&mut self, other: &PathKey) -> DomainResult<()> {
        if self.separator != other.separator {
            return Err(DomainError::SeparatorMismatch {
                left: self.separator,
                right: other.separator,
            });
        }
        self.segments.extend(other.segments.iter().cloned());
        Ok(())
    }

    /// Join the segments with `separator` instead of the key's own one.
    pub fn to_string_with(&self, separator: char) -> String {
        let mut buf = [0u8; 4];
        self.segments.join(separator.encode_utf8(&mut buf))
    }
}

impl Default for PathKey {
    fn default() -> Self {
        Self::root(DEFAULT_SEPARATOR)
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(self.separator))
    }
}

impl From<&str> for PathKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw, DEFAULT_SEPARATOR)
    }
}
