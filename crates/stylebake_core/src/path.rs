//! Theme property paths

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// A chain of property names read from the theme, e.g. `["colors", "text", "primary"]`.
///
/// Paths are only ever produced by real proxy traversals, so every path denotes a
/// read that is valid against the theme shape used during extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemePath(SmallVec<[String; 4]>);

impl ThemePath {
    /// The empty path (the theme object itself)
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Extend this path by one property name
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, if any
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for ThemePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for ThemePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&[&str]> for ThemePath {
    fn from(segments: &[&str]) -> Self {
        segments.iter().copied().collect()
    }
}
