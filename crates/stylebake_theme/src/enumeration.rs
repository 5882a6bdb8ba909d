//! Iteration markers and their key sets
//!
//! A `$name` segment in a theme member chain (`theme.$intents.primary`,
//! `theme.sizes.$alert.gap`) is an iteration marker. It names an enumeration whose
//! id is the chain prefix up to and including the marker, with `$` stripped
//! (`intents`, `sizes.alert`).

use crate::error::{Result, ShapeError};
use crate::shape::ThemeShape;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of an iteration marker segment
pub const MARKER_PREFIX: char = '$';

/// A marker found in a member chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerRef {
    /// Enumeration id, e.g. `sizes.alert`
    pub enumeration: String,
    /// Index of the marker segment within the chain
    pub index: usize,
}

/// Find the first iteration marker in a theme member chain (segments after the
/// theme parameter).
pub fn find_marker<S: AsRef<str>>(chain: &[S]) -> Option<MarkerRef> {
    let index = chain
        .iter()
        .position(|s| is_marker_segment(s.as_ref()))?;
    let enumeration = chain[..=index]
        .iter()
        .map(|s| s.as_ref().trim_start_matches(MARKER_PREFIX))
        .collect::<Vec<_>>()
        .join(".");
    Some(MarkerRef { enumeration, index })
}

pub fn is_marker_segment(segment: &str) -> bool {
    segment.len() > 1 && segment.starts_with(MARKER_PREFIX)
}

/// Key sets for enumerations.
///
/// Explicit bindings win; otherwise the keys of the shape object at the
/// enumeration's path are used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Enumerations {
    bindings: IndexMap<String, Vec<String>>,
}

impl Enumerations {
    pub fn new(bindings: IndexMap<String, Vec<String>>) -> Self {
        Self { bindings }
    }

    pub fn bind(&mut self, id: impl Into<String>, keys: Vec<String>) {
        self.bindings.insert(id.into(), keys);
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Key set for an enumeration id
    pub fn keys(&self, id: &str, shape: &ThemeShape) -> Result<Vec<String>> {
        if let Some(keys) = self.bindings.get(id) {
            if keys.is_empty() {
                return Err(ShapeError::UnknownEnumeration(id.to_string()));
            }
            return Ok(keys.clone());
        }
        let segments: Vec<&str> = id.split('.').collect();
        match shape.keys_at(&segments) {
            Some(keys) if !keys.is_empty() => Ok(keys),
            _ => Err(ShapeError::UnknownEnumeration(id.to_string())),
        }
    }

    /// Stable description of the bindings for cache hashing
    pub fn fingerprint(&self) -> String {
        let mut ids: Vec<&String> = self.bindings.keys().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| format!("{}={}", id, self.bindings[id].join(",")))
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape() -> ThemeShape {
        ThemeShape::from_json(&json!({
            "intents": { "primary": { "primary": "#00f" }, "danger": { "primary": "#f00" } },
            "sizes": { "alert": { "sm": { "gap": 4 }, "md": { "gap": 8 } } },
            "radii": { "md": 8 },
        }))
        .unwrap()
    }

    #[test]
    fn test_find_marker() {
        assert_eq!(
            find_marker(&["$intents", "primary"]),
            Some(MarkerRef { enumeration: "intents".into(), index: 0 })
        );
        assert_eq!(
            find_marker(&["sizes", "$alert", "gap"]),
            Some(MarkerRef { enumeration: "sizes.alert".into(), index: 1 })
        );
        assert_eq!(find_marker(&["colors", "text"]), None);
        assert_eq!(find_marker(&["$"]), None);
    }

    #[test]
    fn test_keys_from_shape() {
        let enums = Enumerations::default();
        assert_eq!(enums.keys("intents", &shape()).unwrap(), vec!["primary", "danger"]);
        assert_eq!(enums.keys("sizes.alert", &shape()).unwrap(), vec!["sm", "md"]);
    }

    #[test]
    fn test_binding_overrides_shape() {
        let mut enums = Enumerations::default();
        enums.bind("intents", vec!["danger".into()]);
        assert_eq!(enums.keys("intents", &shape()).unwrap(), vec!["danger"]);
    }

    #[test]
    fn test_leaf_or_missing_enumeration_fails() {
        let enums = Enumerations::default();
        assert!(matches!(
            enums.keys("radii.md", &shape()),
            Err(ShapeError::UnknownEnumeration(_))
        ));
        assert!(enums.keys("typography", &shape()).is_err());
    }
}
