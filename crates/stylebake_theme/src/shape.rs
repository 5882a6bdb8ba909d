//! Theme shape descriptor
//!
//! A shape is the structure of a theme (which keys exist, which are objects and
//! which are scalar leaves) with the concrete values stripped. It is built from any
//! theme instance and acts as the oracle for proxy reads during extraction.

use crate::error::{Result, ShapeError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use stylebake_core::{digest_hex, sort_keys};

/// Kind of a scalar position in the theme
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeafKind {
    String,
    Number,
    Bool,
    Null,
    Array,
}

impl LeafKind {
    fn tag(self) -> &'static str {
        match self {
            LeafKind::String => "s",
            LeafKind::Number => "n",
            LeafKind::Bool => "b",
            LeafKind::Null => "z",
            LeafKind::Array => "a",
        }
    }
}

/// One node of the theme shape
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeNode {
    Object(IndexMap<String, Arc<ShapeNode>>),
    Leaf(LeafKind),
}

impl ShapeNode {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => ShapeNode::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Arc::new(ShapeNode::from_value(v))))
                    .collect(),
            ),
            Value::Array(_) => ShapeNode::Leaf(LeafKind::Array),
            Value::String(_) => ShapeNode::Leaf(LeafKind::String),
            Value::Number(_) => ShapeNode::Leaf(LeafKind::Number),
            Value::Bool(_) => ShapeNode::Leaf(LeafKind::Bool),
            Value::Null => ShapeNode::Leaf(LeafKind::Null),
        }
    }

    /// Child node for `key`, if this is an object containing it
    pub fn get(&self, key: &str) -> Option<&Arc<ShapeNode>> {
        match self {
            ShapeNode::Object(map) => map.get(key),
            ShapeNode::Leaf(_) => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ShapeNode::Object(_))
    }

    /// Object keys in property order (empty for leaves)
    pub fn keys(&self) -> Vec<String> {
        match self {
            ShapeNode::Object(map) => {
                let mut keys: Vec<String> = map.keys().cloned().collect();
                sort_keys(&mut keys);
                keys
            }
            ShapeNode::Leaf(_) => Vec::new(),
        }
    }

    fn describe(&self, out: &mut String) {
        match self {
            ShapeNode::Leaf(kind) => out.push_str(kind.tag()),
            ShapeNode::Object(map) => {
                out.push('{');
                for (key, child) in map {
                    let _ = write!(out, "{}:{}:", key.len(), key);
                    child.describe(out);
                    out.push(',');
                }
                out.push('}');
            }
        }
    }
}

/// A complete theme shape with its structural fingerprint
#[derive(Clone, Debug)]
pub struct ThemeShape {
    root: Arc<ShapeNode>,
    fingerprint: String,
}

impl ThemeShape {
    /// Build a shape from a theme instance
    pub fn from_json(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ShapeError::NotAnObject);
        }
        let root = ShapeNode::from_value(value);
        let mut description = String::new();
        root.describe(&mut description);
        Ok(Self {
            root: Arc::new(root),
            fingerprint: digest_hex(description.as_bytes()),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let value: Value = toml::from_str(text)?;
        Self::from_json(&value)
    }

    /// Load a theme instance from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ShapeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let shape = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            Some("toml") => Self::from_toml_str(&text)?,
            other => {
                return Err(ShapeError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };
        tracing::debug!(path = %path.display(), fingerprint = %shape.fingerprint, "Loaded theme shape");
        Ok(shape)
    }

    pub fn root(&self) -> &Arc<ShapeNode> {
        &self.root
    }

    /// Hash of the structure (keys, order and leaf kinds)
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Node at a property path
    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Arc<ShapeNode>> {
        let mut node = &self.root;
        for segment in segments {
            node = node.get(segment.as_ref())?;
        }
        Some(node)
    }

    /// Keys of the object at a path, `None` when absent or not an object
    pub fn keys_at<S: AsRef<str>>(&self, segments: &[S]) -> Option<Vec<String>> {
        self.lookup(segments)
            .filter(|node| node.is_object())
            .map(|node| node.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_and_keys() {
        let shape = ThemeShape::from_json(&json!({
            "colors": { "text": { "primary": "#000", "secondary": "#333" } },
            "spacing": { "md": 8 },
        }))
        .unwrap();

        assert!(shape.lookup(&["colors", "text"]).unwrap().is_object());
        assert_eq!(
            **shape.lookup(&["spacing", "md"]).unwrap(),
            ShapeNode::Leaf(LeafKind::Number)
        );
        assert_eq!(
            shape.keys_at(&["colors", "text"]),
            Some(vec!["primary".to_string(), "secondary".to_string()])
        );
        assert_eq!(shape.keys_at(&["spacing", "md"]), None);
        assert!(shape.lookup(&["colors", "missing"]).is_none());
    }

    #[test]
    fn test_fingerprint_ignores_values() {
        let light = ThemeShape::from_json(&json!({ "colors": { "bg": "#fff" } })).unwrap();
        let dark = ThemeShape::from_json(&json!({ "colors": { "bg": "#000" } })).unwrap();
        let other = ThemeShape::from_json(&json!({ "colors": { "background": "#000" } })).unwrap();
        assert_eq!(light.fingerprint(), dark.fingerprint());
        assert_ne!(light.fingerprint(), other.fingerprint());
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(matches!(
            ThemeShape::from_json(&json!([1, 2])),
            Err(ShapeError::NotAnObject)
        ));
    }

    #[test]
    fn test_toml_shape() {
        let shape = ThemeShape::from_toml_str(
            r##"
            [intents.primary]
            primary = "#3b82f6"
            contrast = "#ffffff"

            [intents.danger]
            primary = "#ef4444"
            contrast = "#ffffff"
            "##,
        )
        .unwrap();
        assert_eq!(
            shape.keys_at(&["intents"]),
            Some(vec!["primary".to_string(), "danger".to_string()])
        );
    }
}
