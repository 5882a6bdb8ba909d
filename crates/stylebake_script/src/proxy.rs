//! Theme instrumentation proxy
//!
//! The proxy stands in for a concrete theme during extraction. Reading a key that
//! is an object in the shape yields another proxy node; reading a scalar or array
//! leaf yields a tracked value carrying its path; reading an absent key yields
//! `undefined`. Nothing about the concrete theme values is ever consulted.

use crate::error::{EvalError, Result};
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use std::sync::Arc;
use stylebake_core::{ThemeExpr, ThemePath};
use stylebake_theme::{is_marker_segment, ShapeNode, ThemeShape, MARKER_PREFIX};

/// Enumeration id to the key bound for the current shadow run
pub type MarkerBindings = FxHashMap<String, String>;

/// An object position inside the instrumented theme
#[derive(Clone, Debug)]
pub struct ThemeNode {
    path: ThemePath,
    shape: Arc<ShapeNode>,
    markers: Rc<MarkerBindings>,
}

impl ThemeNode {
    pub fn path(&self) -> &ThemePath {
        &self.path
    }

    pub fn shape(&self) -> &Arc<ShapeNode> {
        &self.shape
    }

    pub fn keys(&self) -> Vec<String> {
        self.shape.keys()
    }

    /// True when both nodes have the same structure below them
    pub fn same_shape(&self, other: &ThemeNode) -> bool {
        Arc::ptr_eq(&self.shape, &other.shape) || self.shape == other.shape
    }

    /// Observe a property read
    pub fn read(&self, key: &str) -> Result<Value> {
        if !is_marker_segment(key) {
            return Ok(match self.shape.get(key) {
                Some(node) => self.step(self.path.child(key), node),
                None => Value::Undefined,
            });
        }

        let name = key.trim_start_matches(MARKER_PREFIX);
        let enumeration = self
            .path
            .segments()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join(".");
        let bound = self
            .markers
            .get(&enumeration)
            .ok_or_else(|| EvalError::UnboundMarker(enumeration.clone()))?;

        let node = self.shape.get(name).and_then(|group| group.get(bound));
        Ok(match node {
            Some(node) => self.step(self.path.child(name).child(bound.as_str()), node),
            None => Value::Undefined,
        })
    }

    fn step(&self, path: ThemePath, node: &Arc<ShapeNode>) -> Value {
        match node.as_ref() {
            ShapeNode::Object(_) => Value::Theme(ThemeNode {
                path,
                shape: node.clone(),
                markers: self.markers.clone(),
            }),
            ShapeNode::Leaf(_) => Value::Tracked(ThemeExpr::Ref(path)),
        }
    }
}

/// The instrumented theme handed to a style function
#[derive(Clone, Debug)]
pub struct ProxyTheme {
    root: ThemeNode,
}

impl ProxyTheme {
    /// Wrap a shape. Pure: builds no state beyond the root node.
    pub fn wrap(shape: &ThemeShape) -> Self {
        Self {
            root: ThemeNode {
                path: ThemePath::root(),
                shape: shape.root().clone(),
                markers: Rc::new(MarkerBindings::default()),
            },
        }
    }

    /// Bind iteration markers for one shadow run
    pub fn with_markers<I, K, V>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let markers = bindings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.root.markers = Rc::new(markers);
        self
    }

    /// The theme argument value
    pub fn value(&self) -> Value {
        Value::Theme(self.root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape() -> ThemeShape {
        ThemeShape::from_json(&json!({
            "colors": { "text": { "primary": "#111", "secondary": "#555" } },
            "intents": {
                "primary": { "primary": "#3b82f6", "contrast": "#fff" },
                "danger": { "primary": "#ef4444", "contrast": "#fff" }
            },
            "sizes": { "alert": { "sm": { "gap": 4 }, "md": { "gap": 8 } } },
            "shadows": [1, 2]
        }))
        .unwrap()
    }

    fn read_chain(value: Value, chain: &[&str]) -> Result<Value> {
        chain.iter().try_fold(value, |v, key| match v {
            Value::Theme(node) => node.read(key),
            other => panic!("expected theme node before {key}, got {other:?}"),
        })
    }

    #[test]
    fn test_leaf_reads_are_tracked() {
        let theme = ProxyTheme::wrap(&shape()).value();
        let value = read_chain(theme, &["colors", "text", "primary"]).unwrap();
        match value {
            Value::Tracked(ThemeExpr::Ref(path)) => assert_eq!(path.to_string(), "colors.text.primary"),
            other => panic!("expected tracked leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_key_is_undefined() {
        let theme = ProxyTheme::wrap(&shape()).value();
        assert!(matches!(read_chain(theme, &["colors", "nope"]).unwrap(), Value::Undefined));
    }

    #[test]
    fn test_arrays_are_leaves() {
        let theme = ProxyTheme::wrap(&shape()).value();
        assert!(matches!(read_chain(theme, &["shadows"]).unwrap(), Value::Tracked(_)));
    }

    #[test]
    fn test_markers_resolve_to_bound_key() {
        let proxy = ProxyTheme::wrap(&shape()).with_markers([("intents", "danger"), ("sizes.alert", "md")]);
        let intent = read_chain(proxy.value(), &["$intents", "primary"]).unwrap();
        assert_eq!(intent.theme_path().unwrap().to_string(), "intents.danger.primary");
        let gap = read_chain(proxy.value(), &["sizes", "$alert", "gap"]).unwrap();
        assert_eq!(gap.theme_path().unwrap().to_string(), "sizes.alert.md.gap");
    }

    #[test]
    fn test_unbound_marker_fails() {
        let theme = ProxyTheme::wrap(&shape()).value();
        assert_eq!(
            read_chain(theme, &["$intents"]).unwrap_err(),
            EvalError::UnboundMarker("intents".into())
        );
    }
}
