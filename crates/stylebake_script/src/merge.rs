//! Deep merge of style objects (builder `.extend` chains)

use crate::value::{set_property, Value};
use indexmap::IndexMap;

/// Platform-specific blocks inside a style entry
pub const PLATFORM_KEYS: [&str; 3] = ["_web", "_ios", "_android"];

/// Merge `source` over `target`.
///
/// Objects merge key by key; when both sides of a key are functions the result is a
/// function merging both results; anything else is replaced by the source value.
/// Keys the source sets at the top level also override the same key inside existing
/// platform blocks, so `_web: { fontFamily }` in a base does not shadow an extension's
/// `fontFamily`.
pub fn deep_merge(target: Value, source: Value) -> Value {
    let (Value::Object(target), Value::Object(source)) = (&target, &source) else {
        return source;
    };

    let mut merged: IndexMap<String, Value> = target.borrow().clone();
    let source = source.borrow();

    for (key, value) in source.iter() {
        let next = match merged.get(key) {
            Some(existing @ Value::Object(_)) if matches!(value, Value::Object(_)) => {
                deep_merge(existing.clone(), value.clone())
            }
            Some(existing) if existing.is_function() && value.is_function() => {
                Value::merged(existing.clone(), value.clone())
            }
            _ => value.clone(),
        };
        set_property(&mut merged, key.clone(), next);
    }

    let overrides: Vec<(&String, &Value)> = source
        .iter()
        .filter(|(key, _)| !PLATFORM_KEYS.contains(&key.as_str()))
        .collect();
    if !overrides.is_empty() {
        for platform in PLATFORM_KEYS {
            let Some(Value::Object(block)) = merged.get(platform) else {
                continue;
            };
            let mut block = block.borrow().clone();
            let mut modified = false;
            for (key, value) in &overrides {
                if let Some(slot) = block.get_mut(key.as_str()) {
                    *slot = (*value).clone();
                    modified = true;
                }
            }
            if modified {
                merged.insert(platform.to_string(), Value::object(block));
            }
        }
    }

    Value::object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merge_json(base: serde_json::Value, ext: serde_json::Value) -> serde_json::Value {
        deep_merge(Value::from_json(&base), Value::from_json(&ext))
            .to_json()
            .unwrap()
    }

    #[test]
    fn test_nested_objects_merge() {
        let merged = merge_json(
            json!({ "container": { "padding": 8, "margin": 0 }, "text": { "color": "#000" } }),
            json!({ "container": { "padding": 12 }, "icon": { "size": 16 } }),
        );
        assert_eq!(
            merged,
            json!({
                "container": { "padding": 12, "margin": 0 },
                "text": { "color": "#000" },
                "icon": { "size": 16 }
            })
        );
    }

    #[test]
    fn test_non_objects_replace() {
        let merged = merge_json(json!({ "a": { "b": 1 } }), json!({ "a": 2 }));
        assert_eq!(merged, json!({ "a": 2 }));
    }

    #[test]
    fn test_source_keys_override_platform_blocks() {
        let merged = merge_json(
            json!({ "text": { "fontFamily": "System", "_web": { "fontFamily": "inherit", "cursor": "text" } } }),
            json!({ "text": { "fontFamily": "Inter" } }),
        );
        assert_eq!(
            merged,
            json!({ "text": { "fontFamily": "Inter", "_web": { "fontFamily": "Inter", "cursor": "text" } } })
        );
    }
}
