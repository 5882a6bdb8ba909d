//! Persisted extraction results

use crate::node::ExtractedNode;
use crate::site::StyleSite;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One site's extraction result, valid while `source_hash` matches the source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(flatten)]
    pub site: StyleSite,
    pub source_hash: String,
    pub extracted_at: DateTime<Utc>,
    pub tree: ExtractedNode,
}

impl CacheEntry {
    pub fn new(site: StyleSite, source_hash: impl Into<String>, tree: ExtractedNode) -> Self {
        Self {
            site,
            source_hash: source_hash.into(),
            extracted_at: Utc::now(),
            tree,
        }
    }

    /// Whether this entry was produced from content with the given hash
    pub fn is_fresh(&self, current_hash: &str) -> bool {
        self.source_hash == current_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;
    use crate::path::ThemePath;
    use indexmap::IndexMap;

    #[test]
    fn test_entry_json_shape() {
        let mut fields = IndexMap::new();
        fields.insert(
            "color".to_string(),
            ExtractedNode::theme_ref(ThemePath::from(&["colors", "text", "primary"][..])),
        );
        fields.insert("margin".to_string(), ExtractedNode::literal(Literal::Number(0.0)));
        let entry = CacheEntry::new(
            StyleSite::new("src/Text.styles.tsx", "textStyles", vec![]),
            "abc123",
            ExtractedNode::Object(fields),
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["filePath"], "src/Text.styles.tsx");
        assert_eq!(json["sourceHash"], "abc123");
        assert_eq!(json["tree"]["margin"], 0);
        assert!(json["extractedAt"].is_string());

        let back: CacheEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.tree, entry.tree);
        assert!(back.is_fresh("abc123"));
        assert!(!back.is_fresh("def456"));
    }
}
