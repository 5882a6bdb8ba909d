//! Style-definition call sites

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Which API registered the style function
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiteKind {
    /// `defineStyle('Name', fn)` or `StyleSheet.create(fn)`
    #[default]
    Factory,
    /// `defineStyle('Name', base).extend(ext)...`
    Builder,
    /// `extendStyle('Name', fn)`
    Extension,
    /// `overrideStyle('Name', fn)`
    Override,
}

/// One style-definition call site.
///
/// Identity (equality, ordering, hashing, cache key) is the triple
/// `(file_path, export_name, variant_keys)`. The remaining fields describe the
/// site for the rewrite pass and diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSite {
    /// Path relative to the project root, `/`-separated
    pub file_path: String,
    pub export_name: String,
    /// Enumeration ids of the iteration markers the style function uses, sorted
    pub variant_keys: Vec<String>,
    #[serde(default)]
    pub kind: SiteKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default = "default_theme_param")]
    pub theme_param: String,
}

fn default_theme_param() -> String {
    "theme".to_string()
}

impl StyleSite {
    pub fn new(
        file_path: impl Into<String>,
        export_name: impl Into<String>,
        variant_keys: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut variant_keys: Vec<String> = variant_keys.into_iter().collect();
        variant_keys.sort();
        variant_keys.dedup();
        Self {
            file_path: file_path.into(),
            export_name: export_name.into(),
            variant_keys,
            kind: SiteKind::Factory,
            component: None,
            theme_param: default_theme_param(),
        }
    }

    pub fn with_kind(mut self, kind: SiteKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_component(mut self, component: Option<String>) -> Self {
        self.component = component;
        self
    }

    pub fn with_theme_param(mut self, param: impl Into<String>) -> Self {
        self.theme_param = param.into();
        self
    }

    fn identity(&self) -> (&str, &str, &[String]) {
        (&self.file_path, &self.export_name, &self.variant_keys)
    }
}

impl PartialEq for StyleSite {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for StyleSite {}

impl Hash for StyleSite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for StyleSite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StyleSite {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for StyleSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path, self.export_name)?;
        if !self.variant_keys.is_empty() {
            write!(f, " [{}]", self.variant_keys.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_descriptive_fields() {
        let a = StyleSite::new("src/Button.styles.tsx", "buttonStyles", vec![])
            .with_component(Some("Button".into()));
        let b = StyleSite::new("src/Button.styles.tsx", "buttonStyles", vec![])
            .with_kind(SiteKind::Builder)
            .with_theme_param("t");
        assert_eq!(a, b);
    }

    #[test]
    fn test_variant_keys_are_sorted() {
        let site = StyleSite::new(
            "a.tsx",
            "styles",
            vec!["sizes.alert".to_string(), "intents".to_string(), "intents".to_string()],
        );
        assert_eq!(site.variant_keys, vec!["intents", "sizes.alert"]);
        assert_eq!(site.to_string(), "a.tsx:styles [intents, sizes.alert]");
    }

    #[test]
    fn test_serialized_field_names() {
        let site = StyleSite::new("src/Alert.styles.tsx", "alertStyles", vec!["sizes.alert".into()]);
        let json = serde_json::to_value(&site).unwrap();
        assert_eq!(json["filePath"], "src/Alert.styles.tsx");
        assert_eq!(json["exportName"], "alertStyles");
        assert_eq!(json["variantKeys"][0], "sizes.alert");
    }
}
