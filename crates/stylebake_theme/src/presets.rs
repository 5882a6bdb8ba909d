//! Built-in theme presets.
//!
//! Presets are concrete theme instances. They serve as the shape oracle when a
//! project has no theme file, and `stylebake init` writes one out as a starting
//! point.

use crate::error::{Result, ShapeError};
use crate::shape::ThemeShape;
use serde_json::{json, Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Built-in preset catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShapePreset {
    /// Full design-system theme: colors, intents, per-component sizes, typography.
    #[default]
    Standard,
    /// Colors, spacing and radii only.
    Minimal,
}

impl ShapePreset {
    /// Stable preset id for config/serialization.
    pub fn id(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Minimal => "minimal",
        }
    }

    /// Full preset list.
    pub fn all() -> &'static [ShapePreset] {
        const PRESETS: [ShapePreset; 2] = [ShapePreset::Standard, ShapePreset::Minimal];
        &PRESETS
    }

    /// The light-mode theme instance for this preset.
    pub fn instance(self) -> Value {
        match self {
            Self::Standard => standard_theme(),
            Self::Minimal => minimal_theme(),
        }
    }

    pub fn shape(self) -> Result<ThemeShape> {
        ThemeShape::from_json(&self.instance())
    }
}

impl Display for ShapePreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ShapePreset {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| ShapeError::UnknownPreset(s.to_string()))
    }
}

const SIZE_KEYS: [&str; 5] = ["xs", "sm", "md", "lg", "xl"];

fn intent(primary: &str, light: &str, dark: &str) -> Value {
    json!({ "primary": primary, "contrast": "#ffffff", "light": light, "dark": dark })
}

/// Build a per-size table from a base value and a step for every field
fn scale(fields: &[(&str, f64, f64)]) -> Value {
    let mut sizes = Map::new();
    for (i, key) in SIZE_KEYS.iter().enumerate() {
        let step = i as f64;
        let entry: Map<String, Value> = fields
            .iter()
            .map(|(name, base, inc)| (name.to_string(), json!(base + inc * step)))
            .collect();
        sizes.insert(key.to_string(), Value::Object(entry));
    }
    Value::Object(sizes)
}

fn standard_theme() -> Value {
    json!({
        "colors": {
            "text": {
                "primary": "#111827",
                "secondary": "#4b5563",
                "tertiary": "#9ca3af",
                "inverse": "#ffffff",
            },
            "surface": {
                "primary": "#ffffff",
                "secondary": "#f9fafb",
                "tertiary": "#f3f4f6",
                "inverse": "#111827",
            },
            "border": {
                "primary": "#e5e7eb",
                "secondary": "#d1d5db",
                "focus": "#3b82f6",
                "disabled": "#f3f4f6",
            },
        },
        "intents": {
            "primary": intent("#3b82f6", "#bfdbfe", "#1e40af"),
            "success": intent("#22c55e", "#a7f3d0", "#165e29"),
            "danger": intent("#ef4444", "#fca5a1", "#9b2222"),
            "warning": intent("#f97316", "#ffedd5", "#9a6a00"),
            "neutral": intent("#6b7280", "#e5e7eb", "#374151"),
        },
        "sizes": {
            "button": scale(&[
                ("paddingVertical", 4.0, 2.0),
                ("paddingHorizontal", 8.0, 4.0),
                ("minHeight", 24.0, 8.0),
                ("fontSize", 12.0, 2.0),
                ("lineHeight", 16.0, 4.0),
                ("iconSize", 12.0, 4.0),
            ]),
            "alert": scale(&[
                ("padding", 8.0, 4.0),
                ("gap", 6.0, 2.0),
                ("borderRadius", 4.0, 2.0),
                ("titleFontSize", 12.0, 2.0),
                ("titleLineHeight", 16.0, 4.0),
                ("messageFontSize", 11.0, 1.0),
                ("messageLineHeight", 14.0, 2.0),
                ("iconSize", 16.0, 4.0),
                ("closeIconSize", 12.0, 2.0),
            ]),
            "chip": scale(&[
                ("paddingVertical", 2.0, 2.0),
                ("paddingHorizontal", 6.0, 2.0),
                ("minHeight", 20.0, 4.0),
                ("borderRadius", 10.0, 2.0),
                ("fontSize", 10.0, 2.0),
                ("lineHeight", 14.0, 2.0),
                ("iconSize", 10.0, 2.0),
            ]),
            "typography": scale(&[("fontSize", 12.0, 2.0), ("lineHeight", 16.0, 4.0)]),
        },
        "radii": { "none": 0, "xs": 2, "sm": 4, "md": 8, "lg": 12, "xl": 16 },
        "spacing": { "none": 0, "xs": 4, "sm": 8, "md": 16, "lg": 24, "xl": 32 },
        "typography": {
            "h1": { "fontSize": 32, "lineHeight": 40, "fontWeight": "700" },
            "h2": { "fontSize": 24, "lineHeight": 32, "fontWeight": "700" },
            "h3": { "fontSize": 20, "lineHeight": 28, "fontWeight": "600" },
            "body1": { "fontSize": 16, "lineHeight": 24, "fontWeight": "400" },
            "body2": { "fontSize": 14, "lineHeight": 20, "fontWeight": "400" },
            "caption": { "fontSize": 12, "lineHeight": 16, "fontWeight": "400" },
        },
        "interaction": {
            "focusBorder": "rgba(59, 130, 246, 0.3)",
            "opacity": { "hover": 0.9, "active": 0.75, "disabled": 0.5 },
        },
    })
}

fn minimal_theme() -> Value {
    json!({
        "colors": {
            "text": { "primary": "#111827", "secondary": "#4b5563" },
            "surface": { "primary": "#ffffff", "secondary": "#f9fafb" },
            "border": { "primary": "#e5e7eb" },
        },
        "spacing": { "sm": 8, "md": 16, "lg": 24 },
        "radii": { "sm": 4, "md": 8, "lg": 12 },
    })
}
