//! Build targets and their capability tables

use crate::error::ShapeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Platform a build is produced for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Web,
    Ios,
    Android,
}

/// What a target accepts, resolved once per run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Value of `Platform.OS`
    pub os: &'static str,
    /// Platform file suffixes that belong to this target (`X.web.tsx`)
    pub suffixes: &'static [&'static str],
    /// Platform file suffixes for other targets; such files are skipped
    pub foreign_suffixes: &'static [&'static str],
    /// `Platform.select` keys in priority order
    pub select_keys: &'static [&'static str],
}

const WEB: Capabilities = Capabilities {
    os: "web",
    suffixes: &["web"],
    foreign_suffixes: &["native", "ios", "android"],
    select_keys: &["web", "default"],
};

const IOS: Capabilities = Capabilities {
    os: "ios",
    suffixes: &["ios", "native"],
    foreign_suffixes: &["web", "android"],
    select_keys: &["ios", "native", "default"],
};

const ANDROID: Capabilities = Capabilities {
    os: "android",
    suffixes: &["android", "native"],
    foreign_suffixes: &["web", "ios"],
    select_keys: &["android", "native", "default"],
};

impl Target {
    pub fn id(self) -> &'static str {
        match self {
            Target::Web => "web",
            Target::Ios => "ios",
            Target::Android => "android",
        }
    }

    pub fn all() -> &'static [Target] {
        const TARGETS: [Target; 3] = [Target::Web, Target::Ios, Target::Android];
        &TARGETS
    }

    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            Target::Web => &WEB,
            Target::Ios => &IOS,
            Target::Android => &ANDROID,
        }
    }
}

impl Capabilities {
    /// Whether a source file is part of this target's build.
    ///
    /// Only the segment right before the final extension counts as a platform
    /// suffix: `Button.web.tsx` is web-only, `Button.styles.tsx` is shared.
    pub fn accepts_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() < 3 {
            return true;
        }
        let suffix = parts[parts.len() - 2];
        !self.foreign_suffixes.contains(&suffix)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Target {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::all()
            .iter()
            .copied()
            .find(|t| t.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| ShapeError::UnknownTarget(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_suffixes() {
        let web = Target::Web.capabilities();
        assert!(web.accepts_file(Path::new("src/Button/Button.web.tsx")));
        assert!(!web.accepts_file(Path::new("src/Button/Button.native.tsx")));
        assert!(web.accepts_file(Path::new("src/Button/Button.styles.tsx")));
        assert!(web.accepts_file(Path::new("index.ts")));

        let ios = Target::Ios.capabilities();
        assert!(ios.accepts_file(Path::new("Button.native.tsx")));
        assert!(!ios.accepts_file(Path::new("Button.android.tsx")));
        assert!(!ios.accepts_file(Path::new("Button.web.tsx")));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!("ios".parse::<Target>().unwrap(), Target::Ios);
        assert_eq!("Android".parse::<Target>().unwrap(), Target::Android);
        assert!("windows".parse::<Target>().is_err());
    }

    #[test]
    fn test_select_keys_end_with_default() {
        for target in Target::all() {
            assert_eq!(target.capabilities().select_keys.last(), Some(&"default"));
        }
    }
}
