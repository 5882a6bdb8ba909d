//! stylebake configuration file handling

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stylebake_compiler::pipeline::default_jobs;
use stylebake_compiler::{ApiNames, BuildSettings};
use stylebake_theme::{Enumerations, ShapePreset, Target, ThemeShape};

pub const CONFIG_FILE: &str = "stylebake.toml";

/// Top-level configuration (stylebake.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StylebakeConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub apis: ApiNames,
}

/// Project metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub name: String,
}

/// Which files are scanned for style sites
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Globs relative to the project root
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["src/**/*.{js,jsx,ts,tsx}".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["**/node_modules/**".to_string(), "**/*.test.*".to_string()]
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}

/// Theme shape and build target
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThemeConfig {
    /// Theme instance (`.json` or `.toml`) used as the shape; takes precedence over `preset`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// Built-in preset used when no shape file is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default)]
    pub target: Target,
    /// Key sets for `$name` iteration markers, e.g. `"sizes.alert" = ["sm", "md"]`
    #[serde(default)]
    pub enumerations: Enumerations,
}

/// Cache location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: String,
}

fn default_cache_path() -> String {
    ".stylebake/cache.json".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Where rewritten sources are written
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    /// Keep failing files unoptimized instead of failing the build
    #[serde(default)]
    pub soft_fail: bool,
    /// Parallel extraction tasks; defaults to the number of CPUs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Whole-run time budget in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_out_dir() -> String {
    ".stylebake/out".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            soft_fail: false,
            jobs: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StylebakeConfig {
    /// Load configuration from a directory (looks for stylebake.toml)
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = if path.is_file() {
            path.to_path_buf()
        } else {
            path.join(CONFIG_FILE)
        };

        if !config_path.exists() {
            anyhow::bail!(
                "No {} found in {}. Run `stylebake init` to create one.",
                CONFIG_FILE,
                path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: StylebakeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    /// Create a new configuration with the given project name
    pub fn new(name: &str) -> Self {
        Self {
            project: ProjectConfig {
                name: name.to_string(),
            },
            sources: SourcesConfig::default(),
            theme: ThemeConfig::default(),
            cache: CacheConfig::default(),
            build: BuildConfig::default(),
            apis: ApiNames::default(),
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Load the theme shape named by `[theme]`
    pub fn load_shape(&self, root: &Path) -> Result<ThemeShape> {
        if let Some(shape) = &self.theme.shape {
            let path = root.join(shape);
            return ThemeShape::load(&path)
                .with_context(|| format!("Failed to load theme shape {}", path.display()));
        }
        let preset = match &self.theme.preset {
            Some(id) => id.parse::<ShapePreset>()?,
            None => ShapePreset::default(),
        };
        tracing::debug!(%preset, "Using built-in theme preset");
        preset
            .shape()
            .with_context(|| format!("Failed to build preset {preset}"))
    }

    /// Resolve into run settings for the project at `root`
    pub fn to_settings(&self, root: &Path) -> Result<BuildSettings> {
        let mut settings = BuildSettings::new(root, self.load_shape(root)?);
        settings.include = self.sources.include.clone();
        settings.exclude = self.sources.exclude.clone();
        settings.enumerations = self.theme.enumerations.clone();
        settings.target = self.theme.target;
        settings.cache_path = PathBuf::from(&self.cache.path);
        settings.out_dir = PathBuf::from(&self.build.out_dir);
        settings.soft_fail = self.build.soft_fail;
        settings.jobs = self.build.jobs.unwrap_or_else(default_jobs);
        settings.timeout = (self.build.timeout_secs > 0).then(|| Duration::from_secs(self.build.timeout_secs));
        settings.apis = self.apis.clone();
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = StylebakeConfig::new("acme-ui");
        let text = config.to_toml().unwrap();
        assert!(text.contains("[project]"));
        assert!(text.contains("name = \"acme-ui\""));

        let parsed: StylebakeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.sources.include, default_include());
        assert_eq!(parsed.cache.path, ".stylebake/cache.json");
        assert_eq!(parsed.apis, ApiNames::default());
    }

    #[test]
    fn test_minimal_file_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
[project]
name = "acme-ui"

[theme]
preset = "minimal"
target = "android"

[theme.enumerations]
"sizes.alert" = ["sm", "md"]

[build]
soft_fail = true
jobs = 3
timeout_secs = 0

[apis]
factories = ["makeStyles"]
"#,
        )
        .unwrap();

        let config = StylebakeConfig::load_from_dir(dir.path()).unwrap();
        let settings = config.to_settings(dir.path()).unwrap();
        assert_eq!(settings.target, Target::Android);
        assert!(settings.soft_fail);
        assert_eq!(settings.jobs, 3);
        assert!(settings.timeout.is_none());
        assert_eq!(settings.apis.factories, vec!["makeStyles"]);
        assert_eq!(settings.apis.builder_method, "extend");
        assert!(!settings.enumerations.is_empty());
    }

    #[test]
    fn test_missing_config_suggests_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = StylebakeConfig::load_from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("stylebake init"));
    }

    #[test]
    fn test_shape_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("theme.json"), r##"{ "colors": { "text": "#000" } }"##).unwrap();
        let mut config = StylebakeConfig::new("acme-ui");
        config.theme.shape = Some("theme.json".to_string());
        config.theme.preset = Some("standard".to_string());

        let shape = config.load_shape(dir.path()).unwrap();
        assert_eq!(shape.keys_at(&[] as &[&str]), Some(vec!["colors".to_string()]));
    }
}
