//! Project initialization

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use stylebake_theme::ShapePreset;

use crate::config::{StylebakeConfig, CONFIG_FILE};

const THEME_FILE: &str = "theme.json";

const GITIGNORE_ENTRY: &str = "# stylebake cache and rewritten sources\n/.stylebake/\n";

/// Set up stylebake in an existing project directory
pub fn init_project(path: &Path, name: &str, preset: ShapePreset, force: bool) -> Result<()> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            config_path.display()
        );
    }
    fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))?;

    // Theme instance to edit; extraction only uses its structure
    let theme_path = path.join(THEME_FILE);
    if !theme_path.exists() || force {
        let theme = serde_json::to_string_pretty(&preset.instance())?;
        fs::write(&theme_path, theme + "\n")
            .with_context(|| format!("Failed to write {}", theme_path.display()))?;
    }

    let mut config = StylebakeConfig::new(name);
    config.theme.shape = Some(THEME_FILE.to_string());
    fs::write(&config_path, config.to_toml()?)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let gitignore = path.join(".gitignore");
    let existing = fs::read_to_string(&gitignore).unwrap_or_default();
    if !existing.lines().any(|line| line.trim() == "/.stylebake/") {
        let separator = if existing.is_empty() || existing.ends_with('\n') { "" } else { "\n" };
        fs::write(&gitignore, format!("{existing}{separator}{GITIGNORE_ENTRY}"))
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
    }

    tracing::info!(path = %path.display(), %preset, "Initialized stylebake project");
    Ok(())
}
