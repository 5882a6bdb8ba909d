//! Rebuild on source changes

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Quiet period after the last event before a rebuild starts
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Paths whose changes never trigger a rebuild
const IGNORED: [&str; 3] = ["**/.stylebake/**", "**/node_modules/**", "**/.git/**"];

/// A batch of relevant changes
#[derive(Debug, Default)]
pub struct Changes {
    pub paths: Vec<PathBuf>,
    /// The config file itself changed
    pub config: bool,
}

/// Watches a project root and yields debounced batches of changes
pub struct ProjectWatcher {
    root: PathBuf,
    config_file: PathBuf,
    ignored: GlobSet,
    events: mpsc::Receiver<notify::Result<Event>>,
    // Dropping the watcher stops event delivery
    _watcher: notify::RecommendedWatcher,
}

impl ProjectWatcher {
    pub fn new(root: &Path, config_file: &Path, extra_ignores: &[String]) -> Result<Self> {
        let (tx, rx) = mpsc::channel(256);
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.blocking_send(res);
        })
        .context("Failed to start file watcher")?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        Ok(Self {
            root: root.to_path_buf(),
            config_file: config_file.to_path_buf(),
            ignored: ignore_set(extra_ignores)?,
            events: rx,
            _watcher: watcher,
        })
    }

    /// Replace the project-specific ignores, e.g. after the config changed
    pub fn set_ignores(&mut self, extra_ignores: &[String]) -> Result<()> {
        self.ignored = ignore_set(extra_ignores)?;
        Ok(())
    }

    /// Wait for the next batch of relevant changes; `None` once the watcher is gone
    pub async fn next(&mut self) -> Option<Changes> {
        let mut changes = Changes::default();
        loop {
            let event = if changes.paths.is_empty() {
                self.events.recv().await?
            } else {
                match tokio::time::timeout(DEBOUNCE, self.events.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) | Err(_) => return Some(changes),
                }
            };
            match event {
                Ok(event) => self.collect(&event, &mut changes),
                Err(err) => tracing::warn!(error = %err, "Watch error"),
            }
        }
    }

    fn collect(&self, event: &Event, changes: &mut Changes) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        for path in &event.paths {
            if path == &self.config_file {
                changes.config = true;
            } else if self.should_ignore(path) {
                continue;
            }
            if !changes.paths.contains(path) {
                changes.paths.push(path.clone());
            }
        }
    }

    fn should_ignore(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.ignored.is_match(relative)
    }
}

/// Globs for paths a build writes: each path itself and everything below it.
/// Paths under `root` become relative to it.
pub fn generated_ignores(root: &Path, generated: &[PathBuf]) -> Vec<String> {
    let mut patterns = Vec::with_capacity(generated.len() * 2);
    for path in generated {
        let path = path.strip_prefix(root).unwrap_or(path);
        let normalized: PathBuf = path.components().filter(|c| !matches!(c, Component::CurDir)).collect();
        let text = normalized.to_string_lossy();
        let text = text.trim_end_matches('/');
        if text.is_empty() {
            continue;
        }
        let escaped = globset::escape(text);
        patterns.push(format!("{escaped}/**"));
        patterns.push(escaped);
    }
    patterns
}

fn ignore_set(extra_ignores: &[String]) -> Result<GlobSet> {
    let mut patterns: Vec<String> = IGNORED.iter().map(|p| p.to_string()).collect();
    patterns.extend(extra_ignores.iter().cloned());
    build_globset(&patterns)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid ignore pattern '{pattern}'"))?);
    }
    builder.build().context("Failed to build ignore set")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind};

    fn watcher(root: &Path) -> ProjectWatcher {
        ProjectWatcher::new(root, &root.join("stylebake.toml"), &["**/*.snap".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_events_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let watcher = watcher(root);
        let mut changes = Changes::default();

        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(root.join(".stylebake/cache.json"))
            .add_path(root.join("src/Button.snap"))
            .add_path(root.join("src/Button.styles.ts"));
        watcher.collect(&event, &mut changes);
        watcher.collect(&Event::new(EventKind::Access(AccessKind::Any)).add_path(root.join("src/a.ts")), &mut changes);
        assert_eq!(changes.paths, vec![root.join("src/Button.styles.ts")]);
        assert!(!changes.config);

        let event = Event::new(EventKind::Any).add_path(root.join("stylebake.toml"));
        watcher.collect(&event, &mut changes);
        assert!(changes.config);
    }

    #[tokio::test]
    async fn test_build_outputs_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let generated = generated_ignores(
            root,
            &[root.join("./dist"), PathBuf::from("build-cache/styles.json")],
        );
        assert_eq!(
            generated,
            vec!["dist/**", "dist", "build-cache/styles.json/**", "build-cache/styles.json"]
        );

        let mut watcher = watcher(root);
        watcher.set_ignores(&generated).unwrap();
        let mut changes = Changes::default();
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(root.join("dist/src/Button.styles.ts"))
            .add_path(root.join("build-cache/styles.json"))
            .add_path(root.join("src/Button.styles.ts"));
        watcher.collect(&event, &mut changes);
        assert_eq!(changes.paths, vec![root.join("src/Button.styles.ts")]);
    }
}
