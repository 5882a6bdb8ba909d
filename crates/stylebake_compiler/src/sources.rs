//! Source file selection

use crate::error::{CompileError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use stylebake_theme::Target;
use walkdir::WalkDir;

/// Directories never worth descending into
const SKIPPED_DIRS: [&str; 3] = ["node_modules", ".git", ".stylebake"];

/// Include/exclude patterns relative to a project root
#[derive(Debug, Clone)]
pub struct SourceSet {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl SourceSet {
    pub fn new(root: impl Into<PathBuf>, include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a root-relative path is part of the set
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Root-relative paths of all matching files the target builds, sorted
    pub fn collect(&self, target: Target) -> Result<Vec<PathBuf>> {
        let capabilities = target.capabilities();
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root).follow_links(false).into_iter();
        let entries = walker.filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !SKIPPED_DIRS.iter().any(|d| entry.file_name() == *d)
        });

        for entry in entries {
            let entry = entry.map_err(|source| CompileError::Walk {
                root: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !self.matches(relative) {
                continue;
            }
            if !capabilities.accepts_file(relative) {
                tracing::debug!(file = %relative.display(), %target, "Skipping platform file");
                continue;
            }
            files.push(relative.to_path_buf());
        }

        files.sort();
        Ok(files)
    }
}

/// Project-relative path with `/` separators, as recorded in style sites
pub fn site_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| CompileError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| CompileError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_collect_filters_patterns_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/Button/Button.styles.tsx");
        touch(dir.path(), "src/Button/Button.web.tsx");
        touch(dir.path(), "src/Button/Button.native.tsx");
        touch(dir.path(), "src/Button/Button.test.tsx");
        touch(dir.path(), "node_modules/pkg/index.tsx");

        let set = SourceSet::new(
            dir.path(),
            &["**/*.tsx".to_string()],
            &["**/*.test.tsx".to_string()],
        )
        .unwrap();

        let web: Vec<String> = set.collect(Target::Web).unwrap().iter().map(|p| site_path(p)).collect();
        assert_eq!(web, vec!["src/Button/Button.styles.tsx", "src/Button/Button.web.tsx"]);

        let ios: Vec<String> = set.collect(Target::Ios).unwrap().iter().map(|p| site_path(p)).collect();
        assert_eq!(ios, vec!["src/Button/Button.native.tsx", "src/Button/Button.styles.tsx"]);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = SourceSet::new(".", &["src/[".to_string()], &[]).unwrap_err();
        assert!(matches!(err, CompileError::Pattern { .. }));
    }
}
