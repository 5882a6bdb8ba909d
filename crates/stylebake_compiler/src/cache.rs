//! Extraction cache
//!
//! All entries live in one JSON document. It is loaded once per run, mutated in
//! memory and written back once through a temporary file and a rename.
//!
//! ```json
//! { "version": 1, "generatedAt": "...", "entries": [ { "filePath": "...", ... } ] }
//! ```

use crate::error::CacheError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stylebake_core::{CacheEntry, Diagnostic, DiagnosticKind, StyleSite};

/// Version of the cache document layout
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheDocument {
    version: u32,
    generated_at: DateTime<Utc>,
    entries: Vec<CacheEntry>,
}

/// In-memory view of the cache document
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: Vec<CacheEntry>,
    dirty: bool,
}

impl CacheStore {
    /// Load the document at `path`.
    ///
    /// A missing file is an empty cache. A document that cannot be decoded is
    /// discarded; the returned diagnostic reports it.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Option<Diagnostic>), CacheError> {
        let path = path.into();
        let mut store = Self {
            path,
            entries: Vec::new(),
            dirty: false,
        };

        let text = match fs::read_to_string(&store.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok((store, None)),
            Err(source) => {
                return Err(CacheError::Io {
                    path: store.path.clone(),
                    source,
                })
            }
        };

        let problem = match serde_json::from_str::<CacheDocument>(&text) {
            Ok(doc) if doc.version == CACHE_VERSION => {
                store.entries = doc.entries;
                tracing::debug!(path = %store.path.display(), entries = store.entries.len(), "Loaded cache");
                return Ok((store, None));
            }
            Ok(doc) => format!("unsupported cache version {}", doc.version),
            Err(err) => err.to_string(),
        };

        tracing::warn!(path = %store.path.display(), %problem, "Discarding corrupt cache");
        store.dirty = true;
        let diagnostic = Diagnostic::warning(
            DiagnosticKind::CacheCorrupt,
            store.path.display().to_string(),
            format!("cache discarded: {problem}"),
        );
        Ok((store, Some(diagnostic)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn lookup(&self, site: &StyleSite) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| &e.site == site)
    }

    /// Insert or replace the entry for a site
    pub fn put(&mut self, entry: CacheEntry) {
        self.dirty = true;
        match self.entries.iter_mut().find(|e| e.site == entry.site) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    /// Entries recorded for one file
    pub fn file_entries(&self, file: &str) -> Vec<CacheEntry> {
        self.entries
            .iter()
            .filter(|e| e.site.file_path == file)
            .cloned()
            .collect()
    }

    /// Whether every site has an entry extracted from contents hashing to `hash`
    pub fn is_file_fresh(&self, sites: &[StyleSite], hash: &str) -> bool {
        sites
            .iter()
            .all(|site| self.lookup(site).is_some_and(|e| e.is_fresh(hash)))
    }

    /// Replace all entries of a file at once
    pub fn replace_file(&mut self, file: &str, entries: Vec<CacheEntry>) {
        self.remove_file(file);
        self.dirty = true;
        self.entries.extend(entries);
    }

    pub fn remove_file(&mut self, file: &str) {
        let before = self.entries.len();
        self.entries.retain(|e| e.site.file_path != file);
        if self.entries.len() != before {
            self.dirty = true;
        }
    }

    /// Drop entries for sites no longer discovered; returns the removed sites
    pub fn prune(&mut self, current: &[StyleSite]) -> Vec<StyleSite> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            let keep = current.contains(&entry.site);
            if !keep {
                removed.push(entry.site.clone());
            }
            keep
        });
        if !removed.is_empty() {
            self.dirty = true;
        }
        removed
    }

    /// Write the document if anything changed
    pub fn flush(&mut self) -> Result<bool, CacheError> {
        if !self.dirty {
            return Ok(false);
        }
        self.entries.sort_by(|a, b| a.site.cmp(&b.site));
        let doc = CacheDocument {
            version: CACHE_VERSION,
            generated_at: Utc::now(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let io = |source: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;

        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "Flushed cache");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylebake_core::{ExtractedNode, Literal};

    fn entry(file: &str, name: &str, hash: &str) -> CacheEntry {
        CacheEntry::new(
            StyleSite::new(file, name, vec![]),
            hash,
            ExtractedNode::literal(Literal::Number(1.0)),
        )
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (store, diagnostic) = CacheStore::open(dir.path().join("cache.json")).unwrap();
        assert!(store.is_empty());
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_put_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".stylebake/cache.json");
        let (mut store, _) = CacheStore::open(&path).unwrap();
        store.put(entry("src/b.tsx", "b", "h1"));
        store.put(entry("src/a.tsx", "a", "h1"));
        store.put(entry("src/a.tsx", "a", "h2"));
        assert_eq!(store.len(), 2);
        assert!(store.flush().unwrap());
        assert!(!store.flush().unwrap());

        let (reloaded, diagnostic) = CacheStore::open(&path).unwrap();
        assert!(diagnostic.is_none());
        let names: Vec<&str> = reloaded.entries().iter().map(|e| e.site.export_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(reloaded.entries()[0].source_hash, "h2");

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert!(raw["generatedAt"].is_string());
        assert_eq!(raw["entries"][0]["filePath"], "src/a.tsx");
    }

    #[test]
    fn test_corrupt_document_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        let (mut store, diagnostic) = CacheStore::open(&path).unwrap();
        let diagnostic = diagnostic.expect("corruption is reported");
        assert_eq!(diagnostic.kind, DiagnosticKind::CacheCorrupt);
        assert!(!diagnostic.is_fatal());
        assert!(store.is_empty());
        assert!(store.flush().unwrap());
    }

    #[test]
    fn test_freshness_replace_and_prune() {
        let (mut store, _) = CacheStore::open("unused.json").unwrap();
        store.replace_file("src/a.tsx", vec![entry("src/a.tsx", "x", "h1"), entry("src/a.tsx", "y", "h1")]);
        store.put(entry("src/b.tsx", "z", "h1"));

        let sites = vec![StyleSite::new("src/a.tsx", "x", vec![]), StyleSite::new("src/a.tsx", "y", vec![])];
        assert!(store.is_file_fresh(&sites, "h1"));
        assert!(!store.is_file_fresh(&sites, "h2"));

        store.replace_file("src/a.tsx", vec![entry("src/a.tsx", "x", "h2")]);
        assert!(!store.is_file_fresh(&sites, "h2"));
        assert_eq!(store.file_entries("src/a.tsx").len(), 1);

        let removed = store.prune(&[StyleSite::new("src/a.tsx", "x", vec![])]);
        assert_eq!(removed, vec![StyleSite::new("src/b.tsx", "z", vec![])]);
        assert_eq!(store.len(), 1);
    }
}
