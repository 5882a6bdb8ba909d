//! Batch runs over a project
//!
//! Every source file is one blocking task (read, parse, discover, freshness
//! check, extract) bounded by a semaphore. Tasks only see read-only shared data
//! and the cache entries of their own file; their results are applied to the
//! cache by the calling task in file order. The cache is flushed once per run.

use crate::cache::CacheStore;
use crate::discovery::{discover, ApiNames};
use crate::error::{CompileError, Result};
use crate::extract::Extractor;
use crate::rewrite::{rewrite_source, RewriteOptions, RewriteOutput, SiteStatus};
use crate::sources::{site_path, SourceSet};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stylebake_core::{content_hash, CacheEntry, Diagnostic, DiagnosticKind, Severity, StyleSite};
use stylebake_script::{parse_module, EvalOptions, Limits};
use stylebake_theme::{Enumerations, Target, ThemeShape};
use tokio::sync::Semaphore;

/// Everything a run needs, resolved from the project configuration
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Project root; sources, cache and output paths are relative to it
    pub root: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub shape: ThemeShape,
    pub enumerations: Enumerations,
    pub target: Target,
    pub cache_path: PathBuf,
    pub out_dir: PathBuf,
    /// Downgrade site failures to warnings and keep such files unoptimized
    pub soft_fail: bool,
    pub jobs: usize,
    /// Whole-run budget; `None` runs unbounded
    pub timeout: Option<Duration>,
    pub apis: ApiNames,
    pub limits: Limits,
}

impl BuildSettings {
    pub fn new(root: impl Into<PathBuf>, shape: ThemeShape) -> Self {
        Self {
            root: root.into(),
            include: vec!["src/**/*.{js,jsx,ts,tsx}".to_string()],
            exclude: vec!["**/node_modules/**".to_string()],
            shape,
            enumerations: Enumerations::default(),
            target: Target::default(),
            cache_path: PathBuf::from(".stylebake/cache.json"),
            out_dir: PathBuf::from(".stylebake/out"),
            soft_fail: false,
            jobs: default_jobs(),
            timeout: Some(Duration::from_secs(300)),
            apis: ApiNames::default(),
            limits: Limits::default(),
        }
    }

    /// Everything besides file contents that changes extraction output
    pub fn environment(&self) -> String {
        format!(
            "shape={};enumerations={};target={}",
            self.shape.fingerprint(),
            self.enumerations.fingerprint(),
            self.target
        )
    }

    pub fn cache_file(&self) -> PathBuf {
        self.root.join(&self.cache_path)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.out_dir)
    }

    fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            target: self.target,
            limits: self.limits,
        }
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

/// What a run does besides extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Extract and report; the cache is not written
    Check,
    /// Extract and update the cache
    Extract,
    /// Extract, update the cache and write rewritten sources to the output dir
    Build,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileStatus {
    /// Cache entries were already current
    Fresh,
    Extracted,
    /// At least one site failed; the file's entries were dropped
    Failed,
    /// The file could not be parsed
    Unparsable,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
    pub sites: usize,
    /// Whether a rewritten version was written to the output dir
    pub rewritten: bool,
}

/// Result of a run, also written as the JSON run report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub mode: RunMode,
    pub target: Target,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub files: Vec<FileReport>,
    pub pruned: Vec<StyleSite>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    /// Whether any diagnostic fails the run
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn files_with(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

/// Outcome of processing one file
#[derive(Debug)]
struct FileOutcome {
    file: String,
    sites: Vec<StyleSite>,
    result: FileResult,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
enum FileResult {
    Fresh,
    Extracted(Vec<CacheEntry>),
    Failed,
    Unparsable,
}

impl FileOutcome {
    fn status(&self) -> FileStatus {
        match self.result {
            FileResult::Fresh => FileStatus::Fresh,
            FileResult::Extracted(_) => FileStatus::Extracted,
            FileResult::Failed => FileStatus::Failed,
            FileResult::Unparsable => FileStatus::Unparsable,
        }
    }
}

/// Run the pipeline over the project
pub async fn run(settings: Arc<BuildSettings>, mode: RunMode) -> Result<RunReport> {
    match settings.timeout {
        Some(limit) => tokio::time::timeout(limit, run_unbounded(settings, mode))
            .await
            .map_err(|_| CompileError::Timeout(limit.as_secs()))?,
        None => run_unbounded(settings, mode).await,
    }
}

async fn run_unbounded(settings: Arc<BuildSettings>, mode: RunMode) -> Result<RunReport> {
    let started_at = Utc::now();
    let clock = Instant::now();

    let sources = SourceSet::new(&settings.root, &settings.include, &settings.exclude)?;
    let files = sources.collect(settings.target)?;
    let environment: Arc<str> = settings.environment().into();
    tracing::info!(files = files.len(), target = %settings.target, ?mode, "Starting run");

    let (mut cache, corrupt) = CacheStore::open(settings.cache_file())?;
    let mut diagnostics: Vec<Diagnostic> = corrupt.into_iter().collect();

    let semaphore = Arc::new(Semaphore::new(settings.jobs.max(1)));
    let mut tasks = Vec::with_capacity(files.len());
    for relative in &files {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| CompileError::Task(err.to_string()))?;
        let cached = cache.file_entries(&site_path(relative));
        let settings = settings.clone();
        let environment = environment.clone();
        let relative = relative.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process_file(&settings, &environment, &relative, &cached)
        }));
    }

    let mut reports = Vec::with_capacity(files.len());
    let mut current_sites = Vec::new();
    for task in tasks {
        let outcome = task
            .await
            .map_err(|err| CompileError::Task(err.to_string()))??;
        reports.push(FileReport {
            file: outcome.file.clone(),
            status: outcome.status(),
            sites: outcome.sites.len(),
            rewritten: false,
        });
        current_sites.extend(outcome.sites.iter().cloned());
        diagnostics.extend(apply(&mut cache, outcome));
    }

    let pruned = cache.prune(&current_sites);
    for site in &pruned {
        tracing::info!(site = %site, "Pruned cache entry for removed site");
        let detail = "style site no longer exists; cache entry pruned";
        diagnostics.push(
            Diagnostic::info(DiagnosticKind::MissingStyleSite, site.file_path.clone(), detail).with_site(site.clone()),
        );
    }

    if mode == RunMode::Build {
        for (relative, report) in files.iter().zip(reports.iter_mut()) {
            let entries = cache.file_entries(&report.file);
            let settings = settings.clone();
            let environment = environment.clone();
            let relative = relative.clone();
            // Files that already failed this run are copied as-is
            let extracted = matches!(report.status, FileStatus::Fresh | FileStatus::Extracted);
            let step = tokio::task::spawn_blocking(move || {
                write_output(&settings, &environment, &relative, entries, extracted)
            })
            .await
            .map_err(|err| CompileError::Task(err.to_string()))??;

            if let Some(outcome) = step.reextracted {
                tracing::debug!(file = %outcome.file, "Re-extracted changed file before rewrite");
                report.status = outcome.status();
                report.sites = outcome.sites.len();
                diagnostics.extend(apply(&mut cache, outcome));
            }
            report.rewritten = step.rewritten;
        }
    }

    if mode != RunMode::Check {
        cache.flush()?;
    }

    if settings.soft_fail {
        for diagnostic in &mut diagnostics {
            if diagnostic.is_fatal() {
                tracing::warn!(file = %diagnostic.file, detail = %diagnostic.detail, "Site failure downgraded, file kept unoptimized");
                *diagnostic = diagnostic.clone().softened();
            }
        }
    }

    let report = RunReport {
        mode,
        target: settings.target,
        started_at,
        duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        files: reports,
        pruned,
        diagnostics,
    };
    tracing::info!(
        files = report.files.len(),
        extracted = report.files_with(FileStatus::Extracted),
        fresh = report.files_with(FileStatus::Fresh),
        failed = report.files_with(FileStatus::Failed),
        errors = report.count(Severity::Error),
        duration_ms = report.duration_ms,
        "Run finished"
    );
    Ok(report)
}

/// Apply a file's outcome to the cache; returns its diagnostics
fn apply(cache: &mut CacheStore, outcome: FileOutcome) -> Vec<Diagnostic> {
    match outcome.result {
        FileResult::Fresh => {}
        FileResult::Extracted(entries) => cache.replace_file(&outcome.file, entries),
        FileResult::Failed | FileResult::Unparsable => cache.remove_file(&outcome.file),
    }
    outcome.diagnostics
}

/// Read, discover and (unless fresh) extract one file
fn process_file(
    settings: &BuildSettings,
    environment: &str,
    relative: &Path,
    cached: &[CacheEntry],
) -> Result<FileOutcome> {
    let file = site_path(relative);
    let absolute = settings.root.join(relative);
    let bytes = fs::read(&absolute).map_err(|err| CompileError::io(&absolute, err))?;
    let hash = content_hash(environment, &bytes);

    let unparsable = |file: String, detail: String| {
        tracing::warn!(file = %file, %detail, "Skipping unparsable file");
        FileOutcome {
            diagnostics: vec![Diagnostic::warning(DiagnosticKind::DiscoveryWarning, file.clone(), detail)],
            file,
            sites: Vec::new(),
            result: FileResult::Unparsable,
        }
    };
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(_) => return Ok(unparsable(file, "file is not valid UTF-8".to_string())),
    };
    let module = match parse_module(&source) {
        Ok(module) => module,
        Err(err) => return Ok(unparsable(file, format!("parse error: {err}"))),
    };

    let found = discover(&module, &file, &settings.apis);
    let sites: Vec<StyleSite> = found.sites.iter().map(|s| s.site.clone()).collect();
    let mut diagnostics = found.diagnostics;

    let fresh = sites
        .iter()
        .all(|site| cached.iter().any(|e| &e.site == site && e.is_fresh(&hash)));
    if fresh {
        tracing::debug!(file = %file, sites = sites.len(), "Cache entries are fresh");
        return Ok(FileOutcome {
            file,
            sites,
            result: FileResult::Fresh,
            diagnostics,
        });
    }

    let extractor = Extractor::new(&module, &settings.shape, &settings.enumerations, settings.eval_options());
    let mut entries = Vec::with_capacity(found.sites.len());
    let mut failed = false;
    for discovered in &found.sites {
        match extractor.extract(discovered) {
            Ok(tree) => entries.push(CacheEntry::new(discovered.site.clone(), hash.clone(), tree)),
            Err(failure) => {
                tracing::warn!(site = %discovered.site, kind = failure.kind.as_str(), detail = %failure.detail, "Extraction failed");
                diagnostics.push(failure.into_diagnostic(&discovered.site));
                failed = true;
            }
        }
    }

    Ok(FileOutcome {
        file,
        sites,
        result: if failed {
            FileResult::Failed
        } else {
            FileResult::Extracted(entries)
        },
        diagnostics,
    })
}

struct OutputStep {
    rewritten: bool,
    reextracted: Option<FileOutcome>,
}

/// Rewrite one file into the output dir, re-extracting first when the file
/// changed since its entries were recorded
fn write_output(
    settings: &BuildSettings,
    environment: &str,
    relative: &Path,
    entries: Vec<CacheEntry>,
    extracted: bool,
) -> Result<OutputStep> {
    let file = site_path(relative);
    let absolute = settings.root.join(relative);
    let source = fs::read_to_string(&absolute).map_err(|err| CompileError::io(&absolute, err))?;
    let options = RewriteOptions {
        environment,
        apis: &settings.apis,
    };

    let mut reextracted = None;
    let mut output = if extracted {
        rewrite_source(&file, &source, &entries, &options).ok()
    } else {
        None
    };
    let needs_extraction = output.as_ref().is_some_and(|out| {
        out.sites
            .iter()
            .any(|s| matches!(s.status, SiteStatus::Stale | SiteStatus::Missing))
    });
    if needs_extraction {
        let outcome = process_file(settings, environment, relative, &entries)?;
        if let FileResult::Extracted(fresh) = &outcome.result {
            output = rewrite_source(&file, &source, fresh, &options).ok();
        }
        reextracted = Some(outcome);
    }

    let (text, rewritten) = match output {
        Some(RewriteOutput { source: text, sites }) if sites.iter().all(|s| s.status == SiteStatus::Rewritten) => {
            (text, !sites.is_empty())
        }
        _ => (source, false),
    };

    let target = settings.output_dir().join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|err| CompileError::io(parent, err))?;
    }
    fs::write(&target, text).map_err(|err| CompileError::io(&target, err))?;
    Ok(OutputStep {
        rewritten,
        reextracted,
    })
}
