//! stylebake command line

mod config;
mod error;
mod logging;
mod project;
mod watch;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use stylebake_compiler::{
    rewrite_source, run, site_path, BuildSettings, CacheStore, FileStatus, RewriteOptions, RunMode, RunReport,
    SiteStatus,
};
use stylebake_core::{Diagnostic, Severity};
use stylebake_theme::{ShapePreset, Target};

use crate::config::{StylebakeConfig, CONFIG_FILE};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "stylebake")]
#[command(version, about = "Extract theme-parameterized styles into static trees and rewrite their call sites")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project directory or config file
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, update the cache and write rewritten sources
    Build(RunArgs),

    /// Extract and update the cache without rewriting
    Extract(RunArgs),

    /// Extract and report without touching the cache
    Check(RunArgs),

    /// Print one file rewritten from the cache
    Rewrite {
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Build target the cache was extracted for
        #[arg(long)]
        target: Option<Target>,
    },

    /// Build, then rebuild whenever sources, the theme or the config change
    Watch(RunArgs),

    /// Remove the cache and the rewritten output
    Clean,

    /// Write a stylebake.toml and a starter theme
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Preset the starter theme is copied from
        #[arg(long, default_value = "standard")]
        preset: ShapePreset,

        /// Overwrite an existing config and theme
        #[arg(long)]
        force: bool,
    },
}

/// Overrides shared by the run commands
#[derive(Args, Clone, Default)]
struct RunArgs {
    #[arg(long)]
    target: Option<Target>,

    /// Report failing files as warnings and leave them unoptimized
    #[arg(long)]
    soft_fail: bool,

    /// Parallel extraction tasks
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Whole-run time budget in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let root = project_root(&cli.project);
    match cli.command {
        Commands::Build(args) => cmd_run(&cli.project, &root, RunMode::Build, &args).await,
        Commands::Extract(args) => cmd_run(&cli.project, &root, RunMode::Extract, &args).await,
        Commands::Check(args) => cmd_run(&cli.project, &root, RunMode::Check, &args).await,
        Commands::Rewrite { file, output, target } => cmd_rewrite(&cli.project, &root, &file, output, target),
        Commands::Watch(args) => cmd_watch(&cli.project, &root, &args).await,
        Commands::Clean => cmd_clean(&cli.project, &root),
        Commands::Init { name, preset, force } => {
            let name = name.unwrap_or_else(|| {
                root.canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .unwrap_or_else(|| "styles".to_string())
            });
            project::init_project(&root, &name, preset, force)?;
            println!("Created {} in {}", CONFIG_FILE, root.display());
            Ok(())
        }
    }
}

/// `-C` may name the config file itself
fn project_root(project: &Path) -> PathBuf {
    if project.is_file() {
        project.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
    } else {
        project.to_path_buf()
    }
}

fn load_settings(project: &Path, root: &Path, args: &RunArgs) -> Result<BuildSettings> {
    let config = StylebakeConfig::load_from_dir(project)?;
    let mut settings = config.to_settings(root)?;
    if let Some(target) = args.target {
        settings.target = target;
    }
    if args.soft_fail {
        settings.soft_fail = true;
    }
    if let Some(jobs) = args.jobs {
        settings.jobs = jobs;
    }
    if let Some(secs) = args.timeout {
        settings.timeout = (secs > 0).then(|| std::time::Duration::from_secs(secs));
    }
    Ok(settings)
}

async fn cmd_run(project: &Path, root: &Path, mode: RunMode, args: &RunArgs) -> Result<()> {
    let settings = load_settings(project, root, args)?;
    let report = run(Arc::new(settings), mode).await?;
    finish(&report, args)
}

/// Print the report, write it if asked, and fail on error diagnostics
fn finish(report: &RunReport, args: &RunArgs) -> Result<()> {
    for diagnostic in &report.diagnostics {
        print_diagnostic(diagnostic);
    }
    println!(
        "{} file(s): {} extracted, {} fresh, {} failed, {} rewritten ({} ms)",
        report.files.len(),
        report.files_with(FileStatus::Extracted),
        report.files_with(FileStatus::Fresh),
        report.files_with(FileStatus::Failed),
        report.files.iter().filter(|f| f.rewritten).count(),
        report.duration_ms
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(report).context("Failed to encode run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if report.has_fatal() {
        return Err(CliError::SiteErrors(report.count(Severity::Error)).into());
    }
    Ok(())
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    let site = diagnostic
        .site
        .as_ref()
        .map(|s| format!(" ({})", s.export_name))
        .unwrap_or_default();
    eprintln!(
        "{}[{}]: {}{site}: {}",
        diagnostic.severity,
        diagnostic.kind.as_str(),
        diagnostic.file,
        diagnostic.detail
    );
}

fn cmd_rewrite(
    project: &Path,
    root: &Path,
    file: &Path,
    output: Option<PathBuf>,
    target: Option<Target>,
) -> Result<()> {
    let args = RunArgs {
        target,
        ..RunArgs::default()
    };
    let settings = load_settings(project, root, &args)?;

    let absolute = fs::canonicalize(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let root_abs = fs::canonicalize(root).with_context(|| format!("Failed to read {}", root.display()))?;
    let relative = absolute
        .strip_prefix(&root_abs)
        .map_err(|_| CliError::OutsideProject(file.display().to_string()))?;
    let source = fs::read_to_string(&absolute).with_context(|| format!("Failed to read {}", file.display()))?;

    let (cache, corrupt) = CacheStore::open(settings.cache_file())?;
    if let Some(diagnostic) = corrupt {
        print_diagnostic(&diagnostic);
    }
    let path = site_path(relative);
    let environment = settings.environment();
    let options = RewriteOptions {
        environment: &environment,
        apis: &settings.apis,
    };
    let rewritten = rewrite_source(&path, &source, &cache.file_entries(&path), &options)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let pending: Vec<_> = rewritten
        .sites
        .iter()
        .filter(|s| matches!(s.status, SiteStatus::Stale | SiteStatus::Missing))
        .collect();
    for site in &pending {
        tracing::warn!(site = %site.site, status = ?site.status, "Site not rewritten");
    }
    if !pending.is_empty() {
        return Err(CliError::NotExtracted(pending.len()).into());
    }

    match output {
        Some(out) => {
            fs::write(&out, &rewritten.source).with_context(|| format!("Failed to write {}", out.display()))?;
            tracing::info!(file = %path, sites = rewritten.sites.len(), output = %out.display(), "Rewrote file");
        }
        None => print!("{}", rewritten.source),
    }
    Ok(())
}

async fn cmd_watch(project: &Path, root: &Path, args: &RunArgs) -> Result<()> {
    let watch_root = fs::canonicalize(root).with_context(|| format!("Failed to read {}", root.display()))?;
    let mut settings = Arc::new(load_settings(project, root, args)?);
    let mut watcher = watch::ProjectWatcher::new(
        &watch_root,
        &watch_root.join(CONFIG_FILE),
        &watch_ignores(&watch_root, &settings),
    )?;

    rebuild(&settings, args).await;
    tracing::info!(root = %root.display(), "Watching for changes");

    while let Some(changes) = watcher.next().await {
        if changes.config {
            match load_settings(project, root, args) {
                Ok(reloaded) => {
                    settings = Arc::new(reloaded);
                    if let Err(err) = watcher.set_ignores(&watch_ignores(&watch_root, &settings)) {
                        eprintln!("error: {err:#}");
                    }
                }
                Err(err) => {
                    eprintln!("error: {err:#}");
                    continue;
                }
            }
        }
        tracing::info!(changed = changes.paths.len(), "Rebuilding");
        rebuild(&settings, args).await;
    }
    Ok(())
}

/// Excluded sources plus everything a build writes
fn watch_ignores(watch_root: &Path, settings: &BuildSettings) -> Vec<String> {
    let mut ignores = settings.exclude.clone();
    ignores.extend(watch::generated_ignores(
        watch_root,
        &[settings.out_dir.clone(), settings.cache_path.clone()],
    ));
    ignores
}

/// One watch iteration; failures are printed, never fatal
async fn rebuild(settings: &Arc<BuildSettings>, args: &RunArgs) {
    let result = match run(settings.clone(), RunMode::Build).await {
        Ok(report) => finish(&report, args),
        Err(err) => Err(err.into()),
    };
    if let Err(err) = result {
        eprintln!("error: {err:#}");
    }
}

fn cmd_clean(project: &Path, root: &Path) -> Result<()> {
    let settings = load_settings(project, root, &RunArgs::default())?;

    let cache = settings.cache_file();
    if cache.is_file() {
        fs::remove_file(&cache).with_context(|| format!("Failed to remove {}", cache.display()))?;
        println!("Removed {}", cache.display());
    }
    let out = settings.output_dir();
    if out.is_dir() {
        fs::remove_dir_all(&out).with_context(|| format!("Failed to remove {}", out.display()))?;
        println!("Removed {}", out.display());
    }
    Ok(())
}
