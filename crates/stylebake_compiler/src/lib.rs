//! stylebake compiler
//!
//! Turns theme-parameterized style functions into static trees and rewrites
//! their call sites:
//!
//! 1. [`sources`] selects the project files to scan
//! 2. [`discovery`] finds style sites in a parsed module
//! 3. [`extract`] shadow-executes each site against the instrumented theme and
//!    [`canonical`] folds the runs into one [`ExtractedNode`](stylebake_core::ExtractedNode)
//! 4. [`cache`] persists the trees keyed by site and content hash
//! 5. [`rewrite`] and [`codegen`] replace each site with its compiled form
//!
//! [`pipeline::run`] drives all of it over a project.
//!
//! # Example
//!
//! ```ignore
//! use stylebake_compiler::{run, BuildSettings, RunMode};
//!
//! let settings = BuildSettings::new(".", ThemeShape::load("theme.json")?);
//! let report = run(Arc::new(settings), RunMode::Build).await?;
//! if report.has_fatal() {
//!     std::process::exit(1);
//! }
//! ```

pub mod cache;
pub mod canonical;
pub mod codegen;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod rewrite;
pub mod sources;

pub use cache::{CacheStore, CACHE_VERSION};
pub use canonical::{fold, to_node, FoldError, Run};
pub use codegen::{Codegen, HoistNames, Hoisted, HOIST_PREFIX};
pub use discovery::{discover, ApiNames, DiscoveredSite, Discovery};
pub use error::{CacheError, CompileError, Result};
pub use extract::{Extractor, SiteFailure};
pub use pipeline::{run, BuildSettings, FileReport, FileStatus, RunMode, RunReport};
pub use rewrite::{rewrite_source, RewriteOptions, RewriteOutput, SiteRewrite, SiteStatus};
pub use sources::{site_path, SourceSet};
