//! CLI outcomes that fail the process without being I/O or config errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// A run finished with error diagnostics
    #[error("{0} style site error(s); rerun with --soft-fail to keep failing files unoptimized")]
    SiteErrors(usize),

    /// `rewrite` found sites without a fresh cache entry
    #[error("{0} style site(s) have no fresh cache entry; run `stylebake extract` first")]
    NotExtracted(usize),

    /// The file passed to `rewrite` is outside the project root
    #[error("{0} is not inside the project root")]
    OutsideProject(String),
}
