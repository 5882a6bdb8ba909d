//! Structured pipeline diagnostics

use crate::path::ThemePath;
use crate::site::StyleSite;
use serde::Serialize;
use std::fmt;

/// What went wrong (or what is worth reporting)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// A theme value was used in a way that cannot keep its reference
    UnresolvableThemeUsage,
    /// A cached site no longer exists in source
    MissingStyleSite,
    /// An iteration marker has no key set, or variant runs disagree
    IterationMismatch,
    /// The style function could not be evaluated
    EvaluationError,
    /// The cache document could not be read and was discarded
    CacheCorrupt,
    /// A file or call site was skipped during discovery
    DiscoveryWarning,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnresolvableThemeUsage => "UnresolvableThemeUsage",
            DiagnosticKind::MissingStyleSite => "MissingStyleSite",
            DiagnosticKind::IterationMismatch => "IterationMismatch",
            DiagnosticKind::EvaluationError => "EvaluationError",
            DiagnosticKind::CacheCorrupt => "CacheCorrupt",
            DiagnosticKind::DiscoveryWarning => "DiscoveryWarning",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<StyleSite>,
    pub file: String,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ThemePath>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        file: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            site: None,
            file: file.into(),
            kind,
            severity,
            detail: detail.into(),
            path: None,
        }
    }

    pub fn error(kind: DiagnosticKind, file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, file, detail)
    }

    pub fn warning(kind: DiagnosticKind, file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, file, detail)
    }

    pub fn info(kind: DiagnosticKind, file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, file, detail)
    }

    /// Attach the site; also takes over its file path
    pub fn with_site(mut self, site: StyleSite) -> Self {
        self.file = site.file_path.clone();
        self.site = Some(site);
        self
    }

    pub fn with_path(mut self, path: Option<ThemePath>) -> Self {
        self.path = path;
        self
    }

    /// Downgrade an error to a warning (soft-fail builds)
    pub fn softened(mut self) -> Self {
        if self.severity == Severity::Error {
            self.severity = Severity::Warning;
        }
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] ", self.severity, self.kind.as_str())?;
        match &self.site {
            Some(site) => write!(f, "{site}")?,
            None => f.write_str(&self.file)?,
        }
        write!(f, ": {}", self.detail)?;
        if let Some(path) = &self.path {
            write!(f, " (theme.{path})")?;
        }
        Ok(())
    }
}
