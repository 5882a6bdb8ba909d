//! Extraction executor
//!
//! Runs a discovered site's callable against the instrumented theme once per
//! combination of its iteration-marker keys and folds the results into one
//! canonical tree.

use crate::canonical::{fold, to_node, FoldError, Run};
use crate::discovery::DiscoveredSite;
use stylebake_core::{Diagnostic, DiagnosticKind, ExtractedNode, StyleSite, ThemePath};
use stylebake_script::{deep_merge, EvalError, EvalOptions, Interpreter, Module, ProxyTheme, Value};
use stylebake_theme::{Enumerations, ThemeShape};

/// Why a site could not be extracted
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFailure {
    pub kind: DiagnosticKind,
    pub detail: String,
    pub path: Option<ThemePath>,
}

impl SiteFailure {
    fn new(kind: DiagnosticKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            path: None,
        }
    }

    pub fn into_diagnostic(self, site: &StyleSite) -> Diagnostic {
        Diagnostic::error(self.kind, site.file_path.clone(), self.detail)
            .with_site(site.clone())
            .with_path(self.path)
    }
}

impl From<EvalError> for SiteFailure {
    fn from(err: EvalError) -> Self {
        let kind = match &err {
            EvalError::Unresolvable { .. } | EvalError::PropsDependency => {
                DiagnosticKind::UnresolvableThemeUsage
            }
            EvalError::UnboundMarker(_) => DiagnosticKind::IterationMismatch,
            _ => DiagnosticKind::EvaluationError,
        };
        let path = err.theme_path().cloned();
        let detail = match &path {
            Some(path) => format!("{err} (theme path '{path}')"),
            None => err.to_string(),
        };
        Self { kind, detail, path }
    }
}

impl From<FoldError> for SiteFailure {
    fn from(err: FoldError) -> Self {
        SiteFailure::new(DiagnosticKind::IterationMismatch, err.to_string())
    }
}

/// Shared inputs for extracting the sites of one module
pub struct Extractor<'a> {
    module: &'a Module,
    shape: &'a ThemeShape,
    enumerations: &'a Enumerations,
    options: EvalOptions,
}

impl<'a> Extractor<'a> {
    pub fn new(
        module: &'a Module,
        shape: &'a ThemeShape,
        enumerations: &'a Enumerations,
        options: EvalOptions,
    ) -> Self {
        Self {
            module,
            shape,
            enumerations,
            options,
        }
    }

    /// Extract one site into its canonical tree
    pub fn extract(&self, discovered: &DiscoveredSite) -> Result<ExtractedNode, SiteFailure> {
        let markers = &discovered.site.variant_keys;
        let mut key_sets = Vec::with_capacity(markers.len());
        for marker in markers {
            let keys = self.enumerations.keys(marker, self.shape).map_err(|err| {
                SiteFailure::new(DiagnosticKind::IterationMismatch, err.to_string())
            })?;
            key_sets.push(keys);
        }

        let combinations = cross_product(&key_sets);
        tracing::debug!(
            site = %discovered.site,
            runs = combinations.len(),
            "Extracting style site"
        );

        let mut runs = Vec::with_capacity(combinations.len());
        for keys in combinations {
            let tree = self.run(discovered, markers, &keys)?;
            runs.push(Run { keys, tree });
        }
        Ok(fold(markers, &runs)?)
    }

    /// One shadow run with a fresh module scope and proxy
    fn run(
        &self,
        discovered: &DiscoveredSite,
        markers: &[String],
        keys: &[String],
    ) -> Result<ExtractedNode, SiteFailure> {
        let interp = Interpreter::new(self.module, self.options);
        let theme = ProxyTheme::wrap(self.shape)
            .with_markers(markers.iter().cloned().zip(keys.iter().cloned()))
            .value();

        let mut result: Option<Value> = None;
        for part in std::iter::once(&discovered.base).chain(&discovered.extensions) {
            let callable = interp.eval_expr(part, interp.module_env())?;
            let styles = if callable.is_function() {
                interp.call(&callable, vec![theme.clone()])?
            } else {
                callable
            };
            result = Some(match result {
                Some(base) => deep_merge(base, styles),
                None => styles,
            });
        }
        let result = result.unwrap_or(Value::Undefined);
        Ok(to_node(&interp, &result)?)
    }
}

/// Every combination of one key per set, last set varying fastest
fn cross_product(sets: &[Vec<String>]) -> Vec<Vec<String>> {
    sets.iter().fold(vec![Vec::new()], |acc, set| {
        acc.into_iter()
            .flat_map(|prefix| {
                set.iter().map(move |key| {
                    let mut next = prefix.clone();
                    next.push(key.clone());
                    next
                })
            })
            .collect()
    })
}
