//! Error types for shadow evaluation

use stylebake_core::{ThemeExpr, ThemePath};
use thiserror::Error;

/// Why a style function could not be shadow-executed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// A theme value was used in a way that loses its reference
    #[error("{reason}")]
    Unresolvable {
        reason: String,
        path: Option<ThemePath>,
    },

    /// The component props passed to a style entry were read
    #[error("style depends on component props")]
    PropsDependency,

    /// A `$name` marker was read in a run that has no key for it
    #[error("iteration marker '{0}' has no key in this run")]
    UnboundMarker(String),

    /// Reference to a name that is not in scope
    #[error("'{0}' is not defined")]
    Undefined(String),

    #[error("type error: {0}")]
    Type(String),

    /// A module binding whose initializer needs execution
    #[error("module binding '{0}' cannot be evaluated statically")]
    OpaqueBinding(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("assignment to constant '{0}'")]
    ConstAssign(String),

    #[error("recursion limit exceeded")]
    RecursionLimit,

    #[error("step limit exceeded")]
    StepLimit,
}

impl EvalError {
    pub fn unresolvable(reason: impl Into<String>, path: Option<ThemePath>) -> Self {
        EvalError::Unresolvable {
            reason: reason.into(),
            path,
        }
    }

    /// Unresolvable usage of a tracked expression, naming its first theme path
    pub(crate) fn on_expr(reason: impl Into<String>, expr: &ThemeExpr) -> Self {
        Self::unresolvable(reason, expr.paths().into_iter().next())
    }

    /// Theme path involved in the failure, when known
    pub fn theme_path(&self) -> Option<&ThemePath> {
        match self {
            EvalError::Unresolvable { path, .. } => path.as_ref(),
            _ => None,
        }
    }
}

/// Result type for evaluation
pub type Result<T> = std::result::Result<T, EvalError>;
