//! stylebake script engine
//!
//! Style modules are parsed with [`parse_module`] and shadow-executed by an
//! [`Interpreter`]. Passing a [`ProxyTheme`] as the theme argument turns every
//! theme read into a tracked value, which is how extraction learns where each
//! leaf of a style tree comes from.
//!
//! ```ignore
//! let module = parse_module(source)?;
//! let interp = Interpreter::new(&module, EvalOptions::default());
//! let styles = interp.lookup("cardStyles")?;
//! let tree = interp.call(&styles, vec![ProxyTheme::wrap(&shape).value()])?;
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interp;
pub mod merge;
pub mod parser;
pub mod proxy;
pub mod scope;
pub mod value;

pub use ast::{Expr, ExprKind, Function, Item, ItemKind, Module, Span};
pub use builtins::Builtin;
pub use error::{EvalError, Result};
pub use interp::{EvalOptions, Interpreter, Limits};
pub use merge::{deep_merge, PLATFORM_KEYS};
pub use parser::{parse_expression, parse_module, ParseError};
pub use proxy::{MarkerBindings, ProxyTheme, ThemeNode};
pub use scope::{Env, Scope};
pub use value::{number_to_string, Callable, Value};
