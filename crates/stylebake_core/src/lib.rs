//! stylebake core model
//!
//! Shared data types for the style extraction pipeline:
//!
//! - [`StyleSite`]: identity of one style-definition call site
//! - [`ExtractedNode`]: the canonical, theme-independent description of a style tree
//! - [`ThemeRef`] / [`ThemeExpr`]: recorded reads (and derivations) of theme values
//! - [`CacheEntry`]: one persisted extraction result
//! - [`Diagnostic`]: a structured pipeline failure or notice
//!
//! # Wire format
//!
//! Trees serialize to plain JSON. Theme references are written as
//! `{ "themeRef": ["colors", "text", "primary"] }`, everything else as the native
//! JSON value. See [`ExtractedNode::to_json`] for the full mapping.

pub mod diagnostic;
pub mod entry;
pub mod expr;
pub mod hash;
pub mod key;
pub mod node;
pub mod path;
pub mod site;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use entry::CacheEntry;
pub use expr::{BinaryOp, Literal, ThemeExpr, UnaryOp};
pub use hash::{content_hash, digest_hex, HASH_VERSION};
pub use key::{array_index, insertion_point, sort_keys};
pub use node::{DecodeError, ExtractedNode, ThemeRef, VariantTable};
pub use path::ThemePath;
pub use site::{SiteKind, StyleSite};
