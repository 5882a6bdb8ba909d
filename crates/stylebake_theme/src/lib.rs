//! stylebake theme model
//!
//! - [`ThemeShape`]: the structure of a theme, used as the oracle for proxy reads
//! - [`Enumerations`]: key sets for `$name` iteration markers
//! - [`Target`]: build targets and their [`Capabilities`]
//! - [`ShapePreset`]: built-in theme instances

pub mod enumeration;
pub mod error;
pub mod presets;
pub mod shape;
pub mod target;

pub use enumeration::{find_marker, is_marker_segment, Enumerations, MarkerRef, MARKER_PREFIX};
pub use error::{Result, ShapeError};
pub use presets::ShapePreset;
pub use shape::{LeafKind, ShapeNode, ThemeShape};
pub use target::{Capabilities, Target};
