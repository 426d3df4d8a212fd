//! Layer definition and parameter files.
//!
//! Both files share one format: a section per layer, keyed by layer name,
//! holding raw `key = value` strings. Typed access goes through
//! [`ConfigSection`], which maps parse failures to [`crate::CompileError`]
//! once, at the accessor boundary.

pub mod reader;
pub mod section;

pub use reader::{ConfigFile, DEFAULT_SECTION};
pub use section::{ConfigSection, ConfigValue, LIST_DELIMITER};
