//! Path mapping and render command invocation for redocx.
//!
//! Maps each watched source document to the location of its rendered
//! artifact and runs the external render tool to produce it.

pub mod builder;
pub mod paths;

pub use builder::{BuildConfig, BuildError, BuildResult, DocBuilder};
pub use paths::{ConfigError, Extensions, PathTable, WatchEntry};
