//! Watch, rebuild and publish pipeline for redocx.
//!
//! Watches source documents, re-renders them on change, serves the rendered
//! tree over HTTP and announces a share link for every fresh artifact.

pub mod debounce;
pub mod pipeline;
pub mod server;
pub mod watcher;

pub use debounce::Debouncer;
pub use pipeline::{FailurePolicy, Pipeline, PipelineError};
pub use server::{Publisher, PublisherConfig, ServerError};
pub use watcher::{ChangeEvent, ChangeKind, FileWatcher};
