//! The watch, rebuild and notify loop.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use redocx_build::{BuildError, DocBuilder, PathTable};
use redocx_share::{LinkNotifier, ShareError};

use crate::watcher::{ChangeEvent, FileWatcher};

/// What to do when the render command fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the pipeline, ending the process
    #[default]
    Abort,

    /// Log the failure, skip the share link and keep watching
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown build failure policy '{other}' (expected abort or skip)")),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

/// Errors that stop the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to generate docs for {}: {}", .input.display(), .source)]
    Build {
        input: PathBuf,
        #[source]
        source: BuildError,
    },

    #[error("Failed to compose share link: {0}")]
    Share(#[from] ShareError),
}

/// Turns watched changes into rendered artifacts and share links.
///
/// Changes are handled one at a time in arrival order; a running build holds
/// back every later change.
#[derive(Debug)]
pub struct Pipeline {
    table: Arc<PathTable>,
    builder: DocBuilder,
    notifier: LinkNotifier,
    policy: FailurePolicy,
}

impl Pipeline {
    pub fn new(
        table: Arc<PathTable>,
        builder: DocBuilder,
        notifier: LinkNotifier,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            table,
            builder,
            notifier,
            policy,
        }
    }

    /// Consume changes until the watcher's channel closes.
    pub async fn run(self, mut watcher: FileWatcher) -> Result<(), PipelineError> {
        while let Some(change) = watcher.next_change().await {
            tracing::debug!("{:?} on {}", change.kind, change.path.display());
            self.process(&change).await?;
        }

        tracing::debug!("File watcher closed");
        Ok(())
    }

    /// Rebuild the changed input and announce its share link.
    ///
    /// Returns the link, or `None` when a failed build was skipped.
    pub async fn process(&self, change: &ChangeEvent) -> Result<Option<String>, PipelineError> {
        let input = self
            .table
            .resolve(&change.path)
            .unwrap_or(change.path.as_path());

        tracing::info!("Generating docs for {}", input.display());
        let start = Instant::now();

        let result = self.builder.build(input).await;
        if let Some(error) = result.error {
            return match self.policy {
                FailurePolicy::Abort => {
                    tracing::error!("Failed to generate docs for {}: {}", input.display(), error);
                    Err(PipelineError::Build {
                        input: result.input_path,
                        source: error,
                    })
                }
                FailurePolicy::Skip => {
                    tracing::warn!(
                        "Failed to generate docs for {}: {}; waiting for the next change",
                        input.display(),
                        error
                    );
                    Ok(None)
                }
            };
        }

        let link = self.notifier.share_link(&result.artifact_path)?;
        tracing::info!("Docs generated, share link: {}", link);
        tracing::info!("Elapsed time: {:.3}s", start.elapsed().as_secs_f64());

        self.notifier.publish(&link);

        Ok(Some(link))
    }
}
