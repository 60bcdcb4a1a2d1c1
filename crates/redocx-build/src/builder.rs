//! Render command invocation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::paths::PathTable;

/// Subcommand passed to the render tool.
const RENDER_SUBCOMMAND: &str = "build-docs";

/// Configuration for invoking the render tool.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the rendered artifact tree
    pub base_dir: PathBuf,

    /// Render tool program followed by its leading arguments
    pub command: Vec<String>,

    /// Kill the render tool if it runs longer than this
    pub timeout: Option<Duration>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("api_docs"),
            command: vec!["npx".to_string(), "@redocly/cli".to_string()],
            timeout: None,
        }
    }
}

/// Errors that can occur while rendering a document.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Render command is empty")]
    EmptyCommand,

    #[error("Failed to launch render command: {0}")]
    SpawnError(String),

    #[error("Failed waiting on render command: {0}")]
    WaitError(String),

    #[error("Render command failed with {0}")]
    Failed(ExitStatus),

    #[error("Render command timed out after {0:?}")]
    TimedOut(Duration),
}

/// Outcome of rendering one input.
#[derive(Debug)]
pub struct BuildResult {
    /// Source document that was rendered
    pub input_path: PathBuf,

    /// Artifact path relative to the base output directory
    pub artifact_path: String,

    /// Wall time spent in the render command
    pub duration: Duration,

    /// Set when the render command did not succeed
    pub error: Option<BuildError>,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Renders watched inputs by shelling out to the render tool.
#[derive(Debug, Clone)]
pub struct DocBuilder {
    config: BuildConfig,
    table: Arc<PathTable>,
}

impl DocBuilder {
    pub fn new(config: BuildConfig, table: Arc<PathTable>) -> Self {
        Self { config, table }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Render `input` to its mapped artifact path.
    ///
    /// The render tool's stdout and stderr are both relayed to this process's
    /// stdout. Only the exit status is inspected.
    #[tracing::instrument(skip_all, fields(input = %input.display()))]
    pub async fn build(&self, input: &Path) -> BuildResult {
        let start = Instant::now();
        let artifact_path = self.table.artifact_path(input);

        let error = self.run(input, &artifact_path).await.err();
        let duration = start.elapsed();

        match &error {
            None => tracing::debug!(
                "Rendered {} in {}ms",
                artifact_path,
                duration.as_millis()
            ),
            Some(e) => tracing::debug!("Render of {} failed: {}", input.display(), e),
        }

        BuildResult {
            input_path: input.to_path_buf(),
            artifact_path,
            duration,
            error,
        }
    }

    /// Assemble `<tool...> build-docs -o <base_dir>/<artifact> <input>`.
    fn command(&self, input: &Path, artifact_path: &str) -> Result<Command, BuildError> {
        let (program, leading) = self
            .config
            .command
            .split_first()
            .ok_or(BuildError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(leading)
            .arg(RENDER_SUBCOMMAND)
            .arg("-o")
            .arg(self.config.base_dir.join(artifact_path))
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(io::stdout())
            .kill_on_drop(true);

        Ok(cmd)
    }

    async fn run(&self, input: &Path, artifact_path: &str) -> Result<(), BuildError> {
        let mut cmd = self.command(input, artifact_path)?;
        tracing::debug!("Running render command: {:?}", cmd.as_std());

        let mut child = cmd
            .spawn()
            .map_err(|e| BuildError::SpawnError(e.to_string()))?;

        let status = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to kill timed out render command: {}", e);
                    }
                    return Err(BuildError::TimedOut(limit));
                }
            },
            None => child.wait().await,
        }
        .map_err(|e| BuildError::WaitError(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::Failed(status))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::paths::{Extensions, WatchEntry};
    use std::fs;
    use tempfile::tempdir;

    /// Stand-in render tool that checks its argument layout and copies the input.
    const COPY_SCRIPT: &str =
        r#"[ "$1" = build-docs ] && [ "$2" = -o ] && mkdir -p "$(dirname "$3")" && cp "$4" "$3""#;

    fn sh(script: &str) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "render".to_string(),
        ]
    }

    fn setup(command: Vec<String>) -> (tempfile::TempDir, PathBuf, DocBuilder) {
        let temp = tempdir().unwrap();
        let input = temp.path().join("spec").join("a.yaml");
        fs::create_dir_all(input.parent().unwrap()).unwrap();
        fs::write(&input, "openapi: 3.0.0\n").unwrap();

        let table = PathTable::from_entries(
            vec![WatchEntry {
                input_path: input.clone(),
                output_dir: "docs".to_string(),
            }],
            Extensions::default(),
        )
        .unwrap();

        let builder = DocBuilder::new(
            BuildConfig {
                base_dir: temp.path().join("out"),
                command,
                timeout: None,
            },
            Arc::new(table),
        );

        (temp, input, builder)
    }

    #[tokio::test]
    async fn renders_to_mapped_artifact() {
        let (temp, input, builder) = setup(sh(COPY_SCRIPT));

        let result = builder.build(&input).await;

        assert!(result.is_success(), "build failed: {:?}", result.error);
        assert_eq!(result.artifact_path, "docs/a.html");
        let artifact = temp.path().join("out/docs/a.html");
        assert_eq!(fs::read_to_string(artifact).unwrap(), "openapi: 3.0.0\n");
    }

    #[tokio::test]
    async fn rebuilding_unchanged_input_is_idempotent() {
        let (temp, input, builder) = setup(sh(COPY_SCRIPT));
        let artifact = temp.path().join("out/docs/a.html");

        assert!(builder.build(&input).await.is_success());
        let first = fs::read(&artifact).unwrap();
        assert!(builder.build(&input).await.is_success());
        let second = fs::read(&artifact).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let (_temp, input, builder) = setup(sh("exit 3"));

        let result = builder.build(&input).await;

        match result.error {
            Some(BuildError::Failed(status)) => assert_eq!(status.code(), Some(3)),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reports_launch_failure() {
        let (_temp, input, builder) =
            setup(vec!["redocx-no-such-render-tool".to_string()]);

        let result = builder.build(&input).await;

        assert!(matches!(result.error, Some(BuildError::SpawnError(_))));
    }

    #[tokio::test]
    async fn rejects_empty_command() {
        let (_temp, input, builder) = setup(Vec::new());

        let result = builder.build(&input).await;

        assert!(matches!(result.error, Some(BuildError::EmptyCommand)));
    }

    #[tokio::test]
    async fn kills_render_command_after_timeout() {
        let (_temp, input, builder) = setup(sh("sleep 5"));
        let builder = DocBuilder::new(
            BuildConfig {
                timeout: Some(Duration::from_millis(100)),
                ..builder.config().clone()
            },
            Arc::clone(&builder.table),
        );

        let result = builder.build(&input).await;

        assert!(matches!(result.error, Some(BuildError::TimedOut(_))));
        assert!(result.duration < Duration::from_secs(5));
    }

    #[derive(Clone, Default)]
    struct SpanFields(Arc<std::sync::Mutex<Vec<(String, String, String)>>>);

    struct FieldVisitor<'a>(&'a SpanFields, &'static str);

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0 .0.lock().unwrap().push((
                self.1.to_string(),
                field.name().to_string(),
                format!("{value:?}"),
            ));
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanFields {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            attrs.record(&mut FieldVisitor(self, attrs.metadata().name()));
        }
    }

    #[tokio::test]
    async fn build_runs_inside_a_span_naming_the_input() {
        use tracing_subscriber::layer::SubscriberExt;

        let spans = SpanFields::default();
        let subscriber = tracing_subscriber::registry().with(spans.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let (_temp, input, builder) = setup(sh(COPY_SCRIPT));
        assert!(builder.build(&input).await.is_success());

        let recorded = spans.0.lock().unwrap();
        assert!(
            recorded.contains(&(
                "build".to_string(),
                "input".to_string(),
                input.display().to_string()
            )),
            "spans: {recorded:?}"
        );
    }
}
