//! redocx CLI - watch OpenAPI documents, re-render on change, share the link.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use redocx_server::FailurePolicy;

mod config;
mod run;

#[derive(Parser)]
#[command(name = "redocx")]
#[command(about = "Watch OpenAPI documents, re-render them on change and share the result")]
#[command(after_help = "Example: redocx admin_api:../admin-api/openapi.yaml open_api:openapi.yaml")]
#[command(version)]
pub struct Cli {
    /// Documents to watch, as <outputDir>:<inputPath>
    #[arg(value_name = "ENTRY", required = true)]
    entries: Vec<String>,

    /// Path to redocx.toml config file
    #[arg(short, long, default_value = "redocx.toml")]
    config: PathBuf,

    /// Host to bind the artifact server to
    #[arg(long)]
    host: Option<String>,

    /// Port to serve rendered docs on
    #[arg(short, long)]
    port: Option<u16>,

    /// Root directory for rendered docs
    #[arg(short = 'o', long)]
    base_dir: Option<PathBuf>,

    /// Network interface whose address is used in share links
    #[arg(short, long)]
    interface: Option<String>,

    /// What to do when a render fails: abort or skip
    #[arg(long, value_name = "POLICY")]
    on_build_failure: Option<FailurePolicy>,

    /// Quiet period in milliseconds before rebuilding a changed file
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Do not copy share links to the clipboard
    #[arg(long)]
    no_clipboard: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            host: self.host.clone(),
            port: self.port,
            base_dir: self.base_dir.clone(),
            interface: self.interface.clone(),
            on_failure: self.on_build_failure,
            debounce_ms: self.debounce_ms,
            no_clipboard: self.no_clipboard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = config::load_config(&cli.config)?;
    config.apply(cli.overrides());

    run::run(&cli.entries, config).await
}
