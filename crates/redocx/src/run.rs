//! Startup and task wiring.

use std::sync::Arc;

use anyhow::{Context, Result};

use redocx_build::{DocBuilder, PathTable};
use redocx_server::{FileWatcher, Pipeline, Publisher};
use redocx_share::{ClipboardSink, InterfaceResolver, LinkNotifier, NoClipboard, SystemClipboard};

use crate::config::ConfigFile;

/// Validate the watch entries, then serve and watch until a fatal error.
pub async fn run(entries: &[String], config: ConfigFile) -> Result<()> {
    tracing::info!("redocx is running!");

    let extensions = config.extensions();
    let table = Arc::new(
        PathTable::from_args(entries, extensions.clone()).context("Invalid watch entries")?,
    );

    let publisher = Publisher::bind(&config.publisher()).await?;
    let port = publisher.local_addr()?.port();

    let watcher = FileWatcher::new(table.inputs(), config.debounce())?;

    let clipboard: Box<dyn ClipboardSink> = if config.share.clipboard {
        Box::new(SystemClipboard::new())
    } else {
        Box::new(NoClipboard)
    };
    let notifier = LinkNotifier::new(
        Box::new(InterfaceResolver::new(config.share.interface.clone())),
        clipboard,
        port,
        extensions,
    );

    let builder = DocBuilder::new(config.builder(), Arc::clone(&table));
    let pipeline = Pipeline::new(table, builder, notifier, config.build.on_failure);

    let mut server = tokio::spawn(publisher.serve());
    let watch = tokio::spawn(pipeline.run(watcher));

    tokio::select! {
        res = &mut server => {
            res.context("Server task panicked")??;
            anyhow::bail!("Server stopped unexpectedly");
        }
        res = watch => {
            res.context("Watch task panicked")??;
            tracing::warn!("File watcher stopped; still serving");
            server.await.context("Server task panicked")??;
        }
    }

    Ok(())
}
