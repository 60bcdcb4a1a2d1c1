//! File watching for rebuilds.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::debounce::Debouncer;
use crate::server::ServerError;

/// Kind of change that triggers a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File contents were written
    Write,

    /// File was created
    Create,
}

/// A rebuild-worthy change to a watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Watches individual files and yields their write/create events.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    debouncer: Debouncer,
    ready: VecDeque<ChangeEvent>,
}

impl FileWatcher {
    /// Register each path, non-recursively.
    ///
    /// Events queue without bound while the consumer is busy, so nothing is
    /// dropped during a slow build.
    pub fn new<'a>(
        paths: impl IntoIterator<Item = &'a Path>,
        debounce: Duration,
    ) -> Result<Self, ServerError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })
        .map_err(|e| ServerError::WatchError(e.to_string()))?;

        for path in paths {
            watcher
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|e| ServerError::WatchError(format!("{}: {}", path.display(), e)))?;
            tracing::info!("WATCH: {}", path.display());
        }

        Ok(Self {
            _watcher: watcher,
            rx,
            debouncer: Debouncer::new(debounce),
            ready: VecDeque::new(),
        })
    }

    /// Wait for the next change.
    ///
    /// Notifier errors are logged and skipped. Returns `None` once the
    /// notifier's channel closes.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        loop {
            if let Some(change) = self.ready.pop_front() {
                return Some(change);
            }

            let message = match self.debouncer.next_deadline() {
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                        Ok(message) => message,
                        Err(_) => {
                            self.ready.extend(self.debouncer.take_ready());
                            continue;
                        }
                    }
                }
                None => self.rx.recv().await,
            };

            match message {
                Some(Ok(event)) => self.accept(event),
                Some(Err(e)) => tracing::warn!("File watch error: {}", e),
                None => return None,
            }

            self.ready.extend(self.debouncer.take_ready());
        }
    }

    fn accept(&mut self, event: notify::Event) {
        let Some(kind) = classify_event(&event.kind) else {
            tracing::trace!("Ignoring {:?} on {:?}", event.kind, event.paths);
            return;
        };

        for path in event.paths {
            self.debouncer.record(ChangeEvent { path, kind });
        }
    }
}

/// Classify a notify event kind. Only content writes and creations qualify.
fn classify_event(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(ChangeKind::Write)
        }
        _ => None,
    }
}
