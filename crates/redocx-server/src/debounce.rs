//! Per-path coalescing of change events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::watcher::{ChangeEvent, ChangeKind};

/// Holds change events until their path has been quiet for the window.
///
/// A zero window releases every recorded event on the next `take_ready`.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes: path -> latest kind and time of last event.
    pending: HashMap<PathBuf, (ChangeKind, Instant)>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Record a change, restarting the quiet period for its path.
    pub fn record(&mut self, change: ChangeEvent) {
        self.pending
            .insert(change.path, (change.kind, Instant::now()));
    }

    /// Take every change whose path has been quiet for the window, oldest first.
    pub fn take_ready(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, (kind, last)| {
            if now.duration_since(*last) >= self.window {
                ready.push((*last, ChangeEvent {
                    path: path.clone(),
                    kind: *kind,
                }));
                false
            } else {
                true
            }
        });

        ready.sort_by_key(|(last, _)| *last);
        ready.into_iter().map(|(_, change)| change).collect()
    }

    /// Earliest instant at which a pending change becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|(_, last)| *last + self.window)
            .min()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn write(path: &str) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from(path),
            kind: ChangeKind::Write,
        }
    }

    #[test]
    fn zero_window_releases_immediately() {
        let mut debouncer = Debouncer::new(Duration::ZERO);

        debouncer.record(write("spec/a.yaml"));

        assert_eq!(debouncer.take_ready(), vec![write("spec/a.yaml")]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn holds_changes_until_quiet() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.record(write("spec/a.yaml"));
        assert!(debouncer.take_ready().is_empty());
        assert!(debouncer.has_pending());

        sleep(Duration::from_millis(60));

        assert_eq!(debouncer.take_ready(), vec![write("spec/a.yaml")]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn repeated_changes_coalesce_and_reset_the_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.record(write("spec/a.yaml"));
        sleep(Duration::from_millis(30));
        debouncer.record(ChangeEvent {
            path: PathBuf::from("spec/a.yaml"),
            kind: ChangeKind::Create,
        });
        sleep(Duration::from_millis(30));

        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(30));

        let ready = debouncer.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind, ChangeKind::Create);
    }

    #[test]
    fn releases_paths_independently_in_order() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.record(write("spec/a.yaml"));
        sleep(Duration::from_millis(5));
        debouncer.record(write("spec/b.yaml"));
        sleep(Duration::from_millis(60));

        assert_eq!(
            debouncer.take_ready(),
            vec![write("spec/a.yaml"), write("spec/b.yaml")]
        );
    }

    #[test]
    fn deadline_tracks_oldest_pending_change() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        assert_eq!(debouncer.next_deadline(), None);

        let before = Instant::now();
        debouncer.record(write("spec/a.yaml"));

        let deadline = debouncer.next_deadline().unwrap();
        assert!(deadline >= before + Duration::from_millis(50));
    }
}
