use crate::models::Stats;
use parking_lot::RwLock;
use std::sync::Arc;

/// Latest decoded snapshot, swapped wholesale by the fetcher.
///
/// Readers clone the inner `Arc` and release the lock immediately, so a
/// collection pass always sees one snapshot in its entirety.
#[derive(Clone, Default)]
pub struct SnapshotHandle {
    current: Arc<RwLock<Option<Arc<Stats>>>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Option<Arc<Stats>> {
        self.current.read().clone()
    }

    /// Replaces the snapshot and returns the shared handle to the new one.
    pub fn replace(&self, stats: Stats) -> Arc<Stats> {
        let stats = Arc::new(stats);
        *self.current.write() = Some(stats.clone());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handle_has_no_snapshot() {
        assert!(SnapshotHandle::new().load().is_none());
    }

    #[test]
    fn test_replace_does_not_touch_loaded_snapshot() {
        let handle = SnapshotHandle::new();
        let mut first = Stats::default();
        first.filebeat.events.active = 1.0;
        handle.replace(first);

        let held = handle.load().unwrap();

        let mut second = Stats::default();
        second.filebeat.events.active = 2.0;
        handle.replace(second);

        assert_eq!(held.filebeat.events.active, 1.0);
        assert_eq!(handle.load().unwrap().filebeat.events.active, 2.0);
    }
}
