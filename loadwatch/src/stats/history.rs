use std::collections::VecDeque;

use crate::api::Snapshot;

pub const HISTORY_CAPACITY: usize = 360;

/// Bounded newest-first window of snapshots.
///
/// Order is strictly arrival order, not embedded-timestamp order; the
/// newest push is always element 0 and the tail is evicted past capacity.
#[derive(Debug)]
pub struct SnapshotHistory {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl SnapshotHistory {
    pub fn new() -> SnapshotHistory {
        SnapshotHistory::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> SnapshotHistory {
        SnapshotHistory {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push_front(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn newest(&self) -> Option<&Snapshot> {
        self.entries.front()
    }

    /// Newest-first iteration over the whole window.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}

impl Default for SnapshotHistory {
    fn default() -> SnapshotHistory {
        SnapshotHistory::new()
    }
}
