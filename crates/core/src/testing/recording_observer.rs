//! Observer that records every notification.

use std::sync::{Mutex, MutexGuard};

use crate::item::{ProcessingState, Snapshot};
use crate::observer::Observer;

/// Records snapshots and run errors for assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<Snapshot>>,
    run_errors: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of state notifications received.
    pub fn state_count(&self) -> usize {
        lock(&self.snapshots).len()
    }

    /// Every snapshot received, in delivery order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        lock(&self.snapshots).clone()
    }

    /// The most recent snapshot.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        lock(&self.snapshots).last().cloned()
    }

    /// Every run error received.
    pub fn run_errors(&self) -> Vec<String> {
        lock(&self.run_errors).clone()
    }

    /// The distinct states one item went through, in order.
    pub fn state_history(&self, id: &str) -> Vec<ProcessingState> {
        let mut history: Vec<ProcessingState> = Vec::new();
        for snapshot in lock(&self.snapshots).iter() {
            if let Some(item) = snapshot.items.iter().find(|i| i.id == id) {
                if history.last() != Some(&item.state) {
                    history.push(item.state);
                }
            }
        }
        history
    }
}

impl Observer for RecordingObserver {
    fn on_state_changed(&self, snapshot: &Snapshot) {
        lock(&self.snapshots).push(snapshot.clone());
    }

    fn on_run_error(&self, message: &str) {
        lock(&self.run_errors).push(message.to_string());
    }
}
