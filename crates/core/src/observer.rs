//! Notifications to the shell that presents pipeline state.

use tokio::sync::broadcast;

use crate::item::Snapshot;

/// Receives fire-and-forget notifications from the pipeline.
///
/// Implementations must return quickly and must not call back into the
/// registry: `on_state_changed` is invoked while the registry lock is held so
/// snapshots are delivered in mutation order.
pub trait Observer: Send + Sync {
    /// Called after every externally visible registry mutation.
    fn on_state_changed(&self, snapshot: &Snapshot);

    /// Called for run-level problems the user should see.
    fn on_run_error(&self, message: &str);
}

/// Observer that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_state_changed(&self, _snapshot: &Snapshot) {}

    fn on_run_error(&self, _message: &str) {}
}

/// Event forwarded by [`BroadcastObserver`].
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    State(Snapshot),
    RunError(String),
}

/// Observer that fans notifications out over a broadcast channel.
///
/// Slow subscribers lag and lose events instead of blocking the pipeline.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<PipelineEvent>,
}

impl BroadcastObserver {
    /// Creates an observer buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }
}

impl Observer for BroadcastObserver {
    fn on_state_changed(&self, snapshot: &Snapshot) {
        // No receivers is fine
        let _ = self.tx.send(PipelineEvent::State(snapshot.clone()));
    }

    fn on_run_error(&self, message: &str) {
        let _ = self.tx.send(PipelineEvent::RunError(message.to_string()));
    }
}
