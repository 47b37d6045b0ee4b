use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, info};

use spoilr_core::{Observer, ProcessingState, Snapshot};

/// Logs run progress in place of a UI.
#[derive(Debug, Default)]
pub struct LogObserver {
    finished: AtomicUsize,
}

impl Observer for LogObserver {
    fn on_state_changed(&self, snapshot: &Snapshot) {
        let finished = snapshot
            .items
            .iter()
            .filter(|i| i.state.is_terminal())
            .count();
        let previous = self.finished.swap(finished, Ordering::Relaxed);

        if snapshot.processing && finished > previous {
            let failed = snapshot
                .items
                .iter()
                .filter(|i| i.state == ProcessingState::Error)
                .count();
            info!(
                finished,
                failed,
                total = snapshot.items.len(),
                "Progress"
            );
        } else {
            debug!(items = snapshot.items.len(), processing = snapshot.processing, "State changed");
        }
    }

    fn on_run_error(&self, message: &str) {
        error!("{}", message);
    }
}
