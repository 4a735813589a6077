use std::future::Future;

use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Tracks the log streamers of a run so it can wait for all of them to finish.
///
/// A task counts as outstanding from the moment it is spawned until it returns
/// or panics.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompletionSynchronizer {
    tracker: TaskTracker,
}

impl CompletionSynchronizer {
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task.in_current_span());
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until no tracked task is left.
    pub(crate) async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
