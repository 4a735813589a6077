use futures::StreamExt;
use tracing::debug;

use super::{ClusterError, ClusterEvent, EventStream};

/// A live, explicitly stoppable stream of events for one resource type.
pub(crate) struct Subscription<K> {
    resource: &'static str,
    events: Option<EventStream<K>>,
}

impl<K> Subscription<K> {
    pub(crate) fn new(resource: &'static str, events: EventStream<K>) -> Self {
        Subscription {
            resource,
            events: Some(events),
        }
    }

    /// Waits for the next event; `None` once stopped or once the stream has ended.
    pub(crate) async fn next(&mut self) -> Option<Result<ClusterEvent<K>, ClusterError>> {
        self.events.as_mut()?.next().await
    }

    /// Closes the underlying watch. Stopping twice is a no-op.
    pub(crate) fn stop(&mut self) {
        if self.events.take().is_some() {
            debug!("closing the {} watcher", self.resource);
        }
    }
}
