use std::fmt;

use kube::api::WatchEvent;

/// One lifecycle notification for a resource of type `K`.
///
/// Each watcher subscribes to its own resource type, so a job watcher only ever
/// sees `ClusterEvent<Job>` and a pod watcher only `ClusterEvent<Pod>`.
#[derive(Debug, Clone)]
pub(crate) enum ClusterEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
    /// Error reported in-band by the watch
    Error(String),
    /// Anything else the watch may deliver, such as bookmarks
    Unknown(String),
}

impl<K> ClusterEvent<K> {
    pub(crate) fn kind(&self) -> EventKind {
        match self {
            ClusterEvent::Added(_) => EventKind::Added,
            ClusterEvent::Modified(_) => EventKind::Modified,
            ClusterEvent::Deleted(_) => EventKind::Deleted,
            ClusterEvent::Error(_) => EventKind::Error,
            ClusterEvent::Unknown(_) => EventKind::Unknown,
        }
    }
}

impl<K> From<WatchEvent<K>> for ClusterEvent<K> {
    fn from(event: WatchEvent<K>) -> Self {
        match event {
            WatchEvent::Added(object) => ClusterEvent::Added(object),
            WatchEvent::Modified(object) => ClusterEvent::Modified(object),
            WatchEvent::Deleted(object) => ClusterEvent::Deleted(object),
            WatchEvent::Error(status) => ClusterEvent::Error(format!("{status:?}")),
            WatchEvent::Bookmark(_) => ClusterEvent::Unknown("bookmark".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    Added,
    Modified,
    Deleted,
    Error,
    Unknown,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Added => "ADDED",
            EventKind::Modified => "MODIFIED",
            EventKind::Deleted => "DELETED",
            EventKind::Error => "ERROR",
            EventKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}
