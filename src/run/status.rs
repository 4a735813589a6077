use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatcherKind {
    Job,
    Pod,
    Log,
}

impl fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatcherKind::Job => "job",
            WatcherKind::Pod => "pod",
            WatcherKind::Log => "log",
        };
        f.write_str(name)
    }
}

/// Which watcher kinds are currently active, shared by every task of one run.
///
/// A kind is claimed with [`try_activate`](Self::try_activate) before its
/// watcher is opened, so at most one watcher per kind runs at any time.
#[derive(Debug, Default)]
pub(crate) struct WatchStatusRegistry {
    job: AtomicBool,
    pod: AtomicBool,
    log: AtomicBool,
}

impl WatchStatusRegistry {
    fn flag(&self, kind: WatcherKind) -> &AtomicBool {
        match kind {
            WatcherKind::Job => &self.job,
            WatcherKind::Pod => &self.pod,
            WatcherKind::Log => &self.log,
        }
    }

    /// Marks `kind` active. Returns `false` if it already was.
    pub(crate) fn try_activate(&self, kind: WatcherKind) -> bool {
        let activated = self
            .flag(kind)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if activated {
            debug!("Switching on watching status for: [ {kind} ]");
        }
        activated
    }

    pub(crate) fn deactivate(&self, kind: WatcherKind) {
        debug!("Switching off watching status for: [ {kind} ]");
        self.flag(kind).store(false, Ordering::Release);
    }

    pub(crate) fn is_active(&self, kind: WatcherKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_kinds_are_independent() {
        let registry = WatchStatusRegistry::default();

        assert!(registry.try_activate(WatcherKind::Pod));
        assert!(!registry.try_activate(WatcherKind::Pod));
        assert!(registry.try_activate(WatcherKind::Log));
        assert!(!registry.is_active(WatcherKind::Job));

        registry.deactivate(WatcherKind::Pod);
        assert!(!registry.is_active(WatcherKind::Pod));
        assert!(registry.try_activate(WatcherKind::Pod));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_activation_has_one_winner() {
        let registry = Arc::new(WatchStatusRegistry::default());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.try_activate(WatcherKind::Log) })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
