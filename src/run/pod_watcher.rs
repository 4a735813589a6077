use std::collections::HashSet;

use k8s_openapi::api::core::v1::Pod;
use kube::api::WatchParams;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::config::render_label_selector;
use crate::error::{SpannedErr, SpannedExt, print_span_trace};
use crate::kubernetes_objects::cluster::{ClusterError, ClusterEvent, Subscription};

use super::status::WatcherKind;
use super::{RunContext, spawn_detached};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum PodState {
    #[default]
    Pending,
    Running,
    Deleted,
}

/// What the pod loop has to do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PodStep {
    Continue,
    StreamLogs(String),
    Stop,
}

/// Follows the pods of the job. The pod name is unknown up front, so pods are
/// matched by the workload's labels.
#[derive(Debug, Default)]
pub(crate) struct PodWatcher {
    state: PodState,
    streamed: HashSet<String>,
}

impl PodWatcher {
    pub(crate) fn state(&self) -> PodState {
        self.state
    }

    /// Records that the log of `pod_name` is being proxied; it is never asked for again.
    pub(crate) fn mark_streamed(&mut self, pod_name: &str) {
        self.streamed.insert(pod_name.to_string());
    }

    /// The log of `pod_name` could not be opened; the next Modified event asks again.
    pub(crate) fn forget_streamed(&mut self, pod_name: &str) {
        self.streamed.remove(pod_name);
    }

    pub(crate) fn on_event(&mut self, event: &ClusterEvent<Pod>) -> PodStep {
        match event {
            ClusterEvent::Added(pod) => {
                debug!("pod [ {} ] added, phase: [ {} ]", pod_name(pod), phase(pod));
                PodStep::Continue
            }
            ClusterEvent::Modified(pod) => {
                debug!("pod [ {} ] modified, phase: [ {} ]", pod_name(pod), phase(pod));
                self.state = PodState::Running;
                match pod.metadata.name.as_deref() {
                    None => {
                        warn!("modified pod has no name, cannot stream its logs");
                        PodStep::Continue
                    }
                    Some(name) if self.streamed.contains(name) => PodStep::Continue,
                    Some(name) => PodStep::StreamLogs(name.to_string()),
                }
            }
            ClusterEvent::Deleted(pod) => {
                debug!("pod [ {} ] deleted", pod_name(pod));
                self.state = PodState::Deleted;
                PodStep::Stop
            }
            ClusterEvent::Error(message) => {
                debug!("pod watch reported an error: {message}");
                PodStep::Continue
            }
            ClusterEvent::Unknown(what) => {
                debug!("received (unhandled) pod event: [ {what} ]");
                PodStep::Continue
            }
        }
    }
}

fn pod_name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or("<unknown>")
}

fn phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("<unknown>")
}

impl RunContext {
    /// Opens a pod watcher and runs it detached, unless one is already active.
    ///
    /// Failing to open the watch is logged and leaves the job loop unaffected.
    #[instrument("ensure_pod_watcher", skip(self), fields(job_name = %self.workload.name))]
    pub(super) async fn ensure_pod_watcher(&self) {
        if !self.registry.try_activate(WatcherKind::Pod) {
            debug!("pod is already being watched");
            return;
        }

        let params = WatchParams::default().labels(&render_label_selector(&self.workload.labels));
        match self.cluster.watch_pods(&params).await.with_span_trace() {
            Ok(events) => {
                debug!("pod watcher started");
                let pods = Subscription::new("pod", events);
                spawn_detached("pod watcher", self.clone().pod_events(pods));
            }
            Err(e) => {
                self.registry.deactivate(WatcherKind::Pod);
                error!("could not watch pods: {e}");
                print_span_trace(&e);
            }
        }
    }

    /// Handles pod events until the pod is deleted or the watch breaks.
    #[instrument("pod_events", skip_all, fields(job_name = %self.workload.name))]
    pub(super) async fn pod_events(
        self,
        mut pods: Subscription<Pod>,
    ) -> Result<(), SpannedErr<ClusterError>> {
        let mut watcher = PodWatcher::default();
        let (open_failures, mut failed_opens) = mpsc::unbounded_channel::<String>();

        let result = loop {
            let Some(item) = pods.next().await else {
                break Ok(());
            };
            let event = match item.with_span_trace() {
                Ok(event) => event,
                Err(e) => break Err(e),
            };

            while let Ok(pod_name) = failed_opens.try_recv() {
                watcher.forget_streamed(&pod_name);
            }

            debug!("received {} pod event", event.kind());
            match watcher.on_event(&event) {
                PodStep::Continue => {}
                PodStep::StreamLogs(pod_name) => {
                    if self.registry.try_activate(WatcherKind::Log) {
                        watcher.mark_streamed(&pod_name);
                        self.completion
                            .spawn(self.clone().stream_logs(pod_name, open_failures.clone()));
                    } else {
                        debug!("logs already being watched");
                    }
                }
                PodStep::Stop => pods.stop(),
            }
        };

        pods.stop();
        self.registry.deactivate(WatcherKind::Pod);
        debug!("pod watcher finished in state {:?}", watcher.state());
        result
    }
}
