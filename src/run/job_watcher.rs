use k8s_openapi::api::batch::v1::Job;
use kube::api::WatchParams;
use tracing::{debug, info, instrument, warn};
use tracing_error::SpanTrace;

use crate::config::render_label_selector;
use crate::error::SpannedExt;
use crate::kubernetes_objects::cluster::{ClusterEvent, Subscription};

use super::RunContext;
use super::error::RunError;
use super::status::WatcherKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    /// Watch opened, no progress reported yet
    Pending,
    Running,
    Succeeded,
    Failed(i32),
    Deleted,
}

/// What the job loop has to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobStep {
    Continue,
    EnsurePodWatcher,
    Stop,
}

#[derive(Debug)]
pub(crate) struct JobWatcher {
    job_name: String,
    state: JobState,
}

impl JobWatcher {
    pub(crate) fn new(job_name: &str) -> Self {
        JobWatcher {
            job_name: job_name.to_string(),
            state: JobState::Pending,
        }
    }

    pub(crate) fn state(&self) -> JobState {
        self.state
    }

    pub(crate) fn on_event(&mut self, event: &ClusterEvent<Job>) -> JobStep {
        match event {
            ClusterEvent::Added(job) => {
                debug!(
                    "job added; name: [ {} ], status: [ {} ]",
                    object_name(job),
                    status_json(job)
                );
                JobStep::Continue
            }
            ClusterEvent::Modified(job) => {
                debug!("job modified, status: {}", status_json(job));
                let status = job.status.as_ref();
                let failed = status.and_then(|s| s.failed).unwrap_or(0);
                let succeeded = status.and_then(|s| s.succeeded).unwrap_or(0);

                if failed > 0 {
                    self.state = JobState::Failed(failed);
                    JobStep::Stop
                } else if succeeded > 0 {
                    self.state = JobState::Succeeded;
                    JobStep::Stop
                } else {
                    self.state = JobState::Running;
                    JobStep::EnsurePodWatcher
                }
            }
            ClusterEvent::Deleted(job) => {
                debug!("job deleted; name: [ {} ]", object_name(job));
                self.state = JobState::Deleted;
                JobStep::Stop
            }
            ClusterEvent::Error(message) => {
                warn!("job watch reported an error: {message}");
                JobStep::Continue
            }
            ClusterEvent::Unknown(what) => {
                debug!("received (unhandled) job event: [ {what} ]");
                JobStep::Continue
            }
        }
    }

    /// The run's result once the job loop has ended.
    pub(crate) fn outcome(&self) -> Result<(), RunError> {
        match self.state {
            JobState::Succeeded => {
                info!("Job '{}' succeeded.", self.job_name);
                Ok(())
            }
            JobState::Deleted => {
                warn!("Job '{}' was deleted before it finished.", self.job_name);
                Ok(())
            }
            JobState::Failed(failed) => Err(RunError::JobFailed {
                failed,
                span_trace: SpanTrace::capture(),
            }),
            JobState::Pending | JobState::Running => Err(RunError::WatchEnded(
                self.job_name.clone(),
                SpanTrace::capture(),
            )),
        }
    }
}

fn object_name(job: &Job) -> &str {
    job.metadata.name.as_deref().unwrap_or("<unknown>")
}

fn status_json(job: &Job) -> String {
    serde_json::to_string(&job.status).unwrap_or_default()
}

impl RunContext {
    /// Opens the subscription for the submitted job, before the job is created.
    #[instrument("watch_job", skip(self), fields(job_name = %self.workload.name))]
    pub(super) async fn watch_job(&self) -> Result<Subscription<Job>, RunError> {
        let activated = self.registry.try_activate(WatcherKind::Job);
        debug_assert!(activated, "job watcher opened twice");

        let params = WatchParams::default()
            .labels(&render_label_selector(&self.workload.labels))
            .fields(&format!("metadata.name={}", self.workload.name));

        match self.cluster.watch_jobs(&params).await.with_span_trace() {
            Ok(events) => {
                debug!("job watcher started");
                Ok(Subscription::new("job", events))
            }
            Err(e) => {
                self.registry.deactivate(WatcherKind::Job);
                Err(RunError::WatchJob(self.workload.name.clone(), e))
            }
        }
    }

    /// Handles job events in arrival order until a terminal event stops the subscription.
    #[instrument("job_events", skip_all, fields(job_name = %self.workload.name))]
    pub(super) async fn job_events(&self, jobs: &mut Subscription<Job>) -> Result<(), RunError> {
        let mut watcher = JobWatcher::new(&self.workload.name);

        while let Some(item) = jobs.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    warn!("job watch delivered an unreadable event: {e}");
                    continue;
                }
            };

            debug!("received {} job event", event.kind());
            match watcher.on_event(&event) {
                JobStep::Continue => {}
                JobStep::EnsurePodWatcher => self.ensure_pod_watcher().await,
                JobStep::Stop => jobs.stop(),
            }
        }

        self.registry.deactivate(WatcherKind::Job);
        debug!("job watcher finished in state {:?}", watcher.state());
        watcher.outcome()
    }
}
