use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use k8s_openapi::api::batch::v1::{Job, JobStatus};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, WatchParams};
use parking_lot::Mutex;

use super::{Cluster, ClusterError, ClusterEvent, EventStream, LogReader};

/// Counts how often a scripted stream has been dropped, i.e. its watch closed.
struct DropProbe(Arc<AtomicUsize>);

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripted events followed by a stream that never ends, so a loop over it
/// only finishes when the subscription is stopped.
fn scripted<K: Send + 'static>(
    events: Vec<ClusterEvent<K>>,
    drops: Arc<AtomicUsize>,
) -> EventStream<K> {
    let probe = DropProbe(drops);
    stream::iter(events.into_iter().map(Ok))
        .chain(stream::pending())
        .map(move |event| {
            let _probe = &probe;
            event
        })
        .boxed()
}

fn unavailable(what: &str) -> ClusterError {
    ClusterError::Io(std::io::Error::other(format!("{what} unavailable")))
}

#[derive(Default)]
pub(crate) struct FakeCluster {
    claims: Mutex<BTreeMap<String, PersistentVolumeClaim>>,
    job_events: Mutex<Vec<ClusterEvent<Job>>>,
    pod_events: Mutex<Vec<ClusterEvent<Pod>>>,
    logs: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_job_create: bool,
    fail_pod_watch: bool,
    log_open_failures: AtomicUsize,

    pub(crate) claim_creates: AtomicUsize,
    pub(crate) claim_deletes: AtomicUsize,
    pub(crate) job_creates: AtomicUsize,
    pub(crate) job_deletes: AtomicUsize,
    pub(crate) job_watches: AtomicUsize,
    pub(crate) pod_watches: AtomicUsize,
    pub(crate) log_opens: AtomicUsize,
    pub(crate) job_watch_closes: Arc<AtomicUsize>,
    pub(crate) pod_watch_closes: Arc<AtomicUsize>,
}

impl FakeCluster {
    pub(crate) fn with_job_events(self, events: Vec<ClusterEvent<Job>>) -> Self {
        *self.job_events.lock() = events;
        self
    }

    pub(crate) fn with_pod_events(self, events: Vec<ClusterEvent<Pod>>) -> Self {
        *self.pod_events.lock() = events;
        self
    }

    pub(crate) fn with_claim(self, claim: PersistentVolumeClaim) -> Self {
        let name = claim.metadata.name.clone().unwrap_or_default();
        self.claims.lock().insert(name, claim);
        self
    }

    pub(crate) fn with_log(self, pod_name: &str, log: &str) -> Self {
        self.logs
            .lock()
            .insert(pod_name.to_string(), log.as_bytes().to_vec());
        self
    }

    pub(crate) fn failing_job_create(mut self) -> Self {
        self.fail_job_create = true;
        self
    }

    pub(crate) fn failing_pod_watch(mut self) -> Self {
        self.fail_pod_watch = true;
        self
    }

    /// The first `times` log opens fail like a container that is still being created.
    pub(crate) fn failing_log_opens(self, times: usize) -> Self {
        self.log_open_failures.store(times, Ordering::SeqCst);
        self
    }

    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn get_claim(&self, name: &str) -> Result<PersistentVolumeClaim, ClusterError> {
        self.claims
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| unavailable(name))
    }

    async fn create_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ClusterError> {
        self.claim_creates.fetch_add(1, Ordering::SeqCst);
        let name = claim.metadata.name.clone().unwrap_or_default();
        self.claims.lock().insert(name, claim.clone());
        Ok(claim.clone())
    }

    async fn delete_claim(&self, name: &str, _params: &DeleteParams) -> Result<(), ClusterError> {
        self.claim_deletes.fetch_add(1, Ordering::SeqCst);
        self.claims
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| unavailable(name))
    }

    async fn create_job(&self, job: &Job) -> Result<Job, ClusterError> {
        self.job_creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_job_create {
            return Err(unavailable("job"));
        }
        Ok(job.clone())
    }

    async fn delete_job(&self, _name: &str, _params: &DeleteParams) -> Result<(), ClusterError> {
        self.job_deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn watch_jobs(&self, _params: &WatchParams) -> Result<EventStream<Job>, ClusterError> {
        self.job_watches.fetch_add(1, Ordering::SeqCst);
        let events = std::mem::take(&mut *self.job_events.lock());
        Ok(scripted(events, self.job_watch_closes.clone()))
    }

    async fn watch_pods(&self, _params: &WatchParams) -> Result<EventStream<Pod>, ClusterError> {
        self.pod_watches.fetch_add(1, Ordering::SeqCst);
        if self.fail_pod_watch {
            return Err(unavailable("pod watch"));
        }
        let events = std::mem::take(&mut *self.pod_events.lock());
        Ok(scripted(events, self.pod_watch_closes.clone()))
    }

    async fn pod_logs(&self, pod_name: &str) -> Result<LogReader, ClusterError> {
        self.log_opens.fetch_add(1, Ordering::SeqCst);
        let still_creating = self
            .log_open_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if still_creating {
            return Err(ClusterError::Io(std::io::Error::other(format!(
                "container in pod {pod_name} is waiting to start: ContainerCreating"
            ))));
        }
        let log = self
            .logs
            .lock()
            .get(pod_name)
            .cloned()
            .ok_or_else(|| unavailable(pod_name))?;
        Ok(Box::pin(futures::io::Cursor::new(log)))
    }
}

pub(crate) fn job(failed: i32, succeeded: i32) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some("job-1".to_string()),
            ..Default::default()
        },
        status: Some(JobStatus {
            failed: Some(failed),
            succeeded: Some(succeeded),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn pod(name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}
