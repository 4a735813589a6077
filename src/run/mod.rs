pub mod error;
mod completion;
mod finalizer;
mod job_watcher;
mod lifecycle;
mod log_streamer;
mod pod_watcher;
mod status;
mod submit;

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use derive_debug::Dbg;
use tracing::{Instrument, error, info, instrument};

use crate::config::{CleanupPolicy, Config};
use crate::kubernetes_objects::cluster::Cluster;
use crate::kubernetes_objects::workload::Workload;

use self::completion::CompletionSynchronizer;
use self::error::RunError;
use self::lifecycle::get_or_create_storage_claim;
use self::status::{WatchStatusRegistry, WatcherKind};

/// Everything one build step shares between its job loop and the tasks it spawns.
#[derive(Clone, Dbg)]
pub(crate) struct RunContext {
    pub(crate) workload: Arc<Workload>,
    pub(crate) cleanup: CleanupPolicy,
    #[dbg(skip)]
    pub(crate) cluster: Arc<dyn Cluster>,
    pub(crate) registry: Arc<WatchStatusRegistry>,
    pub(crate) completion: CompletionSynchronizer,
}

impl RunContext {
    pub(crate) fn new(config: Config, cluster: Arc<dyn Cluster>) -> RunContext {
        RunContext {
            workload: Arc::new(config.workload),
            cleanup: config.cleanup,
            cluster,
            registry: Arc::new(WatchStatusRegistry::default()),
            completion: CompletionSynchronizer::default(),
        }
    }

    /// Submits the job, follows it to a terminal state and cleans up.
    ///
    /// Only the job's own outcome decides the result; pod and log problems are
    /// logged by the tasks that hit them.
    #[instrument(
        "build_step",
        skip(self),
        fields(
            kubernetes_namespace = %self.workload.namespace,
            job_name = %self.workload.name
        )
    )]
    pub(crate) async fn run(&self) -> Result<(), RunError> {
        info!("Starting job '{}'...", self.workload.name);

        get_or_create_storage_claim(self.cluster.as_ref(), &self.workload)
            .await
            .map_err(|e| RunError::StorageClaim(self.workload.claim_name.clone(), e))?;

        let mut jobs = self.watch_job().await?;

        if let Err(e) = self.submit_job().await {
            jobs.stop();
            self.registry.deactivate(WatcherKind::Job);
            return Err(e);
        }

        let result = self.job_events(&mut jobs).await;
        self.finalizer(result).await
    }
}

/// Runs `task` in the background. Its failure is logged, never returned.
fn spawn_detached<F, E>(name: &'static str, task: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(
        async move {
            if let Err(e) = task.await {
                error!("{name} stopped: {e}");
            }
        }
        .in_current_span(),
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    use k8s_openapi::api::batch::v1::Job;

    use crate::kubernetes_objects::cluster::ClusterEvent;
    use crate::kubernetes_objects::cluster::fake::{FakeCluster, job, pod};

    pub(crate) fn test_context(cluster: Arc<FakeCluster>) -> RunContext {
        RunContext {
            workload: Arc::new(Workload::for_tests("job-1")),
            cleanup: CleanupPolicy {
                delete_claim: false,
                grace_period: Duration::from_secs(2),
            },
            cluster,
            registry: Arc::new(WatchStatusRegistry::default()),
            completion: CompletionSynchronizer::default(),
        }
    }

    async fn run_with(
        events: Vec<ClusterEvent<Job>>,
    ) -> (Arc<FakeCluster>, RunContext, Result<(), RunError>) {
        let cluster = Arc::new(FakeCluster::default().with_job_events(events));
        let ctx = test_context(cluster.clone());
        let result = tokio::time::timeout(Duration::from_secs(5), ctx.run())
            .await
            .expect("run did not finish");
        (cluster, ctx, result)
    }

    #[tokio::test]
    async fn test_failed_job_fails_the_run() {
        let (cluster, ctx, result) = run_with(vec![
            ClusterEvent::Added(job(0, 0)),
            ClusterEvent::Modified(job(0, 0)),
            ClusterEvent::Modified(job(1, 0)),
        ])
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RunError::JobFailed { failed: 1, .. }));
        assert!(err.to_string().contains("[ 1 ]"));

        assert_eq!(FakeCluster::count(&cluster.job_watch_closes), 1);
        assert_eq!(FakeCluster::count(&cluster.pod_watches), 1);
        // a job failure leaves the running pod watcher alone
        assert_eq!(FakeCluster::count(&cluster.pod_watch_closes), 0);
        assert!(ctx.registry.is_active(WatcherKind::Pod));
        assert!(!ctx.registry.is_active(WatcherKind::Job));
        assert_eq!(FakeCluster::count(&cluster.job_deletes), 1);
    }

    #[tokio::test]
    async fn test_succeeded_job_without_pod_watcher() {
        let (cluster, _ctx, result) = run_with(vec![
            ClusterEvent::Added(job(0, 0)),
            ClusterEvent::Modified(job(0, 1)),
        ])
        .await;

        assert!(result.is_ok());
        assert_eq!(FakeCluster::count(&cluster.job_watches), 1);
        assert_eq!(FakeCluster::count(&cluster.job_creates), 1);
        assert_eq!(FakeCluster::count(&cluster.job_watch_closes), 1);
        assert_eq!(FakeCluster::count(&cluster.pod_watches), 0);
        assert_eq!(FakeCluster::count(&cluster.claim_creates), 1);
        assert_eq!(FakeCluster::count(&cluster.job_deletes), 1);
        assert_eq!(FakeCluster::count(&cluster.claim_deletes), 0);
    }

    #[tokio::test]
    async fn test_repeated_progress_opens_one_pod_watcher() {
        let (cluster, _ctx, result) = run_with(vec![
            ClusterEvent::Modified(job(0, 0)),
            ClusterEvent::Modified(job(0, 0)),
            ClusterEvent::Error("transient".to_string()),
            ClusterEvent::Modified(job(0, 0)),
            ClusterEvent::Modified(job(0, 1)),
        ])
        .await;

        assert!(result.is_ok());
        assert_eq!(FakeCluster::count(&cluster.pod_watches), 1);
    }

    #[tokio::test]
    async fn test_deleted_job_ends_the_run() {
        let (cluster, _ctx, result) = run_with(vec![
            ClusterEvent::Added(job(0, 0)),
            ClusterEvent::Deleted(job(0, 0)),
        ])
        .await;

        assert!(result.is_ok());
        assert_eq!(FakeCluster::count(&cluster.job_watch_closes), 1);
    }

    #[tokio::test]
    async fn test_pod_watch_failure_does_not_change_the_outcome() {
        let cluster = Arc::new(
            FakeCluster::default()
                .failing_pod_watch()
                .with_job_events(vec![
                    ClusterEvent::Modified(job(0, 0)),
                    ClusterEvent::Modified(job(0, 0)),
                    ClusterEvent::Modified(job(0, 1)),
                ]),
        );
        let ctx = test_context(cluster.clone());

        assert!(ctx.run().await.is_ok());
        assert_eq!(FakeCluster::count(&cluster.pod_watches), 2);
    }

    #[tokio::test]
    async fn test_job_create_failure_stops_the_watch() {
        let cluster = Arc::new(
            FakeCluster::default()
                .failing_job_create()
                .with_job_events(vec![ClusterEvent::Modified(job(0, 1))]),
        );
        let ctx = test_context(cluster.clone());

        let err = ctx.run().await.unwrap_err();

        assert!(matches!(err, RunError::CreateJob(name, _) if name == "job-1"));
        assert_eq!(FakeCluster::count(&cluster.job_watch_closes), 1);
        assert_eq!(FakeCluster::count(&cluster.job_deletes), 0);
        assert!(!ctx.registry.is_active(WatcherKind::Job));
    }

    #[tokio::test]
    async fn test_claim_is_deleted_when_configured() {
        let cluster = Arc::new(
            FakeCluster::default().with_job_events(vec![ClusterEvent::Modified(job(0, 1))]),
        );
        let mut ctx = test_context(cluster.clone());
        ctx.cleanup.delete_claim = true;

        assert!(ctx.run().await.is_ok());
        assert_eq!(FakeCluster::count(&cluster.claim_deletes), 1);
    }

    #[tokio::test]
    async fn test_run_waits_for_log_stream() {
        let cluster = Arc::new(
            FakeCluster::default()
                .with_job_events(vec![ClusterEvent::Modified(job(0, 0))])
                .with_pod_events(vec![ClusterEvent::Modified(pod("job-1-abcde"))])
                .with_log("job-1-abcde", "building...\ndone\n"),
        );
        let ctx = test_context(cluster.clone());

        let mut jobs = ctx.watch_job().await.unwrap();
        let first = jobs.next().await.unwrap().unwrap();
        assert!(matches!(first, ClusterEvent::Modified(_)));
        ctx.ensure_pod_watcher().await;

        while FakeCluster::count(&cluster.log_opens) == 0 {
            tokio::task::yield_now().await;
        }
        jobs.stop();
        ctx.finalizer(Ok(())).await.unwrap();

        assert_eq!(ctx.completion.outstanding(), 0);
        assert!(!ctx.registry.is_active(WatcherKind::Log));
        assert_eq!(FakeCluster::count(&cluster.job_deletes), 1);
    }
}
