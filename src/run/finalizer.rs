use tracing::{debug, error, info, instrument};

use crate::error::print_span_trace;

use super::RunContext;
use super::error::RunError;
use super::lifecycle::{delete_job, delete_storage_claim};
use super::status::WatcherKind;

impl RunContext {
    /// Waits for outstanding log streams, then removes the job (and the claim, if
    /// configured). Cleanup failures are logged; `result` is returned unchanged.
    #[instrument("finalizer", skip(self, result), fields(job_name = %self.workload.name))]
    pub(super) async fn finalizer(
        &self,
        result: Result<(), RunError>,
    ) -> Result<(), RunError> {
        let outstanding = self.completion.outstanding();
        if outstanding > 0 {
            info!("Waiting for {outstanding} log stream(s) to finish...");
        }
        self.completion.drain().await;

        if self.registry.is_active(WatcherKind::Pod) {
            debug!("pod watcher still running, it ends with the job's pods");
        }

        let grace_period = self.cleanup.grace_period;
        if let Err(e) = delete_job(self.cluster.as_ref(), &self.workload.name, grace_period).await {
            error!("Failed to delete job '{}': {}", self.workload.name, e);
            print_span_trace(&e);
        }

        if self.cleanup.delete_claim {
            if let Err(e) =
                delete_storage_claim(self.cluster.as_ref(), &self.workload.claim_name, grace_period)
                    .await
            {
                error!("Failed to delete PVC '{}': {}", self.workload.claim_name, e);
                print_span_trace(&e);
            }
        }

        result
    }
}
