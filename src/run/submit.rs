use k8s_openapi::api::batch::v1::Job;
use tracing::{debug, info, instrument};

use crate::error::SpannedExt;
use crate::kubernetes_objects::job::assemble_job;
use crate::kubernetes_objects::render_manifest;

use super::RunContext;
use super::error::RunError;

impl RunContext {
    #[instrument("submit_job", skip(self), fields(job_name = %self.workload.name))]
    pub(super) async fn submit_job(&self) -> Result<Job, RunError> {
        let job = assemble_job(&self.workload);
        debug!("Job manifest:\n{}", render_manifest(&job));

        let created = self
            .cluster
            .create_job(&job)
            .await
            .with_span_trace()
            .map_err(|e| RunError::CreateJob(self.workload.name.clone(), e))?;

        info!(
            "Created job '{}'.",
            created.metadata.name.as_deref().unwrap_or("<unknown>")
        );
        Ok(created)
    }
}
