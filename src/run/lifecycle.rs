use std::time::Duration;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{DeleteParams, PropagationPolicy};
use tracing::{debug, info, instrument, warn};

use crate::error::{SpannedErr, SpannedExt};
use crate::kubernetes_objects::cluster::{Cluster, ClusterError};
use crate::kubernetes_objects::render_manifest;
use crate::kubernetes_objects::storage_claim::{CLAIM_CAPACITY, assemble_claim};
use crate::kubernetes_objects::workload::Workload;

/// Returns the workload's storage claim, creating it if the lookup fails for any reason.
#[instrument(
    "get_or_create_storage_claim",
    skip_all,
    fields(claim_name = %workload.claim_name)
)]
pub(super) async fn get_or_create_storage_claim(
    cluster: &dyn Cluster,
    workload: &Workload,
) -> Result<PersistentVolumeClaim, SpannedErr<ClusterError>> {
    match cluster.get_claim(&workload.claim_name).await {
        Ok(claim) => {
            info!("Using existing PVC '{}'.", workload.claim_name);
            return Ok(claim);
        }
        Err(e) => warn!(
            "Error while getting the PVC '{}': {}",
            workload.claim_name, e
        ),
    }

    let claim = assemble_claim(workload);
    debug!("PVC manifest:\n{}", render_manifest(&claim));

    let created = cluster.create_claim(&claim).await.with_span_trace()?;
    info!(
        "Created PVC '{}' ({}).",
        workload.claim_name, CLAIM_CAPACITY
    );
    Ok(created)
}

#[instrument("delete_job", skip(cluster))]
pub(super) async fn delete_job(
    cluster: &dyn Cluster,
    name: &str,
    grace_period: Duration,
) -> Result<(), SpannedErr<ClusterError>> {
    cluster
        .delete_job(name, &delete_params(grace_period))
        .await
        .with_span_trace()?;
    info!("Deleted job '{name}'.");
    Ok(())
}

#[instrument("delete_storage_claim", skip(cluster))]
pub(super) async fn delete_storage_claim(
    cluster: &dyn Cluster,
    name: &str,
    grace_period: Duration,
) -> Result<(), SpannedErr<ClusterError>> {
    cluster
        .delete_claim(name, &delete_params(grace_period))
        .await
        .with_span_trace()?;
    info!("Deleted PVC '{name}'.");
    Ok(())
}

/// The job's pods go with it.
fn delete_params(grace_period: Duration) -> DeleteParams {
    DeleteParams {
        grace_period_seconds: Some(u32::try_from(grace_period.as_secs()).unwrap_or(u32::MAX)),
        propagation_policy: Some(PropagationPolicy::Background),
        ..Default::default()
    }
}
