use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::workload::Workload;

const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";
const RESTART_NEVER: &str = "Never";

/// Builds the Job manifest for `workload`: one unprivileged container that never
/// restarts, with the workspace claim mounted at its working directory.
pub(crate) fn assemble_job(workload: &Workload) -> Job {
    let working_dir = workload.working_dir.to_string_lossy().into_owned();

    let (command, args) = match &workload.command {
        Some(command) => (
            Some(vec!["sh".to_string(), "-c".to_string()]),
            Some(vec![command.clone()]),
        ),
        None => (None, None),
    };

    let container = Container {
        name: workload.name.clone(),
        image: Some(workload.image.clone()),
        working_dir: Some(working_dir.clone()),
        command,
        args,
        security_context: Some(SecurityContext {
            privileged: Some(false),
            ..Default::default()
        }),
        image_pull_policy: Some(PULL_IF_NOT_PRESENT.to_string()),
        env: Some(env_vars(workload)),
        volume_mounts: Some(vec![VolumeMount {
            name: workload.name.clone(),
            mount_path: working_dir,
            ..Default::default()
        }]),
        ..Default::default()
    };

    let metadata = ObjectMeta {
        name: Some(workload.name.clone()),
        labels: Some(workload.labels.clone()),
        ..Default::default()
    };

    Job {
        metadata: ObjectMeta {
            namespace: Some(workload.namespace.clone()),
            ..metadata.clone()
        },
        spec: Some(JobSpec {
            template: PodTemplateSpec {
                metadata: Some(metadata),
                spec: Some(PodSpec {
                    service_account_name: Some(workload.service_account.clone()),
                    containers: vec![container],
                    restart_policy: Some(RESTART_NEVER.to_string()),
                    volumes: Some(vec![Volume {
                        name: workload.name.clone(),
                        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                            claim_name: workload.claim_name.clone(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn env_vars(workload: &Workload) -> Vec<EnvVar> {
    workload
        .env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        })
        .collect()
}
