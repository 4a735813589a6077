use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::workload::Workload;

pub(crate) const CLAIM_CAPACITY: &str = "3Gi";
const SINGLE_WRITER: &str = "ReadWriteOnce";

/// Builds the workspace claim for `workload`: fixed capacity, single-writer access.
pub(crate) fn assemble_claim(workload: &Workload) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(workload.claim_name.clone()),
            namespace: Some(workload.namespace.clone()),
            labels: Some(workload.labels.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![SINGLE_WRITER.to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(CLAIM_CAPACITY.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
