pub(crate) mod cluster;
pub(crate) mod job;
pub(crate) mod storage_claim;
pub mod workload;

use serde::Serialize;

pub(crate) const FIELD_MANAGER: &str = "drone-kube-job";

/// Renders a manifest as YAML for debug logging.
pub(crate) fn render_manifest<T: Serialize>(manifest: &T) -> String {
    serde_yaml::to_string(manifest).unwrap_or_else(|e| format!("<unrenderable manifest: {e}>"))
}
