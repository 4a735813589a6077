use std::collections::BTreeMap;
use std::path::PathBuf;

/// Declarative description of the single task one build step runs remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Job name; also names the container and the volume
    pub(crate) name: String,

    pub(crate) namespace: String,

    pub(crate) image: String,

    /// Working directory of the container and mount path of the claim
    pub(crate) working_dir: PathBuf,

    /// Shell command replacing the image entrypoint
    pub(crate) command: Option<String>,

    /// Forwarded environment, already filtered by prefix
    pub(crate) env: BTreeMap<String, String>,

    /// Labels put on the job, its pods and the claim
    pub(crate) labels: BTreeMap<String, String>,

    pub(crate) service_account: String,

    /// Storage claim backing the working directory
    pub(crate) claim_name: String,
}

#[cfg(test)]
impl Workload {
    pub(crate) fn for_tests(name: &str) -> Workload {
        Workload {
            name: name.to_string(),
            namespace: "ci".to_string(),
            image: "alpine:3".to_string(),
            working_dir: PathBuf::from("/drone/src"),
            command: None,
            env: BTreeMap::from([("PLUGIN_A".to_string(), "x".to_string())]),
            labels: BTreeMap::from([("drone-kube-job/run".to_string(), name.to_string())]),
            service_account: "builder".to_string(),
            claim_name: format!("{name}-workspace"),
        }
    }
}
