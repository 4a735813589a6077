use clap::Parser;
use std::path::PathBuf;

/// Runs one CI build step as a Kubernetes Job and proxies its logs.
#[derive(Debug, Parser)]
#[clap(name = "drone-kube-job", version)]
pub struct Cli {
    /// Namespace the job, its pods and the workspace claim live in
    #[clap(long, env = "PLUGIN_JOB_NAMESPACE", default_value = "default")]
    pub(crate) namespace: String,

    /// Image to run on the cluster
    #[clap(long, env = "PLUGIN_ORIGINAL_IMAGE")]
    pub(crate) image: String,

    /// Service account the job's pod runs as
    #[clap(long, env = "PLUGIN_PROXY_SERVICE_ACCOUNT", default_value = "default")]
    pub(crate) service_account: String,

    /// Working directory of the container, backed by the workspace claim
    #[clap(long, env = "PLUGIN_JOB_WORKSPACE")]
    pub(crate) workspace: Option<PathBuf>,

    #[clap(long, env = "DRONE_WORKSPACE", hide = true)]
    pub(crate) drone_workspace: Option<PathBuf>,

    /// Labels correlating the job, its pods and the claim, as `key=value[,key=value]`
    #[clap(long, env = "PLUGIN_JOB_LABEL_SELECTOR")]
    pub(crate) label_selector: Option<String>,

    /// Shell command replacing the image entrypoint
    #[clap(long, env = "PLUGIN_ORIGINAL_COMMANDS")]
    pub(crate) commands: Option<String>,

    #[clap(long, env = "DRONE_REPO_NAME")]
    pub(crate) repo_name: String,

    #[clap(long, env = "DRONE_BUILD_NUMBER")]
    pub(crate) build_number: String,

    /// Kubeconfig to use instead of `<workspace>/.kube/config`
    #[clap(long, env = "PLUGIN_KUBECONFIG")]
    pub(crate) kubeconfig: Option<PathBuf>,

    /// Also delete the workspace claim once the job is done
    #[clap(long, env = "PLUGIN_DELETE_WORKSPACE_CLAIM")]
    pub(crate) delete_claim: bool,

    /// Grace period for deleting the job and the claim
    #[clap(long, env = "PLUGIN_DELETE_GRACE_PERIOD", default_value = "2s")]
    pub(crate) grace_period: String,
}
