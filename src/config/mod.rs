mod env;
mod labels;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use duration_string::DurationString;
use thiserror::Error;
use tracing::debug;

use crate::cli::Cli;
use crate::kubernetes_objects::workload::Workload;

pub(crate) use self::env::forwarded_env;
pub(crate) use self::labels::{parse_label_selector, render_label_selector};

/// Environment prefixes forwarded into the job's container.
pub(crate) const FORWARDED_ENV_PREFIXES: [&str; 2] = ["PLUGIN_", "DRONE_"];

/// Label key used when no selector is configured; the value is the job name.
pub(crate) const RUN_LABEL: &str = "drone-kube-job/run";

const CLAIM_SUFFIX: &str = "workspace";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No workspace configured: set PLUGIN_JOB_WORKSPACE or DRONE_WORKSPACE")]
    WorkspaceMissing,

    #[error("Label '{0}' is not a 'key=value' pair")]
    MalformedLabel(String),

    #[error("Grace period '{0}' is not a duration: {1}")]
    MalformedGracePeriod(String, String),
}

/// What to remove once the job has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CleanupPolicy {
    pub(crate) delete_claim: bool,
    pub(crate) grace_period: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) workload: Workload,
    pub(crate) kubeconfig: PathBuf,
    pub(crate) cleanup: CleanupPolicy,
}

impl Config {
    pub fn from_cli(
        cli: Cli,
        process_env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::from_cli_at(cli, process_env, now)
    }

    fn from_cli_at(
        cli: Cli,
        process_env: impl IntoIterator<Item = (String, String)>,
        unix_secs: u64,
    ) -> Result<Self, ConfigError> {
        let workspace = cli
            .workspace
            .or(cli.drone_workspace)
            .filter(|w| !w.as_os_str().is_empty())
            .ok_or(ConfigError::WorkspaceMissing)?;

        let name = job_name(&cli.repo_name, &cli.build_number, unix_secs);
        let claim_name = claim_name(&cli.repo_name, &cli.build_number);

        let labels = match cli.label_selector.as_deref().map(str::trim) {
            Some(selector) if !selector.is_empty() => parse_label_selector(selector)?,
            _ => BTreeMap::from([(RUN_LABEL.to_string(), name.clone())]),
        };

        let command = cli.commands.filter(|c| !c.is_empty());

        let grace_period = cli
            .grace_period
            .parse::<DurationString>()
            .map(Duration::from)
            .map_err(|e| ConfigError::MalformedGracePeriod(cli.grace_period.clone(), e.to_string()))?;

        let kubeconfig = cli
            .kubeconfig
            .unwrap_or_else(|| workspace.join(".kube").join("config"));

        let workload = Workload {
            name,
            namespace: cli.namespace,
            image: cli.image,
            working_dir: workspace,
            command,
            env: forwarded_env(process_env, &FORWARDED_ENV_PREFIXES),
            labels,
            service_account: cli.service_account,
            claim_name,
        };
        debug!("workload: {:?}", workload);

        Ok(Config {
            workload,
            kubeconfig,
            cleanup: CleanupPolicy {
                delete_claim: cli.delete_claim,
                grace_period,
            },
        })
    }
}

/// `<repo>-<build>-<unix seconds>`, lowercased to be a valid object name.
fn job_name(repo: &str, build: &str, unix_secs: u64) -> String {
    format!("{repo}-{build}-{unix_secs}").to_lowercase()
}

fn claim_name(repo: &str, build: &str) -> String {
    format!("{repo}-{build}-{CLAIM_SUFFIX}").to_lowercase()
}
