use std::sync::Arc;

use self::cli::Cli;
use self::kubernetes_objects::cluster::KubeCluster;
use self::run::RunContext;
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use thiserror::Error;
use tracing::{info, instrument};
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub mod cli;
pub mod config;
pub mod error;
pub mod kubernetes_objects;
pub(crate) mod run;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Failed to read kubeconfig.\n{0}")]
    KubeconfigError(#[from] KubeconfigError),

    #[error("Failed to initialize kubernetes client.\n{0}")]
    KubeClientError(#[from] kube::Error),

    #[error("Build step stopped due to following error:\n{0}")]
    RunError(#[from] run::error::RunError),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            AppError::RunError(e) => e.span_trace(),
            _ => None,
        }
    }
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = config::Config::from_cli(cli, std::env::vars())?;

    info!("Config Loaded.");

    let client = kube_client(&config).await?;

    info!("Kubernetes Client Initialized.");

    let cluster = KubeCluster::new(client, &config.workload.namespace);
    let context = RunContext::new(config, Arc::new(cluster));
    context.run().await?;

    Ok(())
}

#[instrument("kube_client", skip(config), fields(kubeconfig = %config.kubeconfig.display()))]
async fn kube_client(config: &config::Config) -> Result<kube::Client, AppError> {
    if !config.kubeconfig.is_file() {
        info!("No kubeconfig found, falling back to the default client configuration.");
        return Ok(kube::Client::try_default().await?);
    }

    let kubeconfig = Kubeconfig::read_from(&config.kubeconfig)?;
    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(kube::Client::try_from(client_config)?)
}
