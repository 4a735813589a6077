mod event;
#[cfg(test)]
pub(crate) mod fake;
mod subscription;

use std::pin::Pin;

use async_trait::async_trait;
use futures::io::AsyncBufRead;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::api::{DeleteParams, LogParams, PostParams, WatchParams};
use kube::{Api, Client};
use thiserror::Error;
use tracing::{Level, instrument};

use super::FIELD_MANAGER;

pub(crate) use self::event::ClusterEvent;
pub(crate) use self::subscription::Subscription;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Kubernetes client error: {0}")]
    KubeClient(#[from] kube::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) type EventStream<K> = BoxStream<'static, Result<ClusterEvent<K>, ClusterError>>;
pub(crate) type LogReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// The cluster API calls one run needs, scoped to a single namespace.
#[async_trait]
pub(crate) trait Cluster: Send + Sync + 'static {
    async fn get_claim(&self, name: &str) -> Result<PersistentVolumeClaim, ClusterError>;

    async fn create_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ClusterError>;

    async fn delete_claim(&self, name: &str, params: &DeleteParams) -> Result<(), ClusterError>;

    async fn create_job(&self, job: &Job) -> Result<Job, ClusterError>;

    async fn delete_job(&self, name: &str, params: &DeleteParams) -> Result<(), ClusterError>;

    async fn watch_jobs(&self, params: &WatchParams) -> Result<EventStream<Job>, ClusterError>;

    async fn watch_pods(&self, params: &WatchParams) -> Result<EventStream<Pod>, ClusterError>;

    /// Opens a following read of the pod's log; it ends when the container exits.
    async fn pod_logs(&self, pod_name: &str) -> Result<LogReader, ClusterError>;
}

/// [`Cluster`] backed by the Kubernetes API server.
#[derive(Clone)]
pub(crate) struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    pub(crate) fn new(client: Client, namespace: &str) -> Self {
        KubeCluster {
            client,
            namespace: namespace.to_string(),
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    #[instrument("cluster/get_claim", level = Level::TRACE, skip(self))]
    async fn get_claim(&self, name: &str) -> Result<PersistentVolumeClaim, ClusterError> {
        Ok(self.api::<PersistentVolumeClaim>().get(name).await?)
    }

    #[instrument("cluster/create_claim", level = Level::TRACE, skip_all)]
    async fn create_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ClusterError> {
        Ok(self
            .api::<PersistentVolumeClaim>()
            .create(&Self::post_params(), claim)
            .await?)
    }

    #[instrument("cluster/delete_claim", level = Level::TRACE, skip(self, params))]
    async fn delete_claim(&self, name: &str, params: &DeleteParams) -> Result<(), ClusterError> {
        self.api::<PersistentVolumeClaim>()
            .delete(name, params)
            .await?;
        Ok(())
    }

    #[instrument("cluster/create_job", level = Level::TRACE, skip_all)]
    async fn create_job(&self, job: &Job) -> Result<Job, ClusterError> {
        Ok(self.api::<Job>().create(&Self::post_params(), job).await?)
    }

    #[instrument("cluster/delete_job", level = Level::TRACE, skip(self, params))]
    async fn delete_job(&self, name: &str, params: &DeleteParams) -> Result<(), ClusterError> {
        self.api::<Job>().delete(name, params).await?;
        Ok(())
    }

    #[instrument("cluster/watch_jobs", level = Level::TRACE, skip_all)]
    async fn watch_jobs(&self, params: &WatchParams) -> Result<EventStream<Job>, ClusterError> {
        let events = self.api::<Job>().watch(params, "0").await?;
        Ok(events
            .map_ok(ClusterEvent::from)
            .map_err(ClusterError::from)
            .boxed())
    }

    #[instrument("cluster/watch_pods", level = Level::TRACE, skip_all)]
    async fn watch_pods(&self, params: &WatchParams) -> Result<EventStream<Pod>, ClusterError> {
        let events = self.api::<Pod>().watch(params, "0").await?;
        Ok(events
            .map_ok(ClusterEvent::from)
            .map_err(ClusterError::from)
            .boxed())
    }

    #[instrument("cluster/pod_logs", level = Level::TRACE, skip(self))]
    async fn pod_logs(&self, pod_name: &str) -> Result<LogReader, ClusterError> {
        let params = LogParams {
            follow: true,
            ..Default::default()
        };
        let reader = self.api::<Pod>().log_stream(pod_name, &params).await?;
        Ok(Box::pin(reader))
    }
}
