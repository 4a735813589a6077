use futures::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::{debug, error, info, instrument, warn};

use crate::kubernetes_objects::cluster::{ClusterError, LogReader};

use super::RunContext;
use super::status::WatcherKind;

impl RunContext {
    /// Proxies the log of `pod_name` to stdout until the container closes it.
    ///
    /// Expects the log watcher kind to be claimed already and releases it when done.
    /// A pod whose log cannot be opened yet is handed back through `open_failures`.
    #[instrument("stream_logs", skip(self, open_failures))]
    pub(super) async fn stream_logs(
        self,
        pod_name: String,
        open_failures: UnboundedSender<String>,
    ) {
        let reader = match self.cluster.pod_logs(&pod_name).await {
            Ok(reader) => reader,
            Err(e) => {
                error!("could not stream the logs of pod [ {pod_name} ]: {e}");
                // hand the pod back before releasing the flag
                if open_failures.send(pod_name).is_err() {
                    debug!("pod watcher already finished");
                }
                self.registry.deactivate(WatcherKind::Log);
                return;
            }
        };

        info!("***** streaming the logs for pod [ {pod_name} ] *****");
        let mut stdout = tokio::io::stdout().compat_write();
        let copied = copy_logs(reader, &mut stdout).await;
        self.registry.deactivate(WatcherKind::Log);

        match copied {
            Ok(bytes) => debug!("bytes written: [ {bytes} ]"),
            Err(e) => warn!("log stream of pod [ {pod_name} ] broke off: {e}"),
        }
        info!("***** end of the logs for pod [ {pod_name} ] *****");
    }
}

/// Copies `reader` into `writer` until the reader is exhausted.
pub(crate) async fn copy_logs<W>(reader: LogReader, writer: &mut W) -> Result<u64, ClusterError>
where
    W: AsyncWrite + Unpin,
{
    let copied = futures::io::copy_buf(reader, writer).await?;
    writer.flush().await?;
    Ok(copied)
}
