use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

use crate::error::SpannedErr;
use crate::kubernetes_objects::cluster::ClusterError;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Could not get or create storage claim '{0}': {1}")]
    StorageClaim(String, SpannedErr<ClusterError>),

    #[error("Could not watch job '{0}': {1}")]
    WatchJob(String, SpannedErr<ClusterError>),

    #[error("Could not create job '{0}': {1}")]
    CreateJob(String, SpannedErr<ClusterError>),

    #[error("there are [ {failed} ] failed pods")]
    JobFailed { failed: i32, span_trace: SpanTrace },

    #[error("Watch of job '{0}' ended before the job finished")]
    WatchEnded(String, SpanTrace),
}

impl ExtractSpanTrace for RunError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            RunError::StorageClaim(_, e) => e.span_trace(),
            RunError::WatchJob(_, e) => e.span_trace(),
            RunError::CreateJob(_, e) => e.span_trace(),
            RunError::JobFailed { span_trace, .. } => Some(span_trace),
            RunError::WatchEnded(_, span_trace) => Some(span_trace),
        }
    }
}
