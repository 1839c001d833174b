use gn_types::{GnResult, JobDescriptor, MethodRegistry, RawResult};
use std::sync::Arc;
use tracing::debug;

use super::ExecutionBackend;
use crate::execute::execute_job;

/// Runs jobs one after another on the calling thread, in submission order.
#[derive(Debug, Clone)]
pub struct SequentialBackend {
    registry: Arc<MethodRegistry>,
}

impl SequentialBackend {
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self { registry }
    }
}

impl ExecutionBackend for SequentialBackend {
    fn name(&self) -> &str {
        "sequential"
    }

    fn execute(&self, jobs: Vec<JobDescriptor>) -> GnResult<Vec<RawResult>> {
        debug!("Running {} jobs sequentially", jobs.len());
        jobs.iter()
            .map(|job| execute_job(job, &self.registry))
            .collect()
    }
}
