//! Execution strategies for a batch of cross-validation jobs.

mod pooled;
mod queued;
mod sequential;

pub use pooled::PooledBackend;
pub use queued::QueuedBackend;
pub use sequential::SequentialBackend;

use gn_types::{
    config_error, GnError, GnResult, JobDescriptor, MethodRegistry, PipelineConfig, RawResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Runs a batch of jobs and returns their results in completion order.
///
/// Any job failure fails the whole batch; no partial results are returned.
pub trait ExecutionBackend: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, jobs: Vec<JobDescriptor>) -> GnResult<Vec<RawResult>>;
}

/// The available scheduling models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sequential,
    Pooled,
    Queued,
}

impl Backend {
    /// Instantiate the backend described by `config`.
    pub fn build(
        self,
        config: &PipelineConfig,
        registry: Arc<MethodRegistry>,
    ) -> GnResult<Box<dyn ExecutionBackend>> {
        Ok(match self {
            Backend::Sequential => Box::new(SequentialBackend::new(registry)),
            Backend::Pooled => Box::new(PooledBackend::new(
                config.cpu_cores,
                registry,
                config.show_progress,
            )?),
            Backend::Queued => Box::new(QueuedBackend::connect(&config.queue, registry)?),
        })
    }

    /// Parse `config.backend` and build it.
    pub fn from_config(
        config: &PipelineConfig,
        registry: Arc<MethodRegistry>,
    ) -> GnResult<Box<dyn ExecutionBackend>> {
        config.backend.parse::<Backend>()?.build(config, registry)
    }
}

impl FromStr for Backend {
    type Err = GnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "single-core" => Ok(Backend::Sequential),
            "pooled" | "joblib" => Ok(Backend::Pooled),
            "queued" | "celery" => Ok(Backend::Queued),
            _ => Err(config_error!("Unsupported processing backend: {s}")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Sequential => "sequential",
            Backend::Pooled => "pooled",
            Backend::Queued => "queued",
        };
        f.write_str(name)
    }
}
