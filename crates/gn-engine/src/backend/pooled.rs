use gn_types::{BackendError, GnResult, JobDescriptor, MethodRegistry, RawResult};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::info;

use super::ExecutionBackend;
use crate::execute::execute_job;

/// Fans jobs out over a fixed-size rayon pool and joins on all of them.
pub struct PooledBackend {
    pool: ThreadPool,
    registry: Arc<MethodRegistry>,
    show_progress: bool,
}

impl PooledBackend {
    pub fn new(
        cpu_cores: usize,
        registry: Arc<MethodRegistry>,
        show_progress: bool,
    ) -> GnResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(cpu_cores.max(1))
            .thread_name(|index| format!("gn-pool-{index}"))
            .build()
            .map_err(|e| BackendError::PoolBuildFailed {
                message: e.to_string(),
            })?;
        Ok(Self {
            pool,
            registry,
            show_progress,
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} folds ({eta})")
        {
            bar.set_style(style);
        }
        bar
    }
}

impl ExecutionBackend for PooledBackend {
    fn name(&self) -> &str {
        "pooled"
    }

    fn execute(&self, jobs: Vec<JobDescriptor>) -> GnResult<Vec<RawResult>> {
        info!(
            "Running {} jobs on {} worker threads",
            jobs.len(),
            self.num_threads()
        );
        let progress = self.progress_bar(jobs.len());
        let registry = &self.registry;

        let results = self.pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let result = execute_job(job, registry);
                    progress.inc(1);
                    result
                })
                .collect::<GnResult<Vec<RawResult>>>()
        });

        progress.finish_and_clear();
        results
    }
}
