use gn_types::{GnResult, JobDescriptor, MethodRegistry, QueueConfig, RawResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::ExecutionBackend;
use crate::broker::{connect_broker, TaskBroker, TaskHandler, TaskId};
use crate::execute::execute_job;

/// Submits each job to a task broker as a JSON payload and polls until
/// every task has finished.
///
/// There is no overall deadline and no cancellation: the poll loop runs
/// until the broker reports every task ready.
pub struct QueuedBackend {
    broker: Arc<dyn TaskBroker>,
    poll_interval: Duration,
}

/// Worker-side task body: decode a job, run it, encode the result.
pub fn job_handler(registry: Arc<MethodRegistry>) -> TaskHandler {
    Arc::new(move |payload: &[u8]| -> GnResult<Vec<u8>> {
        let job: JobDescriptor = serde_json::from_slice(payload)?;
        let result = execute_job(&job, &registry)?;
        Ok(serde_json::to_vec(&result)?)
    })
}

impl QueuedBackend {
    pub fn connect(config: &QueueConfig, registry: Arc<MethodRegistry>) -> GnResult<Self> {
        let broker = connect_broker(config, job_handler(registry))?;
        info!(
            "Connected to {} broker at {}",
            broker.name(),
            config.broker_url
        );
        Ok(Self::with_broker(broker, config.poll_interval()))
    }

    pub fn with_broker(broker: Arc<dyn TaskBroker>, poll_interval: Duration) -> Self {
        Self {
            broker,
            poll_interval,
        }
    }
}

impl ExecutionBackend for QueuedBackend {
    fn name(&self) -> &str {
        "queued"
    }

    fn execute(&self, jobs: Vec<JobDescriptor>) -> GnResult<Vec<RawResult>> {
        let total = jobs.len();
        let task_ids: Vec<TaskId> = jobs
            .iter()
            .map(|job| self.broker.submit(serde_json::to_vec(job)?))
            .collect::<GnResult<_>>()?;
        debug!("Submitted {} tasks to {} broker", total, self.broker.name());

        let mut ready = vec![false; total];
        loop {
            for (task_id, done) in task_ids.iter().zip(ready.iter_mut()) {
                if !*done {
                    *done = self.broker.is_ready(*task_id)?;
                }
            }
            let completed = ready.iter().filter(|done| **done).count();
            info!("Completed {} of {} folds.", completed, total);
            if completed == total {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }

        task_ids
            .iter()
            .map(|task_id| {
                let bytes = self.broker.fetch(*task_id)?;
                Ok(serde_json::from_slice::<RawResult>(&bytes)?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBroker;
    use crate::execute::test_support::{dataset, registry};
    use crate::jobs::build_jobs;
    use crate::SequentialBackend;
    use gn_types::{GnError, ParameterSet, PredictorSpec};

    fn fast_config() -> QueueConfig {
        QueueConfig {
            workers: 3,
            poll_interval_secs: 0,
            ..QueueConfig::default()
        }
    }

    #[test]
    fn queued_results_match_sequential() {
        let specs = vec![
            PredictorSpec::new("first_marker", ParameterSet::new()),
            PredictorSpec::new("first_marker", ParameterSet::new().with("gain", 3.0)),
        ];
        let data = dataset(40, 3, 4);

        let queued = QueuedBackend::connect(&fast_config(), registry()).unwrap();
        let mut remote = queued.execute(build_jobs(data.clone(), &specs, 4, 9)).unwrap();
        let mut local = SequentialBackend::new(registry())
            .execute(build_jobs(data, &specs, 4, 9))
            .unwrap();

        remote.sort_by_key(|r| r.id);
        local.sort_by_key(|r| r.id);
        assert_eq!(remote, local);
    }

    #[test]
    fn task_error_surfaces_when_fetched() {
        let specs = vec![PredictorSpec::new("broken", ParameterSet::new())];
        let queued = QueuedBackend::connect(&fast_config(), registry()).unwrap();
        let err = queued
            .execute(build_jobs(dataset(20, 2, 1), &specs, 2, 1))
            .unwrap_err();
        assert!(matches!(err, GnError::Backend(_)));
    }

    #[test]
    fn runs_against_an_injected_broker() {
        let broker = Arc::new(LocalBroker::start(&fast_config(), job_handler(registry())).unwrap());
        let backend = QueuedBackend::with_broker(broker, Duration::from_millis(1));
        let specs = vec![PredictorSpec::new("first_marker", ParameterSet::new())];
        let results = backend.execute(build_jobs(dataset(30, 2, 2), &specs, 3, 1)).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn unreachable_broker_fails_at_connect() {
        let config = QueueConfig {
            result_backend_url: "redis://localhost".to_string(),
            ..fast_config()
        };
        assert!(QueuedBackend::connect(&config, registry()).is_err());
    }
}
