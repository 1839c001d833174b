pub mod aggregate;
pub mod backend;
pub mod broker;
pub mod execute;
pub mod jobs;
pub mod runner;

pub use aggregate::group_accuracies;
pub use backend::{Backend, ExecutionBackend, PooledBackend, QueuedBackend, SequentialBackend};
pub use broker::{connect_broker, LocalBroker, TaskBroker, TaskHandler, TaskId};
pub use execute::{execute_job, pearson_correlation};
pub use jobs::build_jobs;
pub use runner::run_predictors;
