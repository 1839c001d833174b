//! Task broker abstraction for the queued backend.
//!
//! A broker accepts opaque payloads, runs them on its workers and hands back
//! opaque results. Delivery is at-least-once: a worker acknowledges a task
//! only after the handler returns, so a task whose worker dies, or that
//! stays unacknowledged past the visibility timeout, is delivered again.
//! Handlers must therefore be safe to re-run. The first completion wins.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use gn_types::{internal_error, BackendError, GnResult, QueueConfig};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Runs one task payload to a result payload.
pub type TaskHandler = Arc<dyn Fn(&[u8]) -> GnResult<Vec<u8>> + Send + Sync>;

/// Submission and result retrieval against a task queue.
pub trait TaskBroker: Send + Sync {
    fn name(&self) -> &str;

    /// Enqueue a payload as an independent task.
    fn submit(&self, payload: Vec<u8>) -> GnResult<TaskId>;

    /// Whether the task has finished, successfully or not.
    fn is_ready(&self, task_id: TaskId) -> GnResult<bool>;

    /// Take the task's result. A task that failed surfaces its error here.
    fn fetch(&self, task_id: TaskId) -> GnResult<Vec<u8>>;
}

/// Connect to the broker named by `config.broker_url`.
///
/// Only the in-process `local://` broker is compiled in; any other address
/// fails here, when the queued backend is actually selected.
pub fn connect_broker(config: &QueueConfig, handler: TaskHandler) -> GnResult<Arc<dyn TaskBroker>> {
    for url in [&config.broker_url, &config.result_backend_url] {
        let scheme = url.split("://").next().unwrap_or_default();
        if scheme != "local" {
            return Err(BackendError::BrokerUnavailable {
                url: url.clone(),
                reason: format!("no client for scheme '{scheme}' is available"),
            }
            .into());
        }
    }
    Ok(Arc::new(LocalBroker::start(config, handler)?))
}

#[derive(Debug, Clone)]
enum TaskState {
    Pending,
    Running { delivered_at: Instant },
    Succeeded { result: Vec<u8>, finished_at: Instant },
    Failed { message: String },
}

impl TaskState {
    fn is_finished(&self) -> bool {
        matches!(self, TaskState::Succeeded { .. } | TaskState::Failed { .. })
    }
}

#[derive(Debug)]
struct TaskRecord {
    payload: Arc<Vec<u8>>,
    state: TaskState,
    deliveries: u32,
    crashes: u32,
}

struct Shared {
    tasks: DashMap<TaskId, TaskRecord>,
    queue: Sender<TaskId>,
    handler: TaskHandler,
    max_deliveries: u32,
    shutdown: AtomicBool,
}

impl Shared {
    /// Put a task back on the queue after its worker crashed. Only crashes
    /// count toward `max_deliveries`.
    fn redeliver_crashed(&self, task_id: TaskId) {
        let reason = "worker crashed before acknowledging";
        if let Some(mut record) = self.tasks.get_mut(&task_id) {
            if record.state.is_finished() {
                return;
            }
            record.crashes += 1;
            if record.crashes >= self.max_deliveries {
                warn!("Task {} failed after {} crashes", task_id, record.crashes);
                record.state = TaskState::Failed {
                    message: format!("{reason} after {} deliveries", record.deliveries),
                };
                return;
            }
            warn!("Redelivering task {}: {}", task_id, reason);
            record.state = TaskState::Pending;
        }
        // A closed queue means the broker is shutting down.
        let _ = self.queue.send(task_id);
    }

    /// Re-queue a task whose delivery outlived the visibility timeout. The
    /// original delivery keeps running; whichever finishes first wins.
    fn redeliver_overdue(&self, task_id: TaskId) {
        if let Some(mut record) = self.tasks.get_mut(&task_id) {
            if record.state.is_finished() {
                return;
            }
            debug!(
                "Redelivering task {}: visibility timeout elapsed after {} deliveries",
                task_id, record.deliveries
            );
            record.state = TaskState::Pending;
        }
        let _ = self.queue.send(task_id);
    }

    fn run_one(&self, task_id: TaskId) {
        let payload = match self.tasks.get_mut(&task_id) {
            Some(mut record) if !record.state.is_finished() => {
                record.deliveries += 1;
                record.state = TaskState::Running {
                    delivered_at: Instant::now(),
                };
                Arc::clone(&record.payload)
            }
            _ => return,
        };

        let handler = Arc::clone(&self.handler);
        match catch_unwind(AssertUnwindSafe(|| handler(payload.as_slice()))) {
            Ok(outcome) => {
                if let Some(mut record) = self.tasks.get_mut(&task_id) {
                    if record.state.is_finished() {
                        debug!("Task {} already completed by another delivery", task_id);
                        return;
                    }
                    record.state = match outcome {
                        Ok(result) => TaskState::Succeeded {
                            result,
                            finished_at: Instant::now(),
                        },
                        Err(e) => TaskState::Failed {
                            message: e.to_string(),
                        },
                    };
                }
            }
            Err(_) => self.redeliver_crashed(task_id),
        }
    }

    fn worker_loop(&self, queue: Receiver<TaskId>) {
        while !self.shutdown.load(Ordering::Acquire) {
            match queue.recv_timeout(Duration::from_millis(100)) {
                Ok(task_id) => self.run_one(task_id),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

/// In-process broker served by a fixed set of worker threads.
///
/// Each worker takes one task at a time from a shared channel.
pub struct LocalBroker {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    visibility_timeout: Duration,
    result_expiry: Duration,
}

impl LocalBroker {
    pub fn start(config: &QueueConfig, handler: TaskHandler) -> GnResult<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared {
            tasks: DashMap::new(),
            queue: sender,
            handler,
            max_deliveries: config.max_deliveries.max(1),
            shutdown: AtomicBool::new(false),
        });

        let worker_count = config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker_shared = Arc::clone(&shared);
            let receiver = receiver.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("gn-broker-{index}"))
                .spawn(move || worker_shared.worker_loop(receiver));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shared.shutdown.store(true, Ordering::Release);
                    return Err(BackendError::BrokerUnavailable {
                        url: config.broker_url.clone(),
                        reason: format!("failed to spawn worker: {e}"),
                    }
                    .into());
                }
            }
        }
        info!("Local broker started with {} workers", worker_count);

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            visibility_timeout: config.visibility_timeout(),
            result_expiry: config.result_expiry(),
        })
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared
            .tasks
            .iter()
            .filter(|entry| !entry.state.is_finished())
            .count()
    }

    fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        for handle in self.workers.lock().drain(..) {
            if handle.join().is_err() {
                warn!("Broker worker exited with a panic");
            }
        }
    }
}

impl TaskBroker for LocalBroker {
    fn name(&self) -> &str {
        "local"
    }

    fn submit(&self, payload: Vec<u8>) -> GnResult<TaskId> {
        let task_id = Uuid::new_v4();
        self.shared.tasks.insert(
            task_id,
            TaskRecord {
                payload: Arc::new(payload),
                state: TaskState::Pending,
                deliveries: 0,
                crashes: 0,
            },
        );
        self.shared
            .queue
            .send(task_id)
            .map_err(|_| internal_error!("local broker queue is closed"))?;
        Ok(task_id)
    }

    fn is_ready(&self, task_id: TaskId) -> GnResult<bool> {
        let overdue = {
            let record = self
                .shared
                .tasks
                .get(&task_id)
                .ok_or_else(|| BackendError::UnknownTask {
                    task_id: task_id.to_string(),
                })?;
            match record.state {
                TaskState::Running { delivered_at } => {
                    delivered_at.elapsed() >= self.visibility_timeout
                }
                ref state => return Ok(state.is_finished()),
            }
        };
        if overdue {
            self.shared.redeliver_overdue(task_id);
        }
        Ok(self
            .shared
            .tasks
            .get(&task_id)
            .map(|record| record.state.is_finished())
            .unwrap_or(false))
    }

    fn fetch(&self, task_id: TaskId) -> GnResult<Vec<u8>> {
        let unknown = || BackendError::UnknownTask {
            task_id: task_id.to_string(),
        };
        let finished = self
            .shared
            .tasks
            .get(&task_id)
            .map(|record| record.state.is_finished())
            .ok_or_else(unknown)?;
        if !finished {
            return Err(internal_error!("task {} is not finished", task_id));
        }

        // Finished records are never touched by workers again.
        let (_, record) = self.shared.tasks.remove(&task_id).ok_or_else(unknown)?;
        match record.state {
            TaskState::Succeeded {
                result,
                finished_at,
            } => {
                if finished_at.elapsed() >= self.result_expiry {
                    return Err(BackendError::TaskExpired {
                        task_id: task_id.to_string(),
                    }
                    .into());
                }
                Ok(result)
            }
            TaskState::Failed { message } => Err(BackendError::TaskFailed {
                task_id: task_id.to_string(),
                message,
            }
            .into()),
            TaskState::Pending | TaskState::Running { .. } => {
                Err(internal_error!("task {} is not finished", task_id))
            }
        }
    }
}

impl Drop for LocalBroker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn test_config() -> QueueConfig {
        QueueConfig {
            workers: 2,
            ..QueueConfig::default()
        }
    }

    fn wait_ready(broker: &dyn TaskBroker, task_id: TaskId) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !broker.is_ready(task_id).unwrap() {
            assert!(Instant::now() < deadline, "task never became ready");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn echo_upper() -> TaskHandler {
        Arc::new(|payload: &[u8]| -> GnResult<Vec<u8>> { Ok(payload.to_ascii_uppercase()) })
    }

    #[test]
    fn runs_submitted_tasks() {
        let broker = LocalBroker::start(&test_config(), echo_upper()).unwrap();
        let ids: Vec<TaskId> = ["a", "b", "c"]
            .iter()
            .map(|p| broker.submit(p.as_bytes().to_vec()).unwrap())
            .collect();

        for id in &ids {
            wait_ready(&broker, *id);
        }
        let results: Vec<Vec<u8>> = ids.iter().map(|id| broker.fetch(*id).unwrap()).collect();
        assert_eq!(results, vec![b"A".to_vec(), b"B".to_vec(), b"C".to_vec()]);
        assert_eq!(broker.pending_tasks(), 0);
    }

    #[test]
    fn handler_error_surfaces_on_fetch() {
        let handler: TaskHandler =
            Arc::new(|_: &[u8]| -> GnResult<Vec<u8>> { Err(internal_error!("bad fold")) });
        let broker = LocalBroker::start(&test_config(), handler).unwrap();
        let id = broker.submit(vec![1]).unwrap();

        wait_ready(&broker, id);
        let err = broker.fetch(id).unwrap_err();
        assert!(err.to_string().contains("bad fold"));
    }

    #[test]
    fn crashed_worker_task_is_redelivered() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let handler: TaskHandler = Arc::new(move |payload: &[u8]| -> GnResult<Vec<u8>> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("worker lost");
            }
            Ok(payload.to_vec())
        });
        let broker = LocalBroker::start(&test_config(), handler).unwrap();
        let id = broker.submit(b"fold".to_vec()).unwrap();

        wait_ready(&broker, id);
        assert_eq!(broker.fetch(id).unwrap(), b"fold".to_vec());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_crashes_exhaust_deliveries() {
        let handler: TaskHandler =
            Arc::new(|_: &[u8]| -> GnResult<Vec<u8>> { panic!("always lost") });
        let config = QueueConfig {
            max_deliveries: 2,
            ..test_config()
        };
        let broker = LocalBroker::start(&config, handler).unwrap();
        let id = broker.submit(vec![0]).unwrap();

        wait_ready(&broker, id);
        assert!(matches!(
            broker.fetch(id),
            Err(gn_types::GnError::Backend(BackendError::TaskFailed { .. }))
        ));
    }

    #[test]
    fn slow_task_survives_visibility_timeouts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let handler: TaskHandler = Arc::new(move |payload: &[u8]| -> GnResult<Vec<u8>> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            Ok(payload.to_vec())
        });
        let config = QueueConfig {
            workers: 3,
            visibility_timeout_secs: 0,
            max_deliveries: 2,
            ..test_config()
        };
        let broker = LocalBroker::start(&config, handler).unwrap();
        let id = broker.submit(b"slow fold".to_vec()).unwrap();

        // Polling while the task runs re-queues it many times over.
        wait_ready(&broker, id);
        assert_eq!(broker.fetch(id).unwrap(), b"slow fold".to_vec());
        assert!(attempts.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn expired_result_is_an_error() {
        let config = QueueConfig {
            result_expiry_secs: 0,
            ..test_config()
        };
        let broker = LocalBroker::start(&config, echo_upper()).unwrap();
        let id = broker.submit(b"x".to_vec()).unwrap();

        wait_ready(&broker, id);
        assert!(matches!(
            broker.fetch(id),
            Err(gn_types::GnError::Backend(BackendError::TaskExpired { .. }))
        ));
    }

    #[test]
    fn unknown_task_is_an_error() {
        let broker = LocalBroker::start(&test_config(), echo_upper()).unwrap();
        assert!(broker.is_ready(Uuid::new_v4()).is_err());
        assert!(broker.fetch(Uuid::new_v4()).is_err());
    }

    #[test]
    fn remote_schemes_fail_loudly() {
        let config = QueueConfig {
            broker_url: "amqp://guest@localhost//".to_string(),
            ..test_config()
        };
        match connect_broker(&config, echo_upper()) {
            Err(gn_types::GnError::Backend(BackendError::BrokerUnavailable { url, .. })) => {
                assert!(url.starts_with("amqp"))
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected amqp to be rejected"),
        }
        assert!(connect_broker(&test_config(), echo_upper()).is_ok());
    }
}
