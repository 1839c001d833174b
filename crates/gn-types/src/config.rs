//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{GnError, GnResult};

/// Missingness thresholds applied by the data cleaner.
///
/// Both proportions are the share of calls that must be present; `0.0`
/// keeps everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningThresholds {
    pub required_markers_per_sample: f64,
    pub required_marker_call_proportion: f64,
}

/// Connection and delivery settings for the queued backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Broker address. Only `local://` is compiled in.
    pub broker_url: String,
    pub result_backend_url: String,
    /// Worker threads serving the local broker.
    pub workers: usize,
    /// Seconds a delivered task may stay unacknowledged before it is redelivered.
    pub visibility_timeout_secs: u64,
    /// Seconds a finished result is kept before it expires.
    pub result_expiry_secs: u64,
    pub poll_interval_secs: u64,
    /// Deliveries attempted before a crashing task is marked failed.
    pub max_deliveries: u32,
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn result_expiry(&self) -> Duration {
        Duration::from_secs(self.result_expiry_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            broker_url: "local://".to_string(),
            result_backend_url: "local://".to_string(),
            workers: num_cpus::get(),
            visibility_timeout_secs: 60 * 60,
            result_expiry_secs: 60 * 30,
            poll_interval_secs: 15,
            max_deliveries: 3,
        }
    }
}

/// Top-level configuration for a cross-validation / optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Worker count for the pooled backend.
    pub cpu_cores: usize,
    /// Seed shared by every job of one `run_predictors` call.
    pub seed: u64,
    /// Backend name: `sequential`, `pooled` or `queued`.
    pub backend: String,
    pub thresholds: CleaningThresholds,
    pub shelf_dir: PathBuf,
    pub show_progress: bool,
    pub queue: QueueConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            cpu_cores: num_cpus::get(),
            seed: 1,
            backend: "pooled".to_string(),
            thresholds: CleaningThresholds::default(),
            shelf_dir: PathBuf::from("shelves"),
            show_progress: true,
            queue: QueueConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> GnResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GnError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GnResult<()> {
        if self.folds < 2 {
            return Err(GnError::Config(format!(
                "fold count must be at least 2, got {}",
                self.folds
            )));
        }
        if self.cpu_cores == 0 {
            return Err(GnError::Config("cpu_cores must be at least 1".to_string()));
        }
        for (name, value) in [
            ("required_markers_per_sample", self.thresholds.required_markers_per_sample),
            (
                "required_marker_call_proportion",
                self.thresholds.required_marker_call_proportion,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GnError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cpu_cores(mut self, cpu_cores: usize) -> Self {
        self.cpu_cores = cpu_cores;
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_thresholds(mut self, thresholds: CleaningThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_shelf_dir(mut self, shelf_dir: impl Into<PathBuf>) -> Self {
        self.shelf_dir = shelf_dir.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.folds, 10);
        assert_eq!(config.seed, 1);
        assert_eq!(config.shelf_dir, PathBuf::from("shelves"));
        assert_eq!(config.queue.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.queue.visibility_timeout(), Duration::from_secs(3600));
        assert_eq!(config.queue.result_expiry(), Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"folds": 5, "thresholds": {"required_markers_per_sample": 0.9}}"#)
                .unwrap();
        assert_eq!(config.folds, 5);
        assert_eq!(config.thresholds.required_markers_per_sample, 0.9);
        assert_eq!(config.thresholds.required_marker_call_proportion, 0.0);
        assert_eq!(config.backend, "pooled");
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(PipelineConfig::default().with_folds(1).validate().is_err());
        assert!(PipelineConfig::default().with_cpu_cores(0).validate().is_err());
        let thresholds = CleaningThresholds {
            required_markers_per_sample: 1.5,
            ..CleaningThresholds::default()
        };
        assert!(PipelineConfig::default()
            .with_thresholds(thresholds)
            .validate()
            .is_err());
    }
}
