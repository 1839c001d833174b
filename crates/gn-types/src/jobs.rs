use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::genotype::CleanDataset;
use crate::predictor::PredictorSpec;

/// Addresses one unit of work: a fold of one predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub fold_index: usize,
    pub predictor_index: usize,
}

impl JobId {
    pub fn new(fold_index: usize, predictor_index: usize) -> Self {
        Self {
            fold_index,
            predictor_index,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(fold {}, predictor {})", self.fold_index, self.predictor_index)
    }
}

/// Everything a worker needs to evaluate one fold of one predictor.
///
/// The dataset is shared read-only by in-process backends and copied by
/// value when a job crosses a queue boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub dataset: Arc<CleanDataset>,
    pub predictor: PredictorSpec,
    pub seed: u64,
    pub folds: usize,
    pub id: JobId,
}

/// Accuracy of one job, tagged with the job that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub accuracy: f64,
    pub id: JobId,
}

impl RawResult {
    pub fn new(accuracy: f64, id: JobId) -> Self {
        Self { accuracy, id }
    }
}

/// Per-predictor fold accuracies, in predictor submission order.
pub type AccuracyMatrix = Vec<Vec<f64>>;
