//! Prediction function contract and the registry that resolves serializable
//! predictor specs into runnable predictors.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{GnResult, PredictorError};
use crate::params::ParameterSet;

/// One cross-validation fold handed to a predictor.
///
/// Rows of `train_x` / `test_x` are samples, columns are markers.
#[derive(Debug, Clone, Copy)]
pub struct TrainTestSplit<'a> {
    pub train_x: ArrayView2<'a, f64>,
    pub train_y: ArrayView1<'a, f64>,
    pub test_x: ArrayView2<'a, f64>,
    pub test_y: ArrayView1<'a, f64>,
    /// Seed for any randomness inside the method (weight init, dropout).
    pub seed: u64,
}

/// A prediction method with its hyperparameters already bound.
///
/// Implementations must hold no process-local state: the same predictor may
/// be rebuilt and re-run on another worker after a redelivery.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    /// Fit on the training rows and return one prediction per test row.
    fn predict(&self, split: &TrainTestSplit<'_>) -> GnResult<Array1<f64>>;
}

/// Serializable description of a predictor: a registered method name plus
/// its bound hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorSpec {
    pub method: String,
    pub parameters: ParameterSet,
}

impl PredictorSpec {
    pub fn new(method: impl Into<String>, parameters: ParameterSet) -> Self {
        Self {
            method: method.into(),
            parameters,
        }
    }
}

impl fmt::Display for PredictorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, self.parameters)
    }
}

/// Builds a predictor from its parameters.
pub type PredictorBuilder =
    Arc<dyn Fn(&ParameterSet) -> GnResult<Box<dyn Predictor>> + Send + Sync>;

/// Maps method names to predictor builders.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    builders: BTreeMap<String, PredictorBuilder>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, method: impl Into<String>, builder: F)
    where
        F: Fn(&ParameterSet) -> GnResult<Box<dyn Predictor>> + Send + Sync + 'static,
    {
        self.builders.insert(method.into(), Arc::new(builder));
    }

    pub fn with<F>(mut self, method: impl Into<String>, builder: F) -> Self
    where
        F: Fn(&ParameterSet) -> GnResult<Box<dyn Predictor>> + Send + Sync + 'static,
    {
        self.register(method, builder);
        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.builders.contains_key(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    pub fn build(&self, spec: &PredictorSpec) -> GnResult<Box<dyn Predictor>> {
        let builder = self
            .builders
            .get(&spec.method)
            .ok_or_else(|| PredictorError::UnknownMethod {
                method: spec.method.clone(),
            })?;
        builder(&spec.parameters)
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}
