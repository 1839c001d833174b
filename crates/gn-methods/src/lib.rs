pub mod mlp;
pub mod rbf;
pub mod ridge;
pub mod scaling;
pub mod solver;

pub use mlp::MlpNetwork;
pub use rbf::RbfNetwork;
pub use ridge::RidgeRegression;

use gn_types::{GnResult, MethodRegistry, Predictor, PredictorError};

/// Register the built-in methods under their `NAME`s.
pub fn register_defaults(registry: &mut MethodRegistry) {
    registry.register(MlpNetwork::NAME, |params| {
        Ok(Box::new(MlpNetwork::from_params(params)?) as Box<dyn Predictor>)
    });
    registry.register(RbfNetwork::NAME, |params| {
        Ok(Box::new(RbfNetwork::from_params(params)?) as Box<dyn Predictor>)
    });
    registry.register(RidgeRegression::NAME, |params| {
        Ok(Box::new(RidgeRegression::from_params(params)?) as Box<dyn Predictor>)
    });
}

/// A registry holding every built-in method.
pub fn default_registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    register_defaults(&mut registry);
    registry
}

pub(crate) fn require_at_least(parameter: &str, value: f64, min: f64) -> GnResult<()> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(PredictorError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("must be at least {min}, got {value}"),
        }
        .into())
    }
}

/// Accepts `low < value <= high`.
pub(crate) fn require_range(parameter: &str, value: f64, low: f64, high: f64) -> GnResult<()> {
    if value > low && value <= high {
        Ok(())
    } else {
        Err(PredictorError::InvalidParameter {
            parameter: parameter.to_string(),
            message: format!("must be within ({low}, {high}], got {value}"),
        }
        .into())
    }
}
