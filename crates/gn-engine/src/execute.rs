//! Evaluation of a single cross-validation job.

use gn_data::fold_split;
use gn_types::{
    internal_error, GnResult, JobDescriptor, MethodRegistry, PredictorError, RawResult,
    TrainTestSplit,
};
use ndarray::ArrayView1;
use tracing::debug;

/// Pearson correlation of two equally long series.
///
/// Returns 0.0 when either side has no variance, so a constant prediction
/// scores as uninformative rather than NaN.
pub fn pearson_correlation(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a.iter().take(n).sum::<f64>() / n as f64;
    let mean_b = b.iter().take(n).sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Train and score one fold of one predictor.
pub fn execute_job(job: &JobDescriptor, registry: &MethodRegistry) -> GnResult<RawResult> {
    let dataset = &job.dataset;
    let (train, test) = fold_split(
        dataset.num_samples(),
        job.folds,
        job.seed,
        job.id.fold_index,
    )?;

    let (train_x, train_y) = dataset.select_samples(&train);
    let (test_x, test_y) = dataset.select_samples(&test);

    let predictor = registry.build(&job.predictor)?;
    let split = TrainTestSplit {
        train_x: train_x.view(),
        train_y: train_y.view(),
        test_x: test_x.view(),
        test_y: test_y.view(),
        seed: job.seed,
    };
    let predicted = predictor.predict(&split)?;
    if predicted.len() != test_y.len() {
        return Err(internal_error!(
            "{} returned {} predictions for {} test samples",
            predictor.name(),
            predicted.len(),
            test_y.len()
        ));
    }

    if let Some(bad) = predicted.iter().find(|v| !v.is_finite()) {
        return Err(PredictorError::TrainingFailed {
            method: predictor.name().to_string(),
            message: format!("produced a non-finite prediction ({bad}) on fold {}", job.id),
        }
        .into());
    }

    let accuracy = pearson_correlation(predicted.view(), test_y.view());
    if !accuracy.is_finite() {
        return Err(PredictorError::TrainingFailed {
            method: predictor.name().to_string(),
            message: format!("scored a non-finite accuracy on fold {}", job.id),
        }
        .into());
    }
    debug!("{} {} accuracy {:.4}", job.predictor, job.id, accuracy);
    Ok(RawResult::new(accuracy, job.id))
}
