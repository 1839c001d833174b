use gn_data::clean_dataset;
use gn_types::{AccuracyMatrix, DataError, GenotypeData, GnResult, PipelineConfig, PredictorSpec};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::aggregate::group_accuracies;
use crate::backend::ExecutionBackend;
use crate::jobs::build_jobs;

/// Cross-validate every predictor in `specs` on `trait_name`.
///
/// Returns one row of `config.folds` accuracies per spec, in the order the
/// specs were given, whatever order the backend completed them in.
pub fn run_predictors(
    data: &GenotypeData,
    trait_name: &str,
    specs: &[PredictorSpec],
    backend: &dyn ExecutionBackend,
    config: &PipelineConfig,
) -> GnResult<AccuracyMatrix> {
    let started = Instant::now();
    let dataset = clean_dataset(data, trait_name, &config.thresholds)?;
    if dataset.num_samples() == 0 || dataset.num_markers() == 0 {
        return Err(DataError::EmptyDataset {
            message: format!(
                "{} samples and {} markers left for '{}'",
                dataset.num_samples(),
                dataset.num_markers(),
                trait_name
            ),
        }
        .into());
    }

    let jobs = build_jobs(Arc::new(dataset), specs, config.folds, config.seed);
    info!(
        "Dispatching {} jobs ({} predictors x {} folds) to the {} backend",
        jobs.len(),
        specs.len(),
        config.folds,
        backend.name()
    );

    let results = backend.execute(jobs)?;
    let matrix = group_accuracies(results, config.folds)?;
    info!(
        "Finished {} predictors in {:.1}s",
        matrix.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PooledBackend, SequentialBackend};
    use crate::execute::test_support::registry;
    use gn_types::{JobDescriptor, MarkerTable, ParameterSet, PhenotypeTable, RawResult};
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn genotype_data(samples: usize, markers: usize) -> GenotypeData {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let calls = Array2::from_shape_fn((markers, samples), |_| rng.random_range(0..3) as f64);
        let yields = Array2::from_shape_fn((samples, 1), |(s, _)| {
            calls[[0, s]] + rng.random_range(-0.5..0.5)
        });
        let sample_ids: Vec<String> = (0..samples).map(|s| format!("s{s}")).collect();
        GenotypeData::new(
            MarkerTable::new(
                (0..markers).map(|m| format!("m{m}")).collect(),
                sample_ids.clone(),
                calls,
            )
            .unwrap(),
            PhenotypeTable::new(sample_ids, vec!["yield".to_string()], yields).unwrap(),
        )
        .unwrap()
    }

    fn gains(values: &[f64]) -> Vec<PredictorSpec> {
        values
            .iter()
            .map(|g| PredictorSpec::new("first_marker", ParameterSet::new().with("gain", *g)))
            .collect()
    }

    #[test]
    fn three_predictors_ten_folds_sequential() {
        let config = PipelineConfig::default().with_folds(10);
        let backend = SequentialBackend::new(registry());
        let matrix = run_predictors(
            &genotype_data(100, 10),
            "yield",
            &gains(&[1.0, -1.0, 2.0]),
            &backend,
            &config,
        )
        .unwrap();

        assert_eq!(matrix.len(), 3);
        assert!(matrix.iter().all(|row| row.len() == 10));
        assert!(matrix[0].iter().all(|v| *v > 0.0));
        assert!(matrix[1].iter().all(|v| *v < 0.0));
        // gain does not change a correlation
        for (a, b) in matrix[0].iter().zip(&matrix[2]) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    /// Completes jobs fold-major and in reverse to mimic arbitrary arrival.
    struct Scrambling(SequentialBackend);

    impl ExecutionBackend for Scrambling {
        fn name(&self) -> &str {
            "scrambling"
        }

        fn execute(&self, jobs: Vec<JobDescriptor>) -> GnResult<Vec<RawResult>> {
            let mut results = self.0.execute(jobs)?;
            results.sort_by_key(|r| (r.id.fold_index, std::cmp::Reverse(r.id.predictor_index)));
            Ok(results)
        }
    }

    #[test]
    fn rows_follow_submission_order_regardless_of_arrival() {
        let config = PipelineConfig::default().with_folds(5);
        let data = genotype_data(60, 4);
        let specs = gains(&[1.0, -1.0]);

        let scrambled = run_predictors(
            &data,
            "yield",
            &specs,
            &Scrambling(SequentialBackend::new(registry())),
            &config,
        )
        .unwrap();
        let pooled = run_predictors(
            &data,
            "yield",
            &specs,
            &PooledBackend::new(2, registry(), false).unwrap(),
            &config,
        )
        .unwrap();

        assert!(scrambled[0].iter().all(|v| *v > 0.0));
        assert!(scrambled[1].iter().all(|v| *v < 0.0));
        assert!(pooled[0].iter().all(|v| *v > 0.0));
        assert!(pooled[1].iter().all(|v| *v < 0.0));
    }

    #[test]
    fn empty_dataset_is_a_data_error() {
        let mut data = genotype_data(20, 2);
        data.phenotypes.values.fill(f64::NAN);
        let err = run_predictors(
            &data,
            "yield",
            &gains(&[1.0]),
            &SequentialBackend::new(registry()),
            &PipelineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, gn_types::GnError::Data(DataError::EmptyDataset { .. })));
    }
}
