use gn_types::{CleanDataset, JobDescriptor, JobId, PredictorSpec};
use std::sync::Arc;

/// Expand `specs` into one job per fold per predictor.
///
/// Jobs are emitted predictor-major: all folds of predictor 0, then all folds
/// of predictor 1, and so on. Every job carries the same `seed`, so each
/// predictor is scored on identical folds.
pub fn build_jobs(
    dataset: Arc<CleanDataset>,
    specs: &[PredictorSpec],
    folds: usize,
    seed: u64,
) -> Vec<JobDescriptor> {
    specs
        .iter()
        .enumerate()
        .flat_map(|(predictor_index, spec)| {
            let dataset = Arc::clone(&dataset);
            (0..folds).map(move |fold_index| JobDescriptor {
                dataset: Arc::clone(&dataset),
                predictor: spec.clone(),
                seed,
                folds,
                id: JobId::new(fold_index, predictor_index),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gn_types::ParameterSet;
    use ndarray::{Array1, Array2};

    fn empty_dataset() -> Arc<CleanDataset> {
        Arc::new(CleanDataset {
            trait_name: "yield".to_string(),
            marker_ids: Vec::new(),
            sample_ids: Vec::new(),
            markers: Array2::zeros((0, 0)),
            phenotype: Array1::zeros(0),
        })
    }

    #[test]
    fn emits_folds_times_predictors_in_predictor_major_order() {
        let specs: Vec<PredictorSpec> = (1..=3)
            .map(|h| PredictorSpec::new("mlp", ParameterSet::new().with("hidden", h as i64)))
            .collect();

        let jobs = build_jobs(empty_dataset(), &specs, 10, 7);
        assert_eq!(jobs.len(), 30);
        assert_eq!(jobs[0].id, JobId::new(0, 0));
        assert_eq!(jobs[9].id, JobId::new(9, 0));
        assert_eq!(jobs[10].id, JobId::new(0, 1));
        assert_eq!(jobs[29].id, JobId::new(9, 2));
        assert_eq!(jobs[15].predictor, specs[1]);
        assert!(jobs.iter().all(|job| job.seed == 7 && job.folds == 10));
    }

    #[test]
    fn jobs_share_one_dataset() {
        let dataset = empty_dataset();
        let specs = vec![PredictorSpec::new("ridge", ParameterSet::new())];
        let jobs = build_jobs(Arc::clone(&dataset), &specs, 4, 1);
        assert!(jobs.iter().all(|job| Arc::ptr_eq(&job.dataset, &dataset)));
    }
}
