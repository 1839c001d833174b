//! Missingness filtering and mean imputation.

use gn_types::{CleanDataset, CleaningThresholds, GenotypeData, GnResult};
use ndarray::{Array1, Axis};
use tracing::{debug, info};

/// Largest missing-call count still accepted when `required` of `count`
/// calls must be present.
fn max_missing_allowed(count: usize, required: f64) -> usize {
    // Nudge down before ceil so 100 * (1 - 0.95) does not round up to 6.
    let allowed = (count as f64 * (1.0 - required) - 1e-9).ceil();
    allowed.max(0.0) as usize
}

/// Clean `data` for one trait.
///
/// Order matters: samples missing the trait go first, then samples with too
/// many missing calls, then markers with too many missing calls among the
/// surviving samples. Remaining gaps are filled with the marker's mean. The
/// input tables are never modified.
pub fn clean_dataset(
    data: &GenotypeData,
    trait_name: &str,
    thresholds: &CleaningThresholds,
) -> GnResult<CleanDataset> {
    let calls = &data.markers.calls;
    let trait_values = data.phenotypes.trait_values(trait_name)?;
    let num_markers = calls.nrows();

    let mut samples: Vec<usize> = (0..trait_values.len())
        .filter(|&s| !trait_values[s].is_nan())
        .collect();
    debug!(
        "{} of {} samples have a value for '{}'",
        samples.len(),
        trait_values.len(),
        trait_name
    );

    let max_missing_per_sample =
        max_missing_allowed(num_markers, thresholds.required_markers_per_sample);
    samples.retain(|&s| {
        calls.column(s).iter().filter(|v| v.is_nan()).count() <= max_missing_per_sample
    });

    let max_missing_per_marker =
        max_missing_allowed(samples.len(), thresholds.required_marker_call_proportion);
    let kept_markers: Vec<usize> = (0..num_markers)
        .filter(|&m| {
            samples.iter().filter(|&&s| calls[[m, s]].is_nan()).count() <= max_missing_per_marker
        })
        .collect();

    let mut markers = calls
        .select(Axis(0), &kept_markers)
        .select(Axis(1), &samples);

    let mut imputed = 0usize;
    for mut row in markers.rows_mut() {
        let (sum, observed) = row
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        let mean = if observed > 0 { sum / observed as f64 } else { 0.0 };
        imputed += row.len() - observed;
        row.mapv_inplace(|v| if v.is_nan() { mean } else { v });
    }

    let phenotype: Array1<f64> = samples.iter().map(|&s| trait_values[s]).collect();

    info!(
        "Cleaned '{}': kept {}/{} samples and {}/{} markers, imputed {} calls",
        trait_name,
        samples.len(),
        trait_values.len(),
        kept_markers.len(),
        num_markers,
        imputed
    );

    Ok(CleanDataset {
        trait_name: trait_name.to_string(),
        marker_ids: kept_markers
            .iter()
            .map(|&m| data.markers.marker_ids[m].clone())
            .collect(),
        sample_ids: samples
            .iter()
            .map(|&s| data.markers.sample_ids[s].clone())
            .collect(),
        markers,
        phenotype,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gn_types::{MarkerTable, PhenotypeTable};
    use ndarray::{array, Array2};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn dataset(calls: Array2<f64>, trait_values: Vec<f64>) -> GenotypeData {
        let (m, s) = calls.dim();
        let markers = MarkerTable::new(ids("m", m), ids("s", s), calls).unwrap();
        let phenotypes = PhenotypeTable::new(
            ids("s", s),
            vec!["yield".to_string()],
            Array2::from_shape_vec((s, 1), trait_values).unwrap(),
        )
        .unwrap();
        GenotypeData::new(markers, phenotypes).unwrap()
    }

    #[test]
    fn threshold_uses_ceiling() {
        assert_eq!(max_missing_allowed(10, 0.0), 10);
        assert_eq!(max_missing_allowed(10, 0.75), 3);
        assert_eq!(max_missing_allowed(100, 0.95), 5);
        assert_eq!(max_missing_allowed(10, 1.0), 0);
        assert_eq!(max_missing_allowed(0, 0.5), 0);
    }

    #[test]
    fn hundred_samples_with_two_missing_traits() {
        // 100 samples x 10 markers, ~5% missing calls.
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let calls = Array2::from_shape_fn((10, 100), |_| {
            if rng.random::<f64>() < 0.05 {
                f64::NAN
            } else {
                rng.random_range(0..3) as f64
            }
        });
        let mut trait_values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        trait_values[3] = f64::NAN;
        trait_values[42] = f64::NAN;

        let data = dataset(calls, trait_values);
        let clean = clean_dataset(&data, "yield", &CleaningThresholds::default()).unwrap();

        assert_eq!(clean.num_samples(), 98);
        assert_eq!(clean.markers.ncols(), 98);
        assert_eq!(clean.num_markers(), 10);
        assert_eq!(clean.sample_ids.len(), 98);
        assert!(!clean.sample_ids.contains(&"s3".to_string()));
        assert!(!clean.sample_ids.contains(&"s42".to_string()));
        assert!(clean.markers.iter().all(|v| v.is_finite()));
        assert!(clean.phenotype.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn drops_sparse_samples_then_sparse_markers() {
        let nan = f64::NAN;
        // markers x samples
        let calls = array![
            [0.0, 1.0, nan, 2.0],
            [1.0, nan, nan, 2.0],
            [2.0, 1.0, nan, nan],
            [0.0, nan, 1.0, 0.0],
        ];
        let data = dataset(calls, vec![1.0, 2.0, 3.0, 4.0]);
        let thresholds = CleaningThresholds {
            // sample may miss at most ceil(4 * 0.5) = 2 calls -> sample 2 (3 missing) dropped
            required_markers_per_sample: 0.5,
            // marker may miss at most ceil(3 * 0.5) = 2 of the 3 kept samples
            required_marker_call_proportion: 0.5,
        };

        let clean = clean_dataset(&data, "yield", &thresholds).unwrap();
        assert_eq!(clean.sample_ids, vec!["s0", "s1", "s3"]);
        assert_eq!(clean.num_markers(), 4);
        assert_eq!(clean.phenotype, array![1.0, 2.0, 4.0]);

        let strict = CleaningThresholds {
            required_markers_per_sample: 0.5,
            // at most ceil(3 * 0.1) = 1 missing
            required_marker_call_proportion: 0.9,
        };
        let clean = clean_dataset(&data, "yield", &strict).unwrap();
        assert_eq!(clean.marker_ids, vec!["m0", "m1", "m2", "m3"]);

        let strictest = CleaningThresholds {
            required_markers_per_sample: 0.5,
            required_marker_call_proportion: 1.0,
        };
        let clean = clean_dataset(&data, "yield", &strictest).unwrap();
        assert_eq!(clean.marker_ids, vec!["m0"]);
    }

    #[test]
    fn imputes_marker_mean_across_samples() {
        let nan = f64::NAN;
        let calls = array![[0.0, 2.0, nan], [nan, nan, nan]];
        let data = dataset(calls, vec![1.0, 1.0, 1.0]);

        let clean = clean_dataset(&data, "yield", &CleaningThresholds::default()).unwrap();
        assert_eq!(clean.markers.row(0).to_vec(), vec![0.0, 2.0, 1.0]);
        assert_eq!(clean.markers.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn input_tables_are_untouched() {
        let nan = f64::NAN;
        let data = dataset(array![[nan, 1.0]], vec![nan, 2.0]);
        let before = data.markers.calls.clone();

        let clean = clean_dataset(&data, "yield", &CleaningThresholds::default()).unwrap();
        assert_eq!(clean.num_samples(), 1);
        assert!(data.markers.calls[[0, 0]].is_nan());
        assert_eq!(data.markers.calls[[0, 1]], before[[0, 1]]);
    }

    #[test]
    fn everything_dropped_yields_empty_dataset() {
        let nan = f64::NAN;
        let data = dataset(array![[0.0, 1.0]], vec![nan, nan]);
        let clean = clean_dataset(&data, "yield", &CleaningThresholds::default()).unwrap();
        assert_eq!(clean.num_samples(), 0);
        assert_eq!(clean.markers.ncols(), 0);
    }

    #[test]
    fn unknown_trait_is_an_error() {
        let data = dataset(array![[0.0]], vec![1.0]);
        assert!(clean_dataset(&data, "height", &CleaningThresholds::default()).is_err());
    }
}
