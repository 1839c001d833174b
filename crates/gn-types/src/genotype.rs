use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::{DataError, GnResult};

/// Marker calls laid out markers x samples. `NaN` marks a missing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerTable {
    pub marker_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    pub calls: Array2<f64>,
}

impl MarkerTable {
    pub fn new(
        marker_ids: Vec<String>,
        sample_ids: Vec<String>,
        calls: Array2<f64>,
    ) -> GnResult<Self> {
        if calls.nrows() != marker_ids.len() || calls.ncols() != sample_ids.len() {
            return Err(DataError::ShapeMismatch {
                message: format!(
                    "marker table is {}x{} but has {} marker ids and {} sample ids",
                    calls.nrows(),
                    calls.ncols(),
                    marker_ids.len(),
                    sample_ids.len()
                ),
            }
            .into());
        }
        Ok(Self {
            marker_ids,
            sample_ids,
            calls,
        })
    }

    pub fn num_markers(&self) -> usize {
        self.calls.nrows()
    }

    pub fn num_samples(&self) -> usize {
        self.calls.ncols()
    }
}

/// Phenotype values laid out samples x traits. `NaN` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeTable {
    pub sample_ids: Vec<String>,
    pub traits: Vec<String>,
    pub values: Array2<f64>,
}

impl PhenotypeTable {
    pub fn new(sample_ids: Vec<String>, traits: Vec<String>, values: Array2<f64>) -> GnResult<Self> {
        if values.nrows() != sample_ids.len() || values.ncols() != traits.len() {
            return Err(DataError::ShapeMismatch {
                message: format!(
                    "phenotype table is {}x{} but has {} sample ids and {} traits",
                    values.nrows(),
                    values.ncols(),
                    sample_ids.len(),
                    traits.len()
                ),
            }
            .into());
        }
        Ok(Self {
            sample_ids,
            traits,
            values,
        })
    }

    pub fn trait_values(&self, trait_name: &str) -> GnResult<ArrayView1<'_, f64>> {
        let idx = self
            .traits
            .iter()
            .position(|t| t == trait_name)
            .ok_or_else(|| DataError::UnknownTrait {
                trait_name: trait_name.to_string(),
            })?;
        Ok(self.values.column(idx))
    }

    pub fn num_samples(&self) -> usize {
        self.values.nrows()
    }
}

/// Marker and phenotype tables whose samples line up position by position.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeData {
    pub markers: MarkerTable,
    pub phenotypes: PhenotypeTable,
}

impl GenotypeData {
    pub fn new(markers: MarkerTable, phenotypes: PhenotypeTable) -> GnResult<Self> {
        if markers.num_samples() != phenotypes.num_samples() {
            return Err(DataError::ShapeMismatch {
                message: format!(
                    "{} samples in marker table, {} in phenotype table",
                    markers.num_samples(),
                    phenotypes.num_samples()
                ),
            }
            .into());
        }
        let mismatch = markers
            .sample_ids
            .iter()
            .zip(phenotypes.sample_ids.iter())
            .position(|(m, p)| m != p);
        if let Some(position) = mismatch {
            return Err(DataError::SampleMismatch {
                position,
                marker_sample: markers.sample_ids[position].clone(),
                phenotype_sample: phenotypes.sample_ids[position].clone(),
            }
            .into());
        }
        Ok(Self {
            markers,
            phenotypes,
        })
    }
}

/// A cleaned, index-aligned dataset for one trait.
///
/// `markers` is markers x samples with no missing values; `phenotype` has one
/// entry per sample column. Positions are 0-based and contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanDataset {
    pub trait_name: String,
    pub marker_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    pub markers: Array2<f64>,
    pub phenotype: Array1<f64>,
}

impl CleanDataset {
    pub fn num_samples(&self) -> usize {
        self.phenotype.len()
    }

    pub fn num_markers(&self) -> usize {
        self.markers.nrows()
    }

    /// Samples x markers view, the orientation prediction methods consume.
    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.markers.t()
    }

    /// Copy the given sample positions into a samples x markers matrix and
    /// the matching phenotype vector.
    pub fn select_samples(&self, positions: &[usize]) -> (Array2<f64>, Array1<f64>) {
        (
            self.features().select(Axis(0), positions),
            self.phenotype.select(Axis(0), positions),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GnError;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn marker_table_rejects_wrong_id_count() {
        let result = MarkerTable::new(ids("m", 3), ids("s", 2), Array2::zeros((2, 2)));
        assert!(matches!(
            result,
            Err(GnError::Data(DataError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn genotype_data_detects_sample_mismatch() {
        let markers = MarkerTable::new(ids("m", 2), ids("s", 2), Array2::zeros((2, 2))).unwrap();
        let phenotypes = PhenotypeTable::new(
            vec!["s0".to_string(), "x1".to_string()],
            vec!["yield".to_string()],
            Array2::zeros((2, 1)),
        )
        .unwrap();

        match GenotypeData::new(markers, phenotypes) {
            Err(GnError::Data(DataError::SampleMismatch { position, .. })) => assert_eq!(position, 1),
            other => panic!("expected sample mismatch, got {other:?}"),
        }
    }

    #[test]
    fn unknown_trait_lookup_fails() {
        let phenotypes =
            PhenotypeTable::new(ids("s", 1), vec!["yield".to_string()], Array2::zeros((1, 1))).unwrap();
        assert!(phenotypes.trait_values("height").is_err());
        assert_eq!(phenotypes.trait_values("yield").unwrap().len(), 1);
    }

    #[test]
    fn select_samples_returns_sample_major_rows() {
        let dataset = CleanDataset {
            trait_name: "yield".to_string(),
            marker_ids: ids("m", 2),
            sample_ids: ids("s", 3),
            markers: array![[0.0, 1.0, 2.0], [2.0, 1.0, 0.0]],
            phenotype: array![10.0, 11.0, 12.0],
        };

        let (x, y) = dataset.select_samples(&[2, 0]);
        assert_eq!(x, array![[2.0, 0.0], [0.0, 2.0]]);
        assert_eq!(y, array![12.0, 10.0]);
    }
}
