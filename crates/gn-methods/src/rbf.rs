//! Gaussian radial-basis-function network.

use gn_types::{GnResult, ParameterSet, Predictor, PredictorError, TrainTestSplit};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::scaling::MinMaxScaler;
use crate::solver::fit_least_squares;
use crate::{require_at_least, require_range};

#[derive(Debug, Clone, PartialEq)]
pub struct RbfNetwork {
    /// Number of Gaussian centres, drawn from the training samples.
    pub hidden: usize,
    /// L2 penalty on the output weights.
    pub weight_decay: f64,
    pub epochs: usize,
    pub learning_rate: f64,
}

impl RbfNetwork {
    pub const NAME: &'static str = "rbf";

    pub fn from_params(params: &ParameterSet) -> GnResult<Self> {
        let network = Self {
            hidden: params.usize_or("hidden", 5)?,
            weight_decay: params.f64_or("weight_decay", 0.0)?,
            epochs: params.usize_or("epochs", 1000)?,
            learning_rate: params.f64_or("learning_rate", 1.0)?,
        };
        require_at_least("hidden", network.hidden as f64, 1.0)?;
        require_at_least("weight_decay", network.weight_decay, 0.0)?;
        require_at_least("epochs", network.epochs as f64, 1.0)?;
        require_range("learning_rate", network.learning_rate, 0.0, 1.0)?;
        Ok(network)
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Gaussian units sharing one width.
#[derive(Debug, Clone)]
struct Basis {
    centres: Array2<f64>,
    width: f64,
}

impl Basis {
    fn sample(x: ArrayView2<'_, f64>, hidden: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let count = hidden.min(x.nrows());
        let picked = rand::seq::index::sample(&mut rng, x.nrows(), count).into_vec();
        let centres = x.select(Axis(0), &picked);

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..count {
            for j in (i + 1)..count {
                total += squared_distance(centres.row(i), centres.row(j)).sqrt();
                pairs += 1;
            }
        }
        let width = if pairs > 0 && total > 0.0 {
            total / pairs as f64
        } else {
            1.0
        };
        Self { centres, width }
    }

    fn activations(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let denom = 2.0 * self.width * self.width;
        Array2::from_shape_fn((x.nrows(), self.centres.nrows()), |(i, j)| {
            (-squared_distance(x.row(i), self.centres.row(j)) / denom).exp()
        })
    }
}

impl Predictor for RbfNetwork {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predict(&self, split: &TrainTestSplit<'_>) -> GnResult<Array1<f64>> {
        if split.train_x.nrows() == 0 {
            return Err(PredictorError::TrainingFailed {
                method: Self::NAME.to_string(),
                message: "no training samples".to_string(),
            }
            .into());
        }
        let scaler = MinMaxScaler::fit(split.train_y, -1.0, 1.0);
        let train_y = scaler.transform(split.train_y);

        let basis = Basis::sample(split.train_x, self.hidden, split.seed);
        let fit = fit_least_squares(
            basis.activations(split.train_x).view(),
            train_y.view(),
            self.weight_decay,
            self.epochs,
            self.learning_rate,
        );
        let scaled = fit.predict(basis.activations(split.test_x).view());
        Ok(scaler.inverse_transform(scaled.view()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{correlation, split_of, synthetic};
    use ndarray::array;

    #[test]
    fn width_is_mean_centre_distance() {
        let x = array![[0.0, 0.0], [3.0, 4.0]];
        let basis = Basis::sample(x.view(), 2, 1);
        assert_eq!(basis.centres.nrows(), 2);
        assert!((basis.width - 5.0).abs() < 1e-12);

        let single = Basis::sample(x.view(), 1, 1);
        assert_eq!(single.width, 1.0);
    }

    #[test]
    fn more_centres_than_samples_is_capped() {
        let x = array![[0.0], [1.0], [2.0]];
        assert_eq!(Basis::sample(x.view(), 10, 3).centres.nrows(), 3);
    }

    #[test]
    fn learns_additive_signal() {
        let data = synthetic(150, 6, 7);
        let split = split_of(&data, 120);
        let params = ParameterSet::new().with("hidden", 40).with("epochs", 5000);
        let rbf = RbfNetwork::from_params(&params).unwrap();
        let predicted = rbf.predict(&split).unwrap();
        assert_eq!(predicted.len(), 30);
        assert!(correlation(&predicted, &split) > 0.3);
    }

    #[test]
    fn rejects_zero_centres() {
        assert!(RbfNetwork::from_params(&ParameterSet::new().with("hidden", 0)).is_err());
    }
}
