//! Single-hidden-layer perceptron trained with mini-batch SGD.

use gn_types::{GnResult, ParameterSet, Predictor, PredictorError, TrainTestSplit};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::scaling::{MinMaxScaler, Standardizer};
use crate::{require_at_least, require_range};

/// Hyperparameters of the tanh network.
///
/// Markers are standardized and the target is min-max scaled to `[-1, 1]`
/// on the training fold; predictions are mapped back to phenotype units.
#[derive(Debug, Clone, PartialEq)]
pub struct MlpNetwork {
    pub hidden: usize,
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub dropout_prob: f64,
}

impl MlpNetwork {
    pub const NAME: &'static str = "mlp";

    pub fn from_params(params: &ParameterSet) -> GnResult<Self> {
        let network = Self {
            hidden: params.usize_or("hidden", 5)?,
            batch_size: params.usize_or("batch_size", 100)?,
            epochs: params.usize_or("epochs", 250)?,
            learning_rate: params.f64_or("learning_rate", 0.01)?,
            weight_decay: params.f64_or("weight_decay", 0.0)?,
            dropout_prob: params.f64_or("dropout_prob", 0.0)?,
        };
        require_at_least("hidden", network.hidden as f64, 1.0)?;
        require_at_least("batch_size", network.batch_size as f64, 1.0)?;
        require_at_least("epochs", network.epochs as f64, 1.0)?;
        require_range("learning_rate", network.learning_rate, 0.0, 10.0)?;
        require_at_least("weight_decay", network.weight_decay, 0.0)?;
        // 1.0 would drop every hidden unit.
        if !(0.0..1.0).contains(&network.dropout_prob) {
            return Err(PredictorError::InvalidParameter {
                parameter: "dropout_prob".to_string(),
                message: format!("must be within [0, 1), got {}", network.dropout_prob),
            }
            .into());
        }
        Ok(network)
    }

    fn fit(&self, x: ArrayView2<'_, f64>, y: &Array1<f64>, seed: u64) -> Layers {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut layers = Layers::glorot(x.ncols(), self.hidden, &mut rng);
        let keep = 1.0 - self.dropout_prob;
        let mut order: Vec<usize> = (0..x.nrows()).collect();

        for epoch in 0..self.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            for batch in order.chunks(self.batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                let m = batch.len() as f64;

                let activation = layers.hidden_activation(xb.view());
                let mask = if self.dropout_prob > 0.0 {
                    Array2::from_shape_fn(activation.raw_dim(), |_| {
                        if rng.random::<f64>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    })
                } else {
                    Array2::ones(activation.raw_dim())
                };
                let dropped = &activation * &mask;
                let output = dropped.dot(&layers.w2) + layers.b2;

                let error = &output - &yb;
                epoch_loss += error.dot(&error) / 2.0;
                let d_out = error / m;

                let mut grad_w2 = dropped.t().dot(&d_out);
                grad_w2.scaled_add(self.weight_decay, &layers.w2);
                let grad_b2 = d_out.sum();

                let back = d_out
                    .view()
                    .insert_axis(Axis(1))
                    .dot(&layers.w2.view().insert_axis(Axis(0)));
                let d_hidden = back * &mask * &activation.mapv(|a| 1.0 - a * a);
                let mut grad_w1 = xb.t().dot(&d_hidden);
                grad_w1.scaled_add(self.weight_decay, &layers.w1);
                let grad_b1 = d_hidden.sum_axis(Axis(0));

                layers.w1.scaled_add(-self.learning_rate, &grad_w1);
                layers.b1.scaled_add(-self.learning_rate, &grad_b1);
                layers.w2.scaled_add(-self.learning_rate, &grad_w2);
                layers.b2 -= self.learning_rate * grad_b2;
            }
            trace!("mlp epoch {} loss {:.6}", epoch, epoch_loss / x.nrows().max(1) as f64);
        }
        layers
    }
}

/// Weights of the input->hidden and hidden->output layers.
#[derive(Debug, Clone)]
struct Layers {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: f64,
}

impl Layers {
    fn glorot(inputs: usize, hidden: usize, rng: &mut ChaCha8Rng) -> Self {
        let limit_1 = (6.0 / (inputs + hidden) as f64).sqrt();
        let limit_2 = (6.0 / (hidden + 1) as f64).sqrt();
        Self {
            w1: Array2::from_shape_fn((inputs, hidden), |_| rng.random_range(-limit_1..limit_1)),
            b1: Array1::zeros(hidden),
            w2: Array1::from_shape_fn(hidden, |_| rng.random_range(-limit_2..limit_2)),
            b2: 0.0,
        }
    }

    fn hidden_activation(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (x.dot(&self.w1) + &self.b1).mapv(f64::tanh)
    }

    fn forward(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        self.hidden_activation(x).dot(&self.w2) + self.b2
    }
}

impl Predictor for MlpNetwork {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predict(&self, split: &TrainTestSplit<'_>) -> GnResult<Array1<f64>> {
        let standardizer = Standardizer::fit(split.train_x);
        let train_x = standardizer.transform(split.train_x);
        let scaler = MinMaxScaler::fit(split.train_y, -1.0, 1.0);
        let train_y = scaler.transform(split.train_y);

        let layers = self.fit(train_x.view(), &train_y, split.seed);
        let scaled = layers.forward(standardizer.transform(split.test_x).view());
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(PredictorError::TrainingFailed {
                method: Self::NAME.to_string(),
                message: format!(
                    "network diverged with learning_rate {}",
                    self.learning_rate
                ),
            }
            .into());
        }
        Ok(scaler.inverse_transform(scaled.view()))
    }
}
