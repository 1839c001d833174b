//! Gradient descent for L2-penalized least squares, shared by the ridge
//! baseline and the RBF output layer.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A fitted linear map `x . weights + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub weights: Array1<f64>,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.intercept
    }
}

/// Estimate the largest eigenvalue of `x^T x / n` by power iteration.
fn spectral_bound(x: ArrayView2<'_, f64>, iterations: usize) -> f64 {
    let n = x.nrows().max(1) as f64;
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let mut v: Array1<f64> = (0..x.ncols()).map(|_| rng.random_range(-1.0..1.0)).collect();
    let mut estimate = 0.0;
    for _ in 0..iterations {
        let norm = v.dot(&v).sqrt();
        if norm <= f64::EPSILON {
            return 0.0;
        }
        v /= norm;
        let w = x.t().dot(&x.dot(&v)) / n;
        estimate = v.dot(&w);
        v = w;
    }
    estimate
}

/// Minimize `1/(2n) |x w + b - y|^2 + l2/2 |w|^2` by full-batch gradient
/// descent.
///
/// `learning_rate` is relative to the largest stable step, so values in
/// `(0, 1]` always converge.
pub fn fit_least_squares(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    l2: f64,
    epochs: usize,
    learning_rate: f64,
) -> LinearFit {
    let n = x.nrows().max(1) as f64;
    let Some(x_mean) = x.mean_axis(Axis(0)) else {
        return LinearFit {
            weights: Array1::zeros(x.ncols()),
            intercept: 0.0,
        };
    };
    let y_mean = y.mean().unwrap_or(0.0);
    let xc = &x - &x_mean;
    let yc = &y - y_mean;

    // Margin over the power-iteration estimate, which approaches from below.
    let lipschitz = 1.5 * spectral_bound(xc.view(), 30) + l2;
    let step = if lipschitz > f64::EPSILON {
        learning_rate / lipschitz
    } else {
        0.0
    };

    let mut weights = Array1::<f64>::zeros(x.ncols());
    for _ in 0..epochs {
        let residual = xc.dot(&weights) - &yc;
        let mut gradient = xc.t().dot(&residual) / n;
        gradient.scaled_add(l2, &weights);
        weights.scaled_add(-step, &gradient);
    }

    let intercept = y_mean - x_mean.dot(&weights);
    LinearFit { weights, intercept }
}
