use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Linearly maps a target onto `[low, high]` using the training range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    data_min: f64,
    scale: f64,
    low: f64,
}

impl MinMaxScaler {
    pub fn fit(values: ArrayView1<'_, f64>, low: f64, high: f64) -> Self {
        let data_min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let data_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = data_max - data_min;
        // A constant target maps onto `low`.
        let scale = if range.is_finite() && range > 0.0 {
            (high - low) / range
        } else {
            1.0
        };
        Self {
            data_min: if data_min.is_finite() { data_min } else { 0.0 },
            scale,
            low,
        }
    }

    pub fn transform(&self, values: ArrayView1<'_, f64>) -> Array1<f64> {
        values.mapv(|v| self.low + (v - self.data_min) * self.scale)
    }

    pub fn inverse_transform(&self, values: ArrayView1<'_, f64>) -> Array1<f64> {
        values.mapv(|v| (v - self.low) / self.scale + self.data_min)
    }
}

/// Centers and scales each column to unit variance using training statistics.
/// Constant columns are only centered.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl Standardizer {
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let scale = x
            .axis_iter(Axis(1))
            .zip(mean.iter())
            .map(|(column, m)| {
                let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
                if var > f64::EPSILON {
                    var.sqrt()
                } else {
                    1.0
                }
            })
            .collect();
        Self { mean, scale }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }
}
