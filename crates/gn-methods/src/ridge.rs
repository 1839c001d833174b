use gn_types::{GnResult, ParameterSet, Predictor, TrainTestSplit};
use ndarray::Array1;

use crate::scaling::Standardizer;
use crate::solver::fit_least_squares;
use crate::{require_at_least, require_range};

/// Ridge regression on standardized markers, the linear baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub epochs: usize,
    pub learning_rate: f64,
}

impl RidgeRegression {
    pub const NAME: &'static str = "ridge";

    pub fn from_params(params: &ParameterSet) -> GnResult<Self> {
        let alpha = params.f64_or("alpha", 1.0)?;
        require_at_least("alpha", alpha, 0.0)?;
        let epochs = params.usize_or("epochs", 500)?;
        require_at_least("epochs", epochs as f64, 1.0)?;
        let learning_rate = params.f64_or("learning_rate", 1.0)?;
        require_range("learning_rate", learning_rate, 0.0, 1.0)?;
        Ok(Self {
            alpha,
            epochs,
            learning_rate,
        })
    }
}

impl Predictor for RidgeRegression {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predict(&self, split: &TrainTestSplit<'_>) -> GnResult<Array1<f64>> {
        let standardizer = Standardizer::fit(split.train_x);
        let train_x = standardizer.transform(split.train_x);
        let n = train_x.nrows().max(1) as f64;

        let fit = fit_least_squares(
            train_x.view(),
            split.train_y,
            self.alpha / n,
            self.epochs,
            self.learning_rate,
        );
        Ok(fit.predict(standardizer.transform(split.test_x).view()))
    }
}
