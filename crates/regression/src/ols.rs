//! Ordinary least squares on the intercept-augmented design matrix.

use nalgebra::{DMatrix, DVector};

use flowcast_core::RegressionKind;

use crate::cross_validation::Splitter;
use crate::linalg;
use crate::regressor::{LinearModel, Regressor};

#[derive(Debug, Clone)]
pub struct OlsRegressor {
    splitter: Splitter,
    model: LinearModel,
}

impl OlsRegressor {
    #[must_use]
    pub fn new(splitter: Splitter) -> Self {
        Self {
            splitter,
            model: LinearModel::nan(0),
        }
    }
}

/// `beta = pinv(X'X) X'y` with an intercept column; NaN when the augmented
/// design is ill-conditioned.
#[must_use]
pub fn fit_linear(x: &DMatrix<f64>, y: &DVector<f64>) -> LinearModel {
    let p = x.ncols();
    if x.nrows() == 0 || x.nrows() != y.len() || y.iter().any(|v| !v.is_finite()) {
        return LinearModel::nan(p);
    }

    let beta = linalg::least_squares(&linalg::augment(x), y);
    LinearModel {
        intercept: beta[0],
        slopes: beta.iter().skip(1).copied().collect(),
    }
}

impl Regressor for OlsRegressor {
    fn train_model(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) {
        self.model = fit_linear(x, y);
        if !self.model.is_finite() {
            tracing::trace!(rows = x.nrows(), cols = x.ncols(), "OLS fit is ill-conditioned");
        }
    }

    fn coefficients(&self) -> &LinearModel {
        &self.model
    }

    fn splitter(&self) -> Splitter {
        self.splitter
    }

    fn kind(&self) -> RegressionKind {
        RegressionKind::Ols
    }
}
