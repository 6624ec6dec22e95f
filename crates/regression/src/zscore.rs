//! Composite z-score regression.
//!
//! Each predictor is standardized and weighted by its own squared
//! correlation with the target; the weighted mean of the z-scores forms a
//! single composite index, and the target is regressed on that index. The
//! fit is expressed as per-predictor slopes so prediction never needs the
//! composite again.

use nalgebra::{DMatrix, DVector};

use flowcast_core::RegressionKind;

use crate::cross_validation::Splitter;
use crate::linalg;
use crate::ols::fit_linear;
use crate::regressor::{LinearModel, Regressor};

#[derive(Debug, Clone)]
pub struct ZScoreRegressor {
    splitter: Splitter,
    model: LinearModel,
    weights: Vec<f64>,
}

impl ZScoreRegressor {
    #[must_use]
    pub fn new(splitter: Splitter) -> Self {
        Self {
            splitter,
            model: LinearModel::nan(0),
            weights: Vec::new(),
        }
    }

    /// Per-predictor R² weights from the latest fit.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<(LinearModel, Vec<f64>)> {
        let (n, p) = x.shape();
        if p == 0 || n < 2 || y.len() != n {
            return None;
        }

        let means = linalg::column_means(x);
        let stds = linalg::column_stds(x, &means);

        let weights: Vec<f64> = x
            .column_iter()
            .zip(&stds)
            .map(|(col, std)| {
                if !std.is_finite() || *std == 0.0 {
                    return 0.0;
                }
                let col: Vec<f64> = col.iter().copied().collect();
                let r2 = linalg::pairwise_r2(&col, y.as_slice());
                if r2.is_finite() {
                    r2
                } else {
                    0.0
                }
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return None;
        }

        let composite = DMatrix::from_fn(n, 1, |r, _| {
            (0..p)
                .filter(|&c| weights[c] > 0.0)
                .map(|c| weights[c] * (x[(r, c)] - means[c]) / stds[c])
                .sum::<f64>()
                / total
        });
        let fit = fit_linear(&composite, y);
        if !fit.is_finite() {
            return None;
        }

        let beta = fit.slopes[0];
        let slopes: Vec<f64> = (0..p)
            .map(|c| {
                if weights[c] > 0.0 {
                    beta * weights[c] / (stds[c] * total)
                } else {
                    0.0
                }
            })
            .collect();
        let intercept = fit.intercept - slopes.iter().zip(&means).map(|(b, m)| b * m).sum::<f64>();

        Some((LinearModel { intercept, slopes }, weights))
    }
}

impl Regressor for ZScoreRegressor {
    fn train_model(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) {
        match Self::fit(x, y) {
            Some((model, weights)) => {
                self.model = model;
                self.weights = weights;
            }
            None => {
                tracing::trace!(rows = x.nrows(), cols = x.ncols(), "z-score fit is degenerate");
                self.model = LinearModel::nan(x.ncols());
                self.weights = vec![f64::NAN; x.ncols()];
            }
        }
    }

    fn coefficients(&self) -> &LinearModel {
        &self.model
    }

    fn splitter(&self) -> Splitter {
        self.splitter
    }

    fn kind(&self) -> RegressionKind {
        RegressionKind::ZScore
    }
}
