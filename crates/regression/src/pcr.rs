//! Principal-components regression.
//!
//! Predictors are standardized, projected onto the leading eigenvectors of
//! their covariance until the cumulative variance share reaches the
//! configured threshold, and the target is regressed on those components.
//! The component coefficients are then folded back into one slope per
//! original predictor so predictions run directly on raw values.

use nalgebra::{DMatrix, DVector};

use flowcast_core::RegressionKind;

use crate::cross_validation::Splitter;
use crate::linalg;
use crate::ols::fit_linear;
use crate::regressor::{LinearModel, Regressor};

#[derive(Debug, Clone)]
pub struct PcrRegressor {
    splitter: Splitter,
    variance_threshold: f64,
    model: LinearModel,
    n_components: usize,
}

impl PcrRegressor {
    #[must_use]
    pub fn new(splitter: Splitter, variance_threshold: f64) -> Self {
        Self {
            splitter,
            variance_threshold,
            model: LinearModel::nan(0),
            n_components: 0,
        }
    }

    /// Components retained by the latest fit; zero after a failed fit.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Option<(LinearModel, usize)> {
        let (n, p) = x.shape();
        if p == 0 || n < 2 || y.len() != n {
            return None;
        }

        let means = linalg::column_means(x);
        let stds = linalg::column_stds(x, &means);
        if stds.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return None;
        }

        let z = linalg::standardize(x, &means, &stds);
        let (eigenvalues, eigenvectors) = linalg::sorted_eigen(&linalg::covariance(&z))?;
        let k = retained_components(&eigenvalues, self.variance_threshold);

        let basis = eigenvectors.columns(0, k).into_owned();
        let components = &z * &basis;
        let pc_model = fit_linear(&components, y);
        if !pc_model.is_finite() {
            return None;
        }

        // slope_j = sum_c V[j, c] * beta_c / std_j
        let beta = DVector::from_column_slice(&pc_model.slopes);
        let weights = &basis * beta;
        let slopes: Vec<f64> = weights.iter().zip(&stds).map(|(w, s)| w / s).collect();
        let intercept =
            pc_model.intercept - slopes.iter().zip(&means).map(|(b, m)| b * m).sum::<f64>();

        Some((LinearModel { intercept, slopes }, k))
    }
}

/// Smallest leading count whose cumulative share of the eigenvalue sum meets
/// `threshold`, clamped to the number of eigenvalues.
fn retained_components(eigenvalues: &[f64], threshold: f64) -> usize {
    let total: f64 = eigenvalues.iter().sum();
    if total <= 0.0 {
        return eigenvalues.len().min(1);
    }
    let mut cumulative = 0.0;
    for (i, value) in eigenvalues.iter().enumerate() {
        cumulative += value;
        if cumulative / total >= threshold {
            return i + 1;
        }
    }
    eigenvalues.len()
}

impl Regressor for PcrRegressor {
    fn train_model(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) {
        match self.fit(x, y) {
            Some((model, k)) => {
                self.model = model;
                self.n_components = k;
            }
            None => {
                tracing::trace!(rows = x.nrows(), cols = x.ncols(), "PCR fit is degenerate");
                self.model = LinearModel::nan(x.ncols());
                self.n_components = 0;
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
        RegressionKind::Pcr
    }
}
