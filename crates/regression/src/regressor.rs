use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use flowcast_core::{RegressionKind, SearchSettings};

use crate::cross_validation::{rows_where, Splitter};
use crate::ols::OlsRegressor;
use crate::pcr::PcrRegressor;
use crate::zscore::ZScoreRegressor;

/// Intercept plus one slope per predictor, always in original predictor
/// units regardless of how the family fitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub slopes: Vec<f64>,
}

impl LinearModel {
    /// The soft-failure model: every coefficient NaN.
    #[must_use]
    pub fn nan(n_predictors: usize) -> Self {
        Self {
            intercept: f64::NAN,
            slopes: vec![f64::NAN; n_predictors],
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.slopes.iter().all(|s| s.is_finite())
    }

    /// Predictions for each row of `x`. A column count that does not match
    /// the slopes yields NaN for every row.
    #[must_use]
    pub fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        if x.ncols() != self.slopes.len() {
            return DVector::from_element(x.nrows(), f64::NAN);
        }
        let slopes = DVector::from_column_slice(&self.slopes);
        (x * slopes).add_scalar(self.intercept)
    }

    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if row.len() != self.slopes.len() {
            return f64::NAN;
        }
        self.intercept + row.iter().zip(&self.slopes).map(|(x, b)| x * b).sum::<f64>()
    }
}

/// A regression family bound to a cross-validation splitter.
pub trait Regressor {
    /// Fits on `x`/`y`, replacing any previous coefficients. Fits that cannot
    /// be computed reliably store NaN coefficients instead of failing.
    fn train_model(&mut self, x: &DMatrix<f64>, y: &DVector<f64>);

    /// Coefficients from the latest `train_model` call.
    fn coefficients(&self) -> &LinearModel;

    fn splitter(&self) -> Splitter;

    fn kind(&self) -> RegressionKind;

    fn predict(&self, x: &DMatrix<f64>) -> DVector<f64> {
        self.coefficients().predict(x)
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.coefficients().predict_row(row)
    }

    /// Out-of-fold predictions and matching actuals, concatenated in fold
    /// order. The model is refitted on all rows afterwards.
    fn cross_val_predict(
        &mut self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> (DVector<f64>, DVector<f64>) {
        let mut predicted = Vec::with_capacity(y.len());
        let mut actual = Vec::with_capacity(y.len());

        for mask in self.splitter().split(y.len()) {
            let test = rows_where(&mask, false);
            if test.is_empty() {
                continue;
            }
            let train = rows_where(&mask, true);

            self.train_model(&x.select_rows(train.iter()), &y.select_rows(train.iter()));
            let fold_pred = self.predict(&x.select_rows(test.iter()));

            predicted.extend(fold_pred.iter().copied());
            actual.extend(test.iter().map(|&i| y[i]));
        }

        self.train_model(x, y);
        (DVector::from_vec(predicted), DVector::from_vec(actual))
    }

    /// One flag per predictor: true when its fitted slope is non-negative.
    /// NaN slopes report false.
    fn is_positive_corr(&self) -> Vec<bool> {
        self.coefficients().slopes.iter().map(|s| *s >= 0.0).collect()
    }
}

/// The closed set of regression families, selected by [`RegressionKind`].
#[derive(Debug, Clone)]
pub enum RegressionAlgorithm {
    Ols(OlsRegressor),
    Pcr(PcrRegressor),
    ZScore(ZScoreRegressor),
}

impl RegressionAlgorithm {
    #[must_use]
    pub fn new(kind: RegressionKind, splitter: Splitter, settings: &SearchSettings) -> Self {
        match kind {
            RegressionKind::Ols => Self::Ols(OlsRegressor::new(splitter)),
            RegressionKind::Pcr => Self::Pcr(PcrRegressor::new(
                splitter,
                settings.pc_variance_threshold,
            )),
            RegressionKind::ZScore => Self::ZScore(ZScoreRegressor::new(splitter)),
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Self::Ols(r) => r,
            Self::Pcr(r) => r,
            Self::ZScore(r) => r,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Self::Ols(r) => r,
            Self::Pcr(r) => r,
            Self::ZScore(r) => r,
        }
    }
}

impl Regressor for RegressionAlgorithm {
    fn train_model(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) {
        self.inner_mut().train_model(x, y);
    }

    fn coefficients(&self) -> &LinearModel {
        self.inner().coefficients()
    }

    fn splitter(&self) -> Splitter {
        self.inner().splitter()
    }

    fn kind(&self) -> RegressionKind {
        self.inner().kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // LinearModel
    // =========================================================================

    #[test]
    fn linear_model_predicts_rows() {
        let model = LinearModel {
            intercept: 1.0,
            slopes: vec![2.0, -1.0],
        };
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 3.0, 0.0]);

        let y = model.predict(&x);

        assert_eq!(y.as_slice(), &[2.0, 7.0]);
        assert_eq!(model.predict_row(&[3.0, 0.0]), 7.0);
    }

    #[test]
    fn linear_model_width_mismatch_is_nan() {
        let model = LinearModel {
            intercept: 0.0,
            slopes: vec![1.0],
        };
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);

        assert!(model.predict(&x)[0].is_nan());
        assert!(model.predict_row(&[1.0, 2.0]).is_nan());
    }

    #[test]
    fn nan_model_is_not_finite_and_not_positive() {
        let r = OlsRegressor::new(Splitter::LeaveOneOut);
        assert!(!LinearModel::nan(2).is_finite());
        // untrained regressor holds the NaN model
        assert!(r.is_positive_corr().is_empty());
    }

    // =========================================================================
    // Factory and cross_val_predict
    // =========================================================================

    fn line_data() -> (DMatrix<f64>, DVector<f64>) {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = DMatrix::from_column_slice(6, 1, &xs);
        let y = DVector::from_iterator(6, xs.iter().map(|v| 10.0 + 0.5 * v));
        (x, y)
    }

    #[test]
    fn factory_builds_each_family() {
        let settings = SearchSettings::default();
        for kind in [RegressionKind::Ols, RegressionKind::Pcr, RegressionKind::ZScore] {
            let r = RegressionAlgorithm::new(kind, Splitter::KFold { k: 3 }, &settings);
            assert_eq!(r.kind(), kind);
            assert_eq!(r.splitter(), Splitter::KFold { k: 3 });
        }
    }

    #[test]
    fn cross_val_predict_covers_every_sample_and_refits() {
        let (x, y) = line_data();
        let mut r = RegressionAlgorithm::new(
            RegressionKind::Ols,
            Splitter::KFold { k: 3 },
            &SearchSettings::default(),
        );

        let (pred, actual) = r.cross_val_predict(&x, &y);

        assert_eq!(pred.len(), 6);
        assert_eq!(actual.as_slice(), y.as_slice());
        for (p, a) in pred.iter().zip(actual.iter()) {
            assert!((p - a).abs() < 1e-9);
        }
        let model = r.coefficients();
        assert!((model.intercept - 10.0).abs() < 1e-9);
        assert!((model.slopes[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn cross_val_predict_skips_empty_folds() {
        let (x, y) = line_data();
        let mut r = OlsRegressor::new(Splitter::KFold { k: 10 });

        let (pred, actual) = r.cross_val_predict(&x, &y);

        assert_eq!(pred.len(), 6);
        assert_eq!(actual.len(), 6);
    }
}
