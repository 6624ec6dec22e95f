//! Goodness-of-fit metrics over out-of-fold predictions.
//!
//! Every metric returns NaN when it is undefined for its input (empty
//! vectors, zero target variance, no residual degrees of freedom). NaN never
//! compares better than any other score.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use flowcast_core::ScoringKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDirection {
    Maximize,
    Minimize,
}

impl ScoreDirection {
    /// True when `new` strictly improves on `old`. A NaN `new` never
    /// improves; any finite `new` improves on a NaN `old`.
    #[must_use]
    pub fn is_better(self, new: f64, old: f64) -> bool {
        if new.is_nan() {
            return false;
        }
        if old.is_nan() {
            return true;
        }
        match self {
            Self::Maximize => new > old,
            Self::Minimize => new < old,
        }
    }

    /// A value every finite score improves on.
    #[must_use]
    pub fn worst(self) -> f64 {
        match self {
            Self::Maximize => f64::NEG_INFINITY,
            Self::Minimize => f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scorer {
    kind: ScoringKind,
}

impl From<ScoringKind> for Scorer {
    fn from(kind: ScoringKind) -> Self {
        Self { kind }
    }
}

impl Scorer {
    #[must_use]
    pub fn new(kind: ScoringKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn kind(&self) -> ScoringKind {
        self.kind
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.kind {
            ScoringKind::R2 => "R2",
            ScoringKind::AdjustedR2 => "Adjusted R2",
            ScoringKind::Mse => "Mean Squared Error",
            ScoringKind::Rmse => "Root Mean Squared Error",
            ScoringKind::MeanError => "Mean Error",
            ScoringKind::MeanAbsoluteError => "Mean Absolute Error",
            ScoringKind::NashSutcliffe => "Nash-Sutcliffe Efficiency",
            ScoringKind::Aic => "AIC",
            ScoringKind::Aicc => "AICc",
        }
    }

    #[must_use]
    pub fn direction(&self) -> ScoreDirection {
        match self.kind {
            ScoringKind::R2 | ScoringKind::AdjustedR2 | ScoringKind::NashSutcliffe => {
                ScoreDirection::Maximize
            }
            ScoringKind::Mse
            | ScoringKind::Rmse
            | ScoringKind::MeanError
            | ScoringKind::MeanAbsoluteError
            | ScoringKind::Aic
            | ScoringKind::Aicc => ScoreDirection::Minimize,
        }
    }

    /// The value the search optimizes. Identical to the score except for
    /// mean signed error, which is minimized on its magnitude.
    #[must_use]
    pub fn objective(&self, score: f64) -> f64 {
        match self.kind {
            ScoringKind::MeanError => score.abs(),
            _ => score,
        }
    }

    /// Scores `predicted` against `actual` for a model with `n_predictors`
    /// slopes.
    #[must_use]
    pub fn score(&self, predicted: &DVector<f64>, actual: &DVector<f64>, n_predictors: usize) -> f64 {
        let n = actual.len();
        if n == 0 || predicted.len() != n {
            return f64::NAN;
        }
        match self.kind {
            ScoringKind::R2 | ScoringKind::NashSutcliffe => r2(predicted, actual),
            ScoringKind::AdjustedR2 => adjusted_r2(predicted, actual, n_predictors),
            ScoringKind::Mse => sse(predicted, actual) / n as f64,
            ScoringKind::Rmse => (sse(predicted, actual) / n as f64).sqrt(),
            ScoringKind::MeanError => (actual - predicted).mean(),
            ScoringKind::MeanAbsoluteError => (actual - predicted).abs().mean(),
            ScoringKind::Aic => aic(predicted, actual, n_predictors),
            ScoringKind::Aicc => aicc(predicted, actual, n_predictors),
        }
    }
}

fn sse(predicted: &DVector<f64>, actual: &DVector<f64>) -> f64 {
    (actual - predicted).norm_squared()
}

fn r2(predicted: &DVector<f64>, actual: &DVector<f64>) -> f64 {
    let mean = actual.mean();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    1.0 - sse(predicted, actual) / ss_tot
}

fn adjusted_r2(predicted: &DVector<f64>, actual: &DVector<f64>, p: usize) -> f64 {
    let n = actual.len();
    if n <= p + 1 {
        return f64::NAN;
    }
    let dof = (n - p - 1) as f64;
    1.0 - (1.0 - r2(predicted, actual)) * (n - 1) as f64 / dof
}

fn aic(predicted: &DVector<f64>, actual: &DVector<f64>, p: usize) -> f64 {
    let sse = sse(predicted, actual);
    if sse <= 0.0 {
        return f64::NAN;
    }
    2.0 * p as f64 + actual.len() as f64 * sse.ln()
}

fn aicc(predicted: &DVector<f64>, actual: &DVector<f64>, p: usize) -> f64 {
    let n = actual.len();
    if n <= p + 1 {
        return f64::NAN;
    }
    let k = p as f64;
    aic(predicted, actual, p) + (2.0 * k * k + 2.0 * k) / (n - p - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f64]) -> DVector<f64> {
        DVector::from_row_slice(values)
    }

    fn score(kind: ScoringKind, pred: &[f64], actual: &[f64], p: usize) -> f64 {
        Scorer::new(kind).score(&v(pred), &v(actual), p)
    }

    // =========================================================================
    // Metric values
    // =========================================================================

    #[test]
    fn perfect_prediction() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((score(ScoringKind::R2, &a, &a, 1) - 1.0).abs() < 1e-12);
        assert_eq!(score(ScoringKind::Mse, &a, &a, 1), 0.0);
        assert_eq!(score(ScoringKind::MeanError, &a, &a, 1), 0.0);
        // log of zero error is undefined
        assert!(score(ScoringKind::Aic, &a, &a, 1).is_nan());
    }

    #[test]
    fn error_metrics() {
        let pred = [1.0, 2.0, 3.0, 4.0];
        let actual = [2.0, 2.0, 1.0, 4.0];
        // residuals: 1, 0, -2, 0
        assert!((score(ScoringKind::Mse, &pred, &actual, 1) - 1.25).abs() < 1e-12);
        assert!((score(ScoringKind::Rmse, &pred, &actual, 1) - 1.25_f64.sqrt()).abs() < 1e-12);
        assert!((score(ScoringKind::MeanError, &pred, &actual, 1) + 0.25).abs() < 1e-12);
        assert!((score(ScoringKind::MeanAbsoluteError, &pred, &actual, 1) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn r2_against_mean() {
        let actual = [1.0, 2.0, 3.0];
        let pred = [2.0, 2.0, 2.0];
        assert!(score(ScoringKind::R2, &pred, &actual, 1).abs() < 1e-12);
        assert_eq!(
            score(ScoringKind::NashSutcliffe, &pred, &actual, 1),
            score(ScoringKind::R2, &pred, &actual, 1)
        );
    }

    #[test]
    fn adjusted_r2_penalizes_predictors() {
        let actual = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let pred = [1.2, 1.8, 3.1, 4.2, 4.9, 5.7];
        let plain = score(ScoringKind::R2, &pred, &actual, 2);
        let adj = score(ScoringKind::AdjustedR2, &pred, &actual, 2);
        assert!(adj < plain);
        assert!((adj - (1.0 - (1.0 - plain) * 5.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn adjusted_r2_without_degrees_of_freedom_is_nan() {
        let a = [1.0, 2.0, 3.0];
        assert!(score(ScoringKind::AdjustedR2, &a, &a, 2).is_nan());
        assert!(score(ScoringKind::Aicc, &[1.0, 2.0, 3.5], &a, 2).is_nan());
    }

    #[test]
    fn aic_and_aicc() {
        let pred = [1.0, 2.0, 3.0, 4.0, 5.0];
        let actual = [2.0, 2.0, 3.0, 4.0, 5.0];
        let aic = score(ScoringKind::Aic, &pred, &actual, 1);
        assert!((aic - 2.0).abs() < 1e-12); // 2p + n ln(1)
        let aicc = score(ScoringKind::Aicc, &pred, &actual, 1);
        assert!((aicc - (2.0 + 4.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn empty_or_mismatched_is_nan() {
        assert!(score(ScoringKind::R2, &[], &[], 0).is_nan());
        assert!(score(ScoringKind::Mse, &[1.0], &[1.0, 2.0], 0).is_nan());
        assert!(score(ScoringKind::R2, &[1.0, 1.0], &[2.0, 2.0], 0).is_nan());
    }

    // =========================================================================
    // Direction
    // =========================================================================

    #[test]
    fn directions() {
        assert_eq!(Scorer::new(ScoringKind::R2).direction(), ScoreDirection::Maximize);
        assert_eq!(Scorer::new(ScoringKind::Mse).direction(), ScoreDirection::Minimize);
        assert_eq!(Scorer::new(ScoringKind::MeanError).direction(), ScoreDirection::Minimize);
        assert_eq!(Scorer::new(ScoringKind::MeanError).objective(-0.3), 0.3);
    }

    #[test]
    fn nan_never_better() {
        for dir in [ScoreDirection::Maximize, ScoreDirection::Minimize] {
            assert!(!dir.is_better(f64::NAN, 0.0));
            assert!(!dir.is_better(f64::NAN, f64::NAN));
            assert!(dir.is_better(0.0, f64::NAN));
            assert!(dir.is_better(0.0, dir.worst()));
        }
        assert!(ScoreDirection::Maximize.is_better(2.0, 1.0));
        assert!(ScoreDirection::Minimize.is_better(1.0, 2.0));
        assert!(!ScoreDirection::Minimize.is_better(1.0, 1.0));
    }
}
