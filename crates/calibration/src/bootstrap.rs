//! Bootstrap forecast calibration with the .632+ residual blend.
//!
//! Each bootstrap draw refits the model on a resample of the training rows,
//! pools the out-of-bag residuals and records a point forecast for the
//! target year. The centered point forecasts are crossed with a blend of
//! training and out-of-bag residual percentiles, weighted by the relative
//! overfitting rate, to give the calibrated forecast distribution.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use flowcast_core::{CancellationFlag, FlowcastError, Preprocessing, TrainingFrame};
use flowcast_regression::{RegressionAlgorithm, Regressor};

use crate::percentile::{grid_0_99, grid_1_99, mean, percentiles};

/// Resamples drawn per calibrated year.
pub const DEFAULT_BOOTSTRAPS: usize = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub n_bootstraps: usize,
    /// Seed for reproducible draws; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_bootstraps: DEFAULT_BOOTSTRAPS,
            seed: None,
        }
    }
}

impl BootstrapConfig {
    #[must_use]
    pub fn new(n_bootstraps: usize) -> Self {
        Self {
            n_bootstraps,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Raw output of the resampling loop, in model space.
#[derive(Debug, Clone)]
pub struct BootstrapEnsemble {
    /// Point forecasts, centered on their mean.
    pub point_forecasts: Vec<f64>,
    /// Out-of-bag residuals pooled over every draw.
    pub validation_residuals: Vec<f64>,
    /// Residuals of the full-frame fit.
    pub training_residuals: Vec<f64>,
    /// Full-frame fitted values and actuals, for the no-information error.
    pub fitted: Vec<f64>,
    pub actual: Vec<f64>,
    /// Forecast of the full-frame fit.
    pub forecast: f64,
}

/// Blend statistics reported alongside a calibrated forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub no_information_error: f64,
    pub relative_overfitting_rate: f64,
    pub weight: f64,
}

pub struct BootstrapCalibrator {
    config: BootstrapConfig,
    cancel: CancellationFlag,
}

impl BootstrapCalibrator {
    #[must_use]
    pub fn new(config: BootstrapConfig) -> Self {
        Self {
            config,
            cancel: CancellationFlag::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Generates a bootstrap resample of row indices in `[0, n)`.
    fn resample_indices(n: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    }

    /// Runs the resampling loop for `forecast_row` on `frame`.
    ///
    /// # Errors
    ///
    /// [`FlowcastError::EmptyTrainingFrame`] for an empty frame,
    /// [`FlowcastError::Cancelled`] when the cancellation flag is raised
    /// between draws, and [`FlowcastError::DegenerateFit`] (tagged with
    /// `year`) when no finite forecast can be produced.
    pub fn resample(
        &self,
        regressor: &mut RegressionAlgorithm,
        frame: &TrainingFrame,
        forecast_row: &[f64],
        year: i32,
        rng: &mut ChaCha8Rng,
    ) -> Result<BootstrapEnsemble, FlowcastError> {
        let n = frame.n_samples();
        if n == 0 {
            return Err(FlowcastError::EmptyTrainingFrame);
        }
        if forecast_row.len() != frame.n_predictors() {
            return Err(FlowcastError::DimensionMismatch {
                expected: frame.n_predictors(),
                actual: forecast_row.len(),
            });
        }

        let mut point_forecasts = Vec::with_capacity(self.config.n_bootstraps);
        let mut validation_residuals = Vec::new();

        for _ in 0..self.config.n_bootstraps {
            if self.cancel.is_cancelled() {
                return Err(FlowcastError::Cancelled);
            }

            let drawn = Self::resample_indices(n, rng);
            let in_bag: HashSet<usize> = drawn.iter().copied().collect();
            let out_of_bag: Vec<usize> = (0..n).filter(|i| !in_bag.contains(i)).collect();

            regressor.train_model(
                &frame.x.select_rows(drawn.iter()),
                &frame.y.select_rows(drawn.iter()),
            );

            if !out_of_bag.is_empty() {
                let predicted = regressor.predict(&frame.x.select_rows(out_of_bag.iter()));
                validation_residuals.extend(
                    out_of_bag
                        .iter()
                        .zip(predicted.iter())
                        .map(|(&i, p)| frame.y[i] - p)
                        .filter(|r| r.is_finite()),
                );
            }

            let point = regressor.predict_row(forecast_row);
            if point.is_finite() {
                point_forecasts.push(point);
            }
        }

        if point_forecasts.is_empty() {
            return Err(FlowcastError::DegenerateFit { year });
        }
        let center = mean(&point_forecasts);
        for p in &mut point_forecasts {
            *p -= center;
        }

        regressor.train_model(&frame.x, &frame.y);
        let fitted = regressor.predict(&frame.x);
        let forecast = regressor.predict_row(forecast_row);
        if !forecast.is_finite() || fitted.iter().any(|v| !v.is_finite()) {
            return Err(FlowcastError::DegenerateFit { year });
        }
        let training_residuals: Vec<f64> =
            frame.y.iter().zip(fitted.iter()).map(|(a, f)| a - f).collect();

        tracing::debug!(
            year,
            draws = self.config.n_bootstraps,
            usable = point_forecasts.len(),
            oob_residuals = validation_residuals.len(),
            "Bootstrap resampling complete"
        );

        Ok(BootstrapEnsemble {
            point_forecasts,
            validation_residuals,
            training_residuals,
            fitted: fitted.iter().copied().collect(),
            actual: frame.y.iter().copied().collect(),
            forecast,
        })
    }

    /// Turns an ensemble into the 99 calibrated values (levels 1..=99) in
    /// real units.
    #[must_use]
    pub fn calibrate(
        &self,
        ensemble: &BootstrapEnsemble,
        preprocessing: &Preprocessing,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<f64>, BlendWeights) {
        let grid = grid_0_99();
        let training = percentiles(&ensemble.training_residuals, &grid);
        let validation = if ensemble.validation_residuals.is_empty() {
            training.clone()
        } else {
            percentiles(&ensemble.validation_residuals, &grid)
        };

        let weights = blend_weights(ensemble, &training, &validation, rng);
        let blended: Vec<f64> = training
            .iter()
            .zip(&validation)
            .map(|(t, v)| (1.0 - weights.weight) * t + weights.weight * v)
            .collect();

        let combined: Vec<f64> = ensemble
            .point_forecasts
            .iter()
            .flat_map(|m| blended.iter().map(move |o| m + o))
            .collect();

        let mut values: Vec<f64> = percentiles(&combined, &grid_1_99())
            .into_iter()
            .map(|v| v + ensemble.forecast)
            .collect();
        preprocessing.inverse_in_place(&mut values);
        (values, weights)
    }

    /// Resamples and calibrates in one step.
    ///
    /// # Errors
    ///
    /// See [`Self::resample`]; additionally a non-finite calibrated value is
    /// reported as [`FlowcastError::DegenerateFit`].
    pub fn calibrate_frame(
        &self,
        regressor: &mut RegressionAlgorithm,
        frame: &TrainingFrame,
        forecast_row: &[f64],
        preprocessing: &Preprocessing,
        year: i32,
    ) -> Result<(Vec<f64>, BlendWeights), FlowcastError> {
        let mut rng = self.config.rng();
        let ensemble = self.resample(regressor, frame, forecast_row, year, &mut rng)?;
        let (values, weights) = self.calibrate(&ensemble, preprocessing, &mut rng);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FlowcastError::DegenerateFit { year });
        }
        Ok((values, weights))
    }
}

/// Smallest `1 - 0.368 * rate` accepted before the .632+ weight is treated
/// as having reached its pole.
const WEIGHT_POLE_TOLERANCE: f64 = 1e-9;

/// The .632+ weight `0.632 / (1 - 0.368 * rate)` from the generalization gap
/// and the no-information error.
///
/// An undefined rate (zero or non-finite denominator) counts as zero. A rate
/// at or past the pole of the weight formula puts the full weight on the
/// validation residuals.
fn blend_weights(
    ensemble: &BootstrapEnsemble,
    training: &[f64],
    validation: &[f64],
    rng: &mut ChaCha8Rng,
) -> BlendWeights {
    let mut actual = ensemble.actual.clone();
    let mut fitted = ensemble.fitted.clone();
    actual.shuffle(rng);
    fitted.shuffle(rng);
    let no_information_error = mean(
        &actual
            .iter()
            .zip(&fitted)
            .map(|(a, f)| (a - f).abs())
            .collect::<Vec<_>>(),
    );

    let gap = (mean(validation) - mean(training)).abs();
    let floor = mean(
        &training
            .iter()
            .map(|t| (no_information_error - t).abs())
            .collect::<Vec<_>>(),
    );
    let rate = gap / floor;
    let relative_overfitting_rate = if rate.is_finite() { rate } else { 0.0 };

    let denominator = 1.0 - 0.368 * relative_overfitting_rate;
    let weight = if denominator <= WEIGHT_POLE_TOLERANCE {
        tracing::debug!(
            rate = relative_overfitting_rate,
            "Overfitting rate at the .632+ pole, using validation residuals only"
        );
        1.0
    } else {
        0.632 / denominator
    };

    BlendWeights {
        no_information_error,
        relative_overfitting_rate,
        weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcast_core::{AnnualSeries, RegressionKind, SearchSettings, TrainingWindow};
    use flowcast_regression::Splitter;

    fn frame(pairs: &[(f64, f64)]) -> TrainingFrame {
        let column = |name: &str, pick: fn(&(f64, f64)) -> f64| {
            AnnualSeries::from_pairs(
                name,
                pairs.iter().enumerate().map(|(i, p)| (2000 + i as i32, pick(p))),
            )
        };
        let x = column("x", |p| p.0);
        let y = column("y", |p| p.1);
        TrainingFrame::build(&[&x], &y, &TrainingWindow::new(2000, 2100))
    }

    fn ols() -> RegressionAlgorithm {
        RegressionAlgorithm::new(
            RegressionKind::Ols,
            Splitter::LeaveOneOut,
            &SearchSettings::default(),
        )
    }

    fn noisy_line() -> TrainingFrame {
        let noise = [0.3, -0.2, 0.5, -0.4, 0.1, -0.6, 0.2, 0.4, -0.1, -0.3, 0.6, -0.5];
        let pairs: Vec<(f64, f64)> = noise
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let x = i as f64;
                (x, 2.0 + 1.5 * x + e)
            })
            .collect();
        frame(&pairs)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    #[test]
    fn config_defaults_and_seed() {
        let config = BootstrapConfig::default();
        assert_eq!(config.n_bootstraps, 300);
        assert!(config.seed.is_none());
        assert_eq!(BootstrapConfig::new(10).with_seed(3).seed, Some(3));
    }

    #[test]
    fn resample_indices_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let idx = BootstrapCalibrator::resample_indices(7, &mut rng);
        assert_eq!(idx.len(), 7);
        assert!(idx.iter().all(|&i| i < 7));
    }

    // =========================================================================
    // Calibration
    // =========================================================================

    #[test]
    fn calibrated_values_are_monotone_and_bracket_forecast() {
        let calibrator = BootstrapCalibrator::new(BootstrapConfig::new(200).with_seed(9));
        let mut model = ols();

        let (values, weights) = calibrator
            .calibrate_frame(&mut model, &noisy_line(), &[6.0], &Preprocessing::None, 2030)
            .expect("calibrates");

        assert_eq!(values.len(), 99);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        let point = 2.0 + 1.5 * 6.0;
        assert!(values[0] < point && point < values[98]);
        assert!((values[49] - point).abs() < 1.0);
        assert!(weights.weight.is_finite() && weights.weight >= 0.632);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let calibrator = BootstrapCalibrator::new(BootstrapConfig::new(50).with_seed(4));
        let a = calibrator
            .calibrate_frame(&mut ols(), &noisy_line(), &[3.0], &Preprocessing::None, 2030)
            .expect("calibrates");
        let b = calibrator
            .calibrate_frame(&mut ols(), &noisy_line(), &[3.0], &Preprocessing::None, 2030)
            .expect("calibrates");
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn inverse_transform_is_applied() {
        let calibrator = BootstrapCalibrator::new(BootstrapConfig::new(50).with_seed(4));
        let (values, _) = calibrator
            .calibrate_frame(&mut ols(), &noisy_line(), &[3.0], &Preprocessing::NaturalLog, 2030)
            .expect("calibrates");
        assert!(values.iter().all(|v| *v > 0.0));
        assert!((values[49].ln() - 6.5).abs() < 1.0);
    }

    #[test]
    fn cancellation_stops_resampling() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let calibrator = BootstrapCalibrator::new(BootstrapConfig::new(10).with_seed(1))
            .with_cancellation(cancel);

        let result =
            calibrator.calibrate_frame(&mut ols(), &noisy_line(), &[1.0], &Preprocessing::None, 2030);

        assert_eq!(result.unwrap_err(), FlowcastError::Cancelled);
    }

    #[test]
    fn empty_frame_and_bad_row_are_errors() {
        let calibrator = BootstrapCalibrator::new(BootstrapConfig::new(10).with_seed(1));
        let empty = frame(&[]);
        assert_eq!(
            calibrator
                .calibrate_frame(&mut ols(), &empty, &[1.0], &Preprocessing::None, 2030)
                .unwrap_err(),
            FlowcastError::EmptyTrainingFrame
        );
        assert!(matches!(
            calibrator.calibrate_frame(&mut ols(), &noisy_line(), &[1.0, 2.0], &Preprocessing::None, 2030),
            Err(FlowcastError::DimensionMismatch { .. })
        ));
    }

    // =========================================================================
    // .632+ blend weights
    // =========================================================================

    fn ensemble(actual: Vec<f64>, fitted: Vec<f64>) -> BootstrapEnsemble {
        BootstrapEnsemble {
            point_forecasts: vec![0.0],
            validation_residuals: vec![0.0],
            training_residuals: vec![0.0],
            fitted,
            actual,
            forecast: 0.0,
        }
    }

    #[test]
    fn blend_weight_matches_hand_computed_values() {
        // |0 - 1| for every permutation, so the no-information error is 1
        let ensemble = ensemble(vec![0.0, 0.0], vec![1.0, 1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let training = vec![0.0; 100];
        let validation = vec![1.5; 100];

        let w = blend_weights(&ensemble, &training, &validation, &mut rng);

        assert!((w.no_information_error - 1.0).abs() < 1e-12);
        assert!((w.relative_overfitting_rate - 1.5).abs() < 1e-12);
        assert!((w.weight - 0.632 / (1.0 - 0.368 * 1.5)).abs() < 1e-12);
        assert!((w.weight - 1.410_714_285_714_285_8).abs() < 1e-12);
    }

    #[test]
    fn blend_weight_small_gap() {
        let ensemble = ensemble(vec![0.0, 0.0], vec![2.0, 2.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let training = vec![0.0; 100];
        let validation = vec![0.5; 100];

        let w = blend_weights(&ensemble, &training, &validation, &mut rng);

        // gap 0.5 over floor |2 - 0| = 2
        assert!((w.relative_overfitting_rate - 0.25).abs() < 1e-12);
        assert!((w.weight - 0.632 / 0.908).abs() < 1e-12);
    }

    #[test]
    fn blend_weight_at_pole_uses_validation_only() {
        let ensemble = ensemble(vec![0.0, 0.0], vec![1.0, 1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let training = vec![0.0; 100];
        let validation = vec![3.0; 100];

        let w = blend_weights(&ensemble, &training, &validation, &mut rng);

        assert!((w.relative_overfitting_rate - 3.0).abs() < 1e-12);
        assert_eq!(w.weight, 1.0);
    }

    #[test]
    fn undefined_blend_rate_counts_as_zero() {
        let ensemble = BootstrapEnsemble {
            point_forecasts: vec![0.0],
            validation_residuals: vec![10.0],
            training_residuals: vec![0.0],
            fitted: vec![1.0, 1.0],
            actual: vec![1.0, 1.0],
            forecast: 0.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let training = vec![0.0; 100];
        let validation = vec![10.0; 100];

        let w = blend_weights(&ensemble, &training, &validation, &mut rng);

        // zero no-information error makes the floor zero, so the rate is undefined
        assert_eq!(w.relative_overfitting_rate, 0.0);
        assert!((w.weight - 0.632).abs() < 1e-12);
    }
}
