//! Year-level forecast calibration for a finalized model.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use flowcast_core::{
    frame::row_for, AnnualSeries, CancellationFlag, CrossValidationKind, Dataset, FlowcastError,
    ForecastProblem, Preprocessing, RegressionKind, TrainingFrame,
};
use flowcast_regression::RegressionAlgorithm;

use crate::bootstrap::{BlendWeights, BootstrapCalibrator, BootstrapConfig};
use crate::distribution::ForecastDistribution;

/// A chosen model: fixed predictors plus the regression family that fits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    pub predictors: Vec<String>,
    pub regression: RegressionKind,
    pub cross_validation: CrossValidationKind,
}

impl ForecastModel {
    #[must_use]
    pub fn new(
        predictors: Vec<String>,
        regression: RegressionKind,
        cross_validation: CrossValidationKind,
    ) -> Self {
        Self {
            predictors,
            regression,
            cross_validation,
        }
    }
}

/// Per-year outcome of a batch calibration.
#[derive(Debug, Clone, Default)]
pub struct CalibrationReport {
    pub completed: Vec<(i32, BlendWeights)>,
    pub skipped: Vec<(i32, FlowcastError)>,
    pub cancelled: bool,
}

pub struct ForecastCalibrator<'a> {
    problem: &'a ForecastProblem,
    dataset: &'a Dataset,
    cancel: CancellationFlag,
}

impl<'a> ForecastCalibrator<'a> {
    #[must_use]
    pub fn new(problem: &'a ForecastProblem, dataset: &'a Dataset) -> Self {
        Self {
            problem,
            dataset,
            cancel: CancellationFlag::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn bootstrap_config(&self, year: i32) -> BootstrapConfig {
        let settings = &self.problem.settings;
        let config = BootstrapConfig::new(settings.n_bootstraps);
        match settings.seed {
            Some(seed) => config.with_seed(seed.wrapping_add(year as u64)),
            None => config,
        }
    }

    /// Calibrates one year and returns the 99 values for levels 1..=99.
    ///
    /// The forecast year is removed from the training rows before fitting.
    ///
    /// # Errors
    ///
    /// [`FlowcastError::MissingData`] when a predictor has no value in
    /// `year`, [`FlowcastError::UnknownSeries`] for unresolved names, and the
    /// errors of [`BootstrapCalibrator::calibrate_frame`].
    pub fn forecast_year(
        &self,
        model: &ForecastModel,
        year: i32,
    ) -> Result<(Vec<f64>, BlendWeights), FlowcastError> {
        let window = &self.problem.training;
        let raw = self.dataset.get(&self.problem.predictand.name)?;
        let preprocessing =
            Preprocessing::fit(self.problem.predictand.preprocessing, &raw.values_in(window));
        let predictand = raw.map_values(|v| preprocessing.forward(v));

        let series = model
            .predictors
            .iter()
            .map(|name| self.dataset.get(name))
            .collect::<Result<Vec<&AnnualSeries>, _>>()?;
        let forecast_row = row_for(&series, year).ok_or(FlowcastError::MissingData { year })?;

        let frame = TrainingFrame::build(&series, &predictand, window).without_year(year);
        let mut regressor = RegressionAlgorithm::new(
            model.regression,
            model.cross_validation.into(),
            &self.problem.settings,
        );

        BootstrapCalibrator::new(self.bootstrap_config(year))
            .with_cancellation(self.cancel.clone())
            .calibrate_frame(&mut regressor, &frame, &forecast_row, &preprocessing, year)
    }

    /// Calibrates every year in `years` into `distribution`. Years that fail
    /// are reported and skipped; cancellation stops the batch.
    pub fn calibrate_years(
        &self,
        model: &ForecastModel,
        years: &[i32],
        distribution: &mut ForecastDistribution,
    ) -> CalibrationReport {
        let mut report = CalibrationReport::default();
        info!(
            predictors = ?model.predictors,
            regression = ?model.regression,
            years = years.len(),
            "Generating forecasts"
        );

        for &year in years {
            let outcome = self
                .forecast_year(model, year)
                .and_then(|(values, weights)| {
                    distribution.set_forecasts_1_99(year, &values)?;
                    Ok(weights)
                });
            match outcome {
                Ok(weights) => {
                    info!(year, weight = weights.weight, "Forecast calibrated");
                    report.completed.push((year, weights));
                }
                Err(FlowcastError::Cancelled) => {
                    info!(year, "Forecast calibration cancelled");
                    report.cancelled = true;
                    break;
                }
                Err(err) => {
                    warn!(year, error = %err, "Skipping forecast year");
                    report.skipped.push((year, err));
                }
            }
        }
        report
    }
}
