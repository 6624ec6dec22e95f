use serde::{Deserialize, Serialize};

use crate::error::FlowcastError;
use crate::preprocessing::PreprocessingKind;

/// A complete forecast problem: what to predict, from which candidates, over
/// which years, and with which regression tuples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastProblem {
    pub predictand: PredictandSpec,
    pub predictors: Vec<PredictorSpec>,
    pub training: TrainingWindow,
    pub regressors: Vec<RegressorSpec>,
    #[serde(default)]
    pub settings: SearchSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictandSpec {
    pub name: String,
    #[serde(default)]
    pub preprocessing: PreprocessingKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorSpec {
    pub name: String,
    /// Pinned into every candidate subset.
    #[serde(default)]
    pub forced: bool,
    /// Candidates whose fitted coefficient for this predictor is negative are rejected.
    #[serde(default)]
    pub must_be_positive: bool,
}

impl PredictorSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            forced: false,
            must_be_positive: false,
        }
    }

    #[must_use]
    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    #[must_use]
    pub fn must_be_positive(mut self) -> Self {
        self.must_be_positive = true;
        self
    }
}

/// Inclusive range of training years with explicit exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingWindow {
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default)]
    pub excluded_years: Vec<i32>,
}

impl TrainingWindow {
    #[must_use]
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            excluded_years: Vec::new(),
        }
    }

    #[must_use]
    pub fn excluding(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.excluded_years.extend(years);
        self
    }

    /// True when `year` is inside the range and not excluded.
    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year) && !self.excluded_years.contains(&year)
    }
}

/// One (regression, cross-validation, feature selection, scoring) tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressorSpec {
    pub regression: RegressionKind,
    pub cross_validation: CrossValidationKind,
    pub feature_selection: FeatureSelectionKind,
    pub scoring: ScoringKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionKind {
    /// Ordinary least squares on the intercept-augmented design matrix.
    Ols,
    /// Principal-components regression.
    Pcr,
    /// Composite z-score regression.
    ZScore,
}

impl RegressionKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ols => "Multiple Linear Regression",
            Self::Pcr => "Principal Components Regression",
            Self::ZScore => "Z-Score Regression",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossValidationKind {
    KFold { k: usize },
    LeaveOneOut,
}

impl CrossValidationKind {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::KFold { k } => format!("{k}-Fold"),
            Self::LeaveOneOut => "Leave One Out".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelectionKind {
    Exhaustive,
    SequentialFloating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    R2,
    AdjustedR2,
    Mse,
    Rmse,
    MeanError,
    MeanAbsoluteError,
    NashSutcliffe,
    Aic,
    Aicc,
}

/// Engine-wide search and calibration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Wall-clock budget for a sequential floating search, in minutes.
    pub time_budget_minutes: f64,
    /// Use exhaustive search when the free-predictor count is at or below this.
    pub brute_force_under: usize,
    /// Cumulative explained-variance share that selects the retained components.
    pub pc_variance_threshold: f64,
    /// Bootstrap resamples per calibrated forecast year.
    pub n_bootstraps: usize,
    /// Seed for random restarts and bootstrap draws; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            time_budget_minutes: 5.0,
            brute_force_under: 6,
            pc_variance_threshold: 0.9,
            n_bootstraps: 300,
            seed: None,
        }
    }
}

impl ForecastProblem {
    /// Rejects configurations that cannot produce a meaningful search.
    ///
    /// # Errors
    ///
    /// Returns [`FlowcastError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), FlowcastError> {
        let invalid = |msg: String| -> Result<(), FlowcastError> {
            Err(FlowcastError::InvalidConfig(msg))
        };

        if self.predictors.is_empty() {
            return invalid("predictor pool is empty".to_string());
        }
        if self.regressors.is_empty() {
            return invalid("no regression tuples configured".to_string());
        }
        if self.training.start_year > self.training.end_year {
            return invalid(format!(
                "training window starts after it ends ({} > {})",
                self.training.start_year, self.training.end_year
            ));
        }
        for (i, name) in self.predictors.iter().map(|p| &p.name).enumerate() {
            if self.predictors[..i].iter().any(|p| &p.name == name) {
                return invalid(format!("predictor '{name}' listed twice"));
            }
        }
        for spec in &self.regressors {
            if let CrossValidationKind::KFold { k } = spec.cross_validation {
                if k < 2 {
                    return invalid(format!("k-fold cross validation needs k >= 2, got {k}"));
                }
            }
        }

        let s = &self.settings;
        if !(s.pc_variance_threshold > 0.0 && s.pc_variance_threshold <= 1.0) {
            return invalid(format!(
                "pc_variance_threshold must be in (0, 1], got {}",
                s.pc_variance_threshold
            ));
        }
        if !(s.time_budget_minutes.is_finite() && s.time_budget_minutes > 0.0) {
            return invalid(format!(
                "time_budget_minutes must be positive, got {}",
                s.time_budget_minutes
            ));
        }
        if s.n_bootstraps == 0 {
            return invalid("n_bootstraps must be at least 1".to_string());
        }
        Ok(())
    }
}
