//! Model search orchestration.
//!
//! For each configured regressor tuple the orchestrator drives a subset
//! search, builds a training frame per proposed subset, scores the
//! out-of-fold predictions in real units and emits every candidate that
//! survives the NaN and sign checks.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use uuid::Uuid;

use flowcast_core::{
    AnnualSeries, CancellationFlag, Dataset, FeatureSelectionKind, FlowcastError, ForecastProblem,
    Preprocessing, PredictorSubset, RegressorSpec, TrainingFrame,
};
use flowcast_regression::{RegressionAlgorithm, Regressor, Scorer};

use crate::candidate::ScoredCandidate;
use crate::observer::SearchObserver;
use crate::subset_search::{SubsetSearch, SubsetSearcher, MAX_EXHAUSTIVE_FREE};

/// Counts reported when a search finishes or is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    /// Subsets proposed by the subset searches.
    pub evaluated: usize,
    /// Candidates handed to the observer.
    pub emitted: usize,
    /// Subsets dropped for an empty frame, NaN score or sign violation.
    pub rejected: usize,
    pub cancelled: bool,
}

/// The predictor pool after dropping predictors with no data in the window.
#[derive(Debug, Clone)]
pub struct PreparedPool<'a> {
    /// Indices into the configured predictor list.
    pub active: Vec<usize>,
    pub series: Vec<&'a AnnualSeries>,
    /// Forced bits over `active`.
    pub forced: PredictorSubset,
    /// Predictand in model space.
    pub predictand: AnnualSeries,
    pub preprocessing: Preprocessing,
}

impl PreparedPool<'_> {
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.active.len() - self.forced.count_ones()
    }
}

enum Outcome {
    Accepted(Box<ScoredCandidate>),
    Rejected(&'static str),
}

pub struct ModelSearch<'a> {
    problem: &'a ForecastProblem,
    dataset: &'a Dataset,
    cancel: CancellationFlag,
}

impl<'a> ModelSearch<'a> {
    #[must_use]
    pub fn new(problem: &'a ForecastProblem, dataset: &'a Dataset) -> Self {
        Self {
            problem,
            dataset,
            cancel: CancellationFlag::new(),
        }
    }

    /// Uses `cancel` as the cooperative stop signal.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolves the predictand and predictor pool and fits the predictand
    /// transform on the training window.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, a series missing from the dataset,
    /// a forced predictor without data in the window, or an empty pool.
    pub fn prepare(&self) -> Result<PreparedPool<'a>, FlowcastError> {
        let problem = self.problem;
        problem.validate()?;
        let window = &problem.training;

        let raw = self.dataset.get(&problem.predictand.name)?;
        let preprocessing =
            Preprocessing::fit(problem.predictand.preprocessing, &raw.values_in(window));
        let predictand = raw.map_values(|v| preprocessing.forward(v));

        let mut active = Vec::new();
        let mut series = Vec::new();
        let mut forced = Vec::new();
        for (i, spec) in problem.predictors.iter().enumerate() {
            let s = self.dataset.get(&spec.name)?;
            if !s.has_data_in(window) {
                if spec.forced {
                    return Err(FlowcastError::InvalidConfig(format!(
                        "forced predictor {} has no data in the training window",
                        spec.name
                    )));
                }
                debug!(predictor = %spec.name, "Dropping predictor with no data in training window");
                continue;
            }
            active.push(i);
            series.push(s);
            forced.push(spec.forced);
        }
        if active.is_empty() {
            return Err(FlowcastError::EmptyPredictorPool);
        }

        Ok(PreparedPool {
            active,
            series,
            forced: PredictorSubset::from_bits(forced),
            predictand,
            preprocessing,
        })
    }

    /// Runs every regressor tuple in order, streaming accepted candidates to
    /// `observer`.
    ///
    /// # Errors
    ///
    /// Configuration problems are reported before any candidate is evaluated.
    /// Numerical failures inside a candidate never surface as errors.
    pub fn run(&self, observer: &mut dyn SearchObserver) -> Result<SearchSummary, FlowcastError> {
        let pool = self.prepare()?;
        let settings = &self.problem.settings;
        let free = pool.free_count();

        let plan: Vec<(RegressorSpec, FeatureSelectionKind)> = self
            .problem
            .regressors
            .iter()
            .map(|spec| {
                let selection = if free <= settings.brute_force_under {
                    FeatureSelectionKind::Exhaustive
                } else {
                    spec.feature_selection
                };
                (*spec, selection)
            })
            .collect();
        if free > MAX_EXHAUSTIVE_FREE
            && plan
                .iter()
                .any(|(_, s)| *s == FeatureSelectionKind::Exhaustive)
        {
            return Err(FlowcastError::InvalidConfig(format!(
                "{free} free predictors is too many for exhaustive search"
            )));
        }

        let budget = Duration::from_secs_f64(settings.time_budget_minutes * 60.0);
        let mut summary = SearchSummary::default();
        let stages = plan.len();

        for (stage, (spec, selection)) in plan.into_iter().enumerate() {
            let scorer = Scorer::new(spec.scoring);
            let direction = scorer.direction();
            info!(
                regression = ?spec.regression,
                cross_validation = %spec.cross_validation.label(),
                feature_selection = ?selection,
                scoring = scorer.label(),
                predictors = pool.active.len(),
                free,
                "Beginning model search"
            );
            if selection != spec.feature_selection {
                info!(free, "Small predictor pool, using exhaustive search");
                observer.on_message("Small number of predictors. Using brute force feature selection");
            }
            observer.on_message(&format!(
                "{} / {} / {}",
                spec.regression.label(),
                spec.cross_validation.label(),
                scorer.label()
            ));

            let seed = settings.seed.map(|s| s.wrapping_add(stage as u64));
            let mut search = SubsetSearcher::new(
                selection,
                pool.active.len(),
                pool.forced.clone(),
                budget,
                seed,
            )?;
            let mut regressor =
                RegressionAlgorithm::new(spec.regression, spec.cross_validation.into(), settings);

            let mut last = direction.worst();
            let mut reported = None;
            loop {
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    info!(
                        evaluated = summary.evaluated,
                        emitted = summary.emitted,
                        "Model search cancelled"
                    );
                    return Ok(summary);
                }
                let Some(subset) = search.next(last, direction) else {
                    break;
                };
                summary.evaluated += 1;

                match self.evaluate(&pool, &subset, &spec, selection, &scorer, &mut regressor) {
                    Outcome::Accepted(candidate) => {
                        last = candidate.objective();
                        summary.emitted += 1;
                        debug!(candidate = %candidate.summary(), "Accepted candidate");
                        observer.on_candidate(&candidate);
                    }
                    Outcome::Rejected(reason) => {
                        last = direction.worst();
                        summary.rejected += 1;
                        trace!(genome = %subset.genome(), reason, "Rejected candidate");
                    }
                }

                let pct = overall_progress(stage, stages, search.progress());
                if reported != Some(pct) {
                    observer.on_progress(pct);
                    reported = Some(pct);
                }
            }

            observer.on_progress(overall_progress(stage + 1, stages, 0));
            info!(
                evaluated = search.evaluated(),
                emitted = summary.emitted,
                "Finished model search stage"
            );
        }

        observer.on_message("Finished");
        Ok(summary)
    }

    fn evaluate(
        &self,
        pool: &PreparedPool<'_>,
        subset: &PredictorSubset,
        spec: &RegressorSpec,
        selection: FeatureSelectionKind,
        scorer: &Scorer,
        regressor: &mut RegressionAlgorithm,
    ) -> Outcome {
        let chosen = subset.indices();
        if chosen.is_empty() {
            return Outcome::Rejected("no predictors selected");
        }
        let selected: Vec<&AnnualSeries> = chosen.iter().map(|&i| pool.series[i]).collect();
        let frame = TrainingFrame::build(&selected, &pool.predictand, &self.problem.training);
        if frame.is_empty() {
            return Outcome::Rejected("empty training frame");
        }

        let (predicted, actual) = regressor.cross_val_predict(&frame.x, &frame.y);
        let predicted = predicted.map(|v| pool.preprocessing.inverse(v));
        let actual = actual.map(|v| pool.preprocessing.inverse(v));
        let score = scorer.score(&predicted, &actual, frame.n_predictors());
        if score.is_nan() {
            return Outcome::Rejected("score is NaN");
        }

        let predictors = &self.problem.predictors;
        let signs = regressor.is_positive_corr();
        let violates = chosen
            .iter()
            .zip(&signs)
            .any(|(&i, positive)| predictors[pool.active[i]].must_be_positive && !positive);
        if violates {
            return Outcome::Rejected("sign constraint violated");
        }

        let mut pool_subset = PredictorSubset::empty(predictors.len());
        for &i in &chosen {
            pool_subset.set(pool.active[i], true);
        }

        Outcome::Accepted(Box::new(ScoredCandidate {
            id: Uuid::new_v4(),
            predictors: chosen
                .iter()
                .map(|&i| predictors[pool.active[i]].name.clone())
                .collect(),
            genome: pool_subset.genome(),
            subset: pool_subset,
            regression: spec.regression,
            cross_validation: spec.cross_validation,
            feature_selection: selection,
            scoring: spec.scoring,
            score,
            coefficients: regressor.coefficients().clone(),
            training: self.problem.training.clone(),
            n_samples: frame.n_samples(),
            created_at: Utc::now(),
            model: regressor.clone(),
        }))
    }
}

/// Scales a stage's own progress into its share of the whole run.
fn overall_progress(stage: usize, stages: usize, stage_progress: u8) -> u8 {
    if stages == 0 {
        return 100;
    }
    let pct = (stage * 100 + usize::from(stage_progress)) / stages;
    pct.min(100) as u8
}
