use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use flowcast_core::{
    CrossValidationKind, FeatureSelectionKind, PredictorSubset, RegressionKind, ScoringKind,
    TrainingWindow,
};
use flowcast_regression::{LinearModel, RegressionAlgorithm, ScoreDirection, Scorer};

/// A subset that cleared every validity check, with its fitted model.
///
/// Immutable once emitted. The fitted regressor is kept for calibration but
/// left out of serialized output; the coefficients are serialized instead.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub id: Uuid,
    /// Selection over the full configured predictor pool.
    pub subset: PredictorSubset,
    pub predictors: Vec<String>,
    pub genome: String,
    pub regression: RegressionKind,
    pub cross_validation: CrossValidationKind,
    /// The strategy that actually ran (exhaustive when substituted).
    pub feature_selection: FeatureSelectionKind,
    pub scoring: ScoringKind,
    pub score: f64,
    pub coefficients: LinearModel,
    pub training: TrainingWindow,
    pub n_samples: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub model: RegressionAlgorithm,
}

impl ScoredCandidate {
    /// The search objective for this candidate's score.
    #[must_use]
    pub fn objective(&self) -> f64 {
        Scorer::new(self.scoring).objective(self.score)
    }

    /// One-line summary for logs and terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        let genome = if self.genome.chars().count() > 40 {
            let head: String = self.genome.chars().take(37).collect();
            format!("{head}...")
        } else {
            self.genome.clone()
        };
        format!(
            "{genome:40} {} / {}: {} {:12.5}",
            self.regression.label(),
            self.cross_validation.label(),
            Scorer::new(self.scoring).label(),
            self.score
        )
    }
}

/// Sorts best-first. Candidates are grouped by scoring metric, each group
/// ordered by its own direction, with NaN scores last.
pub fn rank_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        let sa = Scorer::new(a.scoring);
        let sb = Scorer::new(b.scoring);
        sa.label().cmp(sb.label()).then_with(|| {
            let (x, y) = (a.objective(), b.objective());
            match (x.is_nan(), y.is_nan()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => match sa.direction() {
                    ScoreDirection::Maximize => y.total_cmp(&x),
                    ScoreDirection::Minimize => x.total_cmp(&y),
                },
            }
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcast_core::SearchSettings;
    use flowcast_regression::Splitter;

    fn candidate(scoring: ScoringKind, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            id: Uuid::new_v4(),
            subset: PredictorSubset::full(1),
            predictors: vec!["swe".to_string()],
            genome: PredictorSubset::full(1).genome(),
            regression: RegressionKind::Ols,
            cross_validation: CrossValidationKind::LeaveOneOut,
            feature_selection: FeatureSelectionKind::Exhaustive,
            scoring,
            score,
            coefficients: LinearModel::nan(1),
            training: TrainingWindow::new(2000, 2010),
            n_samples: 11,
            created_at: Utc::now(),
            model: RegressionAlgorithm::new(
                RegressionKind::Ols,
                Splitter::LeaveOneOut,
                &SearchSettings::default(),
            ),
        }
    }

    #[test]
    fn ranks_by_direction_with_nan_last() {
        let mut list = vec![
            candidate(ScoringKind::R2, 0.5),
            candidate(ScoringKind::R2, f64::NAN),
            candidate(ScoringKind::R2, 0.9),
        ];
        rank_candidates(&mut list);
        assert_eq!(list[0].score, 0.9);
        assert_eq!(list[1].score, 0.5);
        assert!(list[2].score.is_nan());

        let mut errors = vec![
            candidate(ScoringKind::MeanError, -0.1),
            candidate(ScoringKind::MeanError, 0.5),
            candidate(ScoringKind::MeanError, 0.05),
        ];
        rank_candidates(&mut errors);
        assert_eq!(errors[0].score, 0.05);
        assert_eq!(errors[1].score, -0.1);
    }

    #[test]
    fn serializes_without_model() {
        let json = serde_json::to_value(candidate(ScoringKind::R2, 0.7)).expect("serializes");
        assert_eq!(json["regression"], "ols");
        assert_eq!(json["predictors"][0], "swe");
        assert!(json.get("model").is_none());
        assert!(json["coefficients"]["slopes"].is_array());
    }

    #[test]
    fn summary_truncates_long_genomes() {
        let mut c = candidate(ScoringKind::R2, 0.7);
        c.genome = PredictorSubset::full(50).genome();
        assert!(c.summary().contains("..."));
    }
}
