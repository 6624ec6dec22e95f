use flowcast_core::{
    AnnualSeries, CrossValidationKind, Dataset, FeatureSelectionKind, ForecastProblem,
    PredictandSpec, PredictorSpec, PreprocessingKind, RegressionKind, RegressorSpec, ScoringKind,
    SearchSettings, TrainingWindow,
};
use flowcast_search::{rank_candidates, CollectingObserver, ModelSearch};

fn spec(scoring: ScoringKind) -> RegressorSpec {
    RegressorSpec {
        regression: RegressionKind::Ols,
        cross_validation: CrossValidationKind::KFold { k: 5 },
        feature_selection: FeatureSelectionKind::SequentialFloating,
        scoring,
    }
}

fn problem(predictors: Vec<PredictorSpec>, regressors: Vec<RegressorSpec>) -> ForecastProblem {
    ForecastProblem {
        predictand: PredictandSpec {
            name: "flow".to_string(),
            preprocessing: PreprocessingKind::None,
        },
        predictors,
        training: TrainingWindow::new(2001, 2005),
        regressors,
        settings: SearchSettings {
            seed: Some(5),
            ..SearchSettings::default()
        },
    }
}

#[test]
fn perfectly_correlated_predictor_yields_one_candidate() {
    let years = 2001..=2005;
    let x = AnnualSeries::from_pairs("x", years.clone().map(|y| (y, f64::from(y - 2000) * 3.0)));
    let flow = AnnualSeries::from_pairs("flow", years.map(|y| (y, f64::from(y - 2000) * 3.0)));
    let data: Dataset = [x, flow].into_iter().collect();
    let problem = problem(vec![PredictorSpec::new("x")], vec![spec(ScoringKind::R2)]);
    let mut observer = CollectingObserver::new();

    let summary = ModelSearch::new(&problem, &data)
        .run(&mut observer)
        .expect("search runs");

    assert_eq!(summary.emitted, 1);
    let candidate = &observer.candidates[0];
    assert!(candidate.subset.get(0));
    assert_eq!(candidate.predictors, vec!["x".to_string()]);
    assert!((candidate.score - 1.0).abs() < 1e-9);
    assert_eq!(candidate.n_samples, 5);
    assert_eq!(candidate.feature_selection, FeatureSelectionKind::Exhaustive);
}

#[test]
fn log_preprocessing_scores_in_real_units() {
    let years: Vec<i32> = (1990..=2005).collect();
    let swe: Vec<f64> = years.iter().map(|y| 10.0 + f64::from((y * 37) % 17)).collect();
    let flow: Vec<f64> = swe.iter().map(|s| (0.1 * s).exp()).collect();
    let data: Dataset = [
        AnnualSeries::from_pairs("swe", years.iter().copied().zip(swe)),
        AnnualSeries::from_pairs("flow", years.iter().copied().zip(flow)),
    ]
    .into_iter()
    .collect();

    let mut problem = problem(vec![PredictorSpec::new("swe")], vec![spec(ScoringKind::Mse)]);
    problem.training = TrainingWindow::new(1990, 2005);
    problem.predictand.preprocessing = PreprocessingKind::NaturalLog;
    let mut observer = CollectingObserver::new();

    ModelSearch::new(&problem, &data)
        .run(&mut observer)
        .expect("search runs");

    // ln(flow) is exactly linear in swe, so the real-unit error vanishes
    assert_eq!(observer.candidates.len(), 1);
    assert!(observer.candidates[0].score < 1e-12);
    assert!((observer.candidates[0].coefficients.slopes[0] - 0.1).abs() < 1e-9);
}

#[test]
fn multiple_regressors_each_emit_and_rank() {
    let years: Vec<i32> = (1980..=2000).collect();
    let a: Vec<f64> = years.iter().map(|y| f64::from((y * 13) % 23)).collect();
    let b: Vec<f64> = years.iter().map(|y| f64::from((y * 7) % 19)).collect();
    let flow: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 2.0 * a + 0.2 * b + 1.0).collect();
    let data: Dataset = [
        AnnualSeries::from_pairs("a", years.iter().copied().zip(a)),
        AnnualSeries::from_pairs("b", years.iter().copied().zip(b)),
        AnnualSeries::from_pairs("flow", years.iter().copied().zip(flow)),
    ]
    .into_iter()
    .collect();

    let mut problem = problem(
        vec![PredictorSpec::new("a").must_be_positive(), PredictorSpec::new("b")],
        vec![
            spec(ScoringKind::R2),
            RegressorSpec {
                regression: RegressionKind::Pcr,
                ..spec(ScoringKind::AdjustedR2)
            },
        ],
    );
    problem.training = TrainingWindow::new(1980, 2000).excluding([1990]);
    let mut observer = CollectingObserver::new();

    let summary = ModelSearch::new(&problem, &data)
        .run(&mut observer)
        .expect("search runs");

    assert_eq!(summary.evaluated, 8);
    assert!(summary.emitted >= 4);
    assert!(observer.candidates.iter().all(|c| c.n_samples == 20));

    let mut ranked = observer.into_candidates();
    rank_candidates(&mut ranked);
    let best_r2 = ranked
        .iter()
        .find(|c| c.scoring == ScoringKind::R2)
        .expect("an R2 candidate");
    assert_eq!(best_r2.predictors, vec!["a".to_string(), "b".to_string()]);
}
