//! Core types for the flowcast model-search engine.
//!
//! Holds everything the numerical crates share: annual series and datasets,
//! predictor subsets, training frames, predictand preprocessing, the
//! forecast-problem configuration and its loader, and cooperative cancellation.

pub mod cancellation;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod frame;
pub mod preprocessing;
pub mod series;
pub mod subset;

pub use cancellation::CancellationFlag;
pub use config::{
    CrossValidationKind, FeatureSelectionKind, ForecastProblem, PredictandSpec, PredictorSpec,
    RegressionKind, RegressorSpec, ScoringKind, SearchSettings, TrainingWindow,
};
pub use config_loader::ConfigLoader;
pub use error::FlowcastError;
pub use frame::TrainingFrame;
pub use preprocessing::{Preprocessing, PreprocessingKind};
pub use series::{AnnualSeries, Dataset};
pub use subset::PredictorSubset;
