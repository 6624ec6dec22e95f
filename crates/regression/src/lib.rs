//! Regression families, cross-validation splitters and scoring metrics.
//!
//! Every regressor shares the same contract: `train_model` stores
//! coefficients (NaN on an ill-conditioned design instead of an error),
//! `predict` applies them, and `cross_val_predict` produces out-of-fold
//! predictions under the configured splitter before refitting on all rows.

pub mod cross_validation;
pub mod linalg;
pub mod ols;
pub mod pcr;
pub mod regressor;
pub mod scoring;
pub mod zscore;

pub use cross_validation::Splitter;
pub use ols::OlsRegressor;
pub use pcr::PcrRegressor;
pub use regressor::{LinearModel, RegressionAlgorithm, Regressor};
pub use scoring::{ScoreDirection, Scorer};
pub use zscore::ZScoreRegressor;
