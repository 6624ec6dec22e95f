//! Error types for the forecasting engine.
//!
//! Numerical soft failures (ill-conditioned fits, undefined scores) are not
//! errors: they surface as NaN values and are filtered by the search loop.
//! These variants cover configuration mistakes and conditions the caller has
//! to see.

use thiserror::Error;

/// Errors raised by the flowcast crates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowcastError {
    /// The configuration cannot be used to start a search.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No predictor has any data inside the training window.
    #[error("predictor pool is empty: no predictor has data in the training window")]
    EmptyPredictorPool,

    /// A series referenced by the configuration is absent from the dataset.
    #[error("unknown series: {name}")]
    UnknownSeries {
        /// Name that failed to resolve.
        name: String,
    },

    /// A forecast year lacks predictor values.
    #[error("missing data for year {year}")]
    MissingData {
        /// The year that could not be forecast.
        year: i32,
    },

    /// Every row was dropped while assembling the training frame.
    #[error("training frame is empty after dropping incomplete rows")]
    EmptyTrainingFrame,

    /// The refit model produced a non-finite forecast.
    #[error("model fit is numerically degenerate for year {year}")]
    DegenerateFit {
        /// The year being forecast.
        year: i32,
    },

    /// Matrix or vector shapes do not line up.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The caller requested cancellation.
    #[error("operation cancelled")]
    Cancelled,
}
