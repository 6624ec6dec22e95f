//! Bootstrap .632+ calibration of point forecasts into exceedance
//! distributions.
//!
//! [`BootstrapCalibrator`] resamples a training frame, blends training and
//! out-of-bag residual percentiles, and returns the 1..=99 percentile values
//! around the full-data forecast. [`ForecastCalibrator`] drives that per year
//! for a chosen [`ForecastModel`] and fills a [`ForecastDistribution`].

pub mod bootstrap;
pub mod calibrator;
pub mod distribution;
pub mod percentile;

pub use bootstrap::{BlendWeights, BootstrapCalibrator, BootstrapConfig, BootstrapEnsemble};
pub use calibrator::{CalibrationReport, ForecastCalibrator, ForecastModel};
pub use distribution::{ForecastDistribution, LEVELS};
