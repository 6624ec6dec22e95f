//! Forward/inverse transforms applied to the predictand around modelling.
//!
//! Parameters (min/max, mean/std, median) are fitted once on the training
//! values and reused for the inverse transform, so scores and forecasts are
//! always reported in real units.

use serde::{Deserialize, Serialize};

/// Which transform to fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingKind {
    #[default]
    None,
    NaturalLog,
    Log10,
    MinMax,
    Standardize,
    PercentOfMedian,
}

/// A fitted transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Preprocessing {
    #[default]
    None,
    NaturalLog,
    Log10,
    MinMax { min: f64, max: f64 },
    Standardize { mean: f64, std: f64 },
    PercentOfMedian { median: f64 },
}

impl Preprocessing {
    /// Fits `kind` on `values`, ignoring non-finite entries.
    #[must_use]
    pub fn fit(kind: PreprocessingKind, values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        match kind {
            PreprocessingKind::None => Self::None,
            PreprocessingKind::NaturalLog => Self::NaturalLog,
            PreprocessingKind::Log10 => Self::Log10,
            PreprocessingKind::MinMax => {
                let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
                let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Self::MinMax { min, max }
            }
            PreprocessingKind::Standardize => {
                let n = finite.len() as f64;
                let mean = finite.iter().sum::<f64>() / n;
                // population standard deviation
                let std = (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
                Self::Standardize { mean, std }
            }
            PreprocessingKind::PercentOfMedian => Self::PercentOfMedian {
                median: median(&finite),
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> PreprocessingKind {
        match self {
            Self::None => PreprocessingKind::None,
            Self::NaturalLog => PreprocessingKind::NaturalLog,
            Self::Log10 => PreprocessingKind::Log10,
            Self::MinMax { .. } => PreprocessingKind::MinMax,
            Self::Standardize { .. } => PreprocessingKind::Standardize,
            Self::PercentOfMedian { .. } => PreprocessingKind::PercentOfMedian,
        }
    }

    /// Real units to model space.
    #[must_use]
    pub fn forward(&self, value: f64) -> f64 {
        match *self {
            Self::None => value,
            Self::NaturalLog => value.ln(),
            Self::Log10 => value.log10(),
            Self::MinMax { min, max } => (value - min) / (max - min),
            Self::Standardize { mean, std } => (value - mean) / std,
            Self::PercentOfMedian { median } => 100.0 * value / median,
        }
    }

    /// Model space back to real units.
    #[must_use]
    pub fn inverse(&self, value: f64) -> f64 {
        match *self {
            Self::None => value,
            Self::NaturalLog => value.exp(),
            Self::Log10 => 10_f64.powf(value),
            Self::MinMax { min, max } => value * (max - min) + min,
            Self::Standardize { mean, std } => value * std + mean,
            Self::PercentOfMedian { median } => value * median / 100.0,
        }
    }

    /// Applies [`Self::inverse`] to every element in place.
    pub fn inverse_in_place(&self, values: &mut [f64]) {
        for v in values.iter_mut() {
            *v = self.inverse(*v);
        }
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
