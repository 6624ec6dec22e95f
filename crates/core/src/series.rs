//! Annual (water-year keyed) series and the dataset that holds them.
//!
//! Series arrive already aggregated and unit-converted. A value is considered
//! missing when the year is absent or the stored value is not finite.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::TrainingWindow;
use crate::error::FlowcastError;

/// A named mapping from year to scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSeries {
    /// Series name, matched against the configuration.
    pub name: String,
    /// Year-keyed values. Non-finite values count as missing.
    pub values: BTreeMap<i32, f64>,
}

impl AnnualSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builds a series from `(year, value)` pairs.
    #[must_use]
    pub fn from_pairs(name: impl Into<String>, pairs: impl IntoIterator<Item = (i32, f64)>) -> Self {
        Self {
            name: name.into(),
            values: pairs.into_iter().collect(),
        }
    }

    /// Inserts or replaces the value for `year`.
    pub fn insert(&mut self, year: i32, value: f64) {
        self.values.insert(year, value);
    }

    /// Returns the value for `year`, or `None` when missing.
    #[must_use]
    pub fn value(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied().filter(|v| v.is_finite())
    }

    /// Number of stored years, including non-finite entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no years are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finite values that fall inside the training window, in year order.
    #[must_use]
    pub fn values_in(&self, window: &TrainingWindow) -> Vec<f64> {
        self.values
            .iter()
            .filter(|(year, v)| window.contains(**year) && v.is_finite())
            .map(|(_, v)| *v)
            .collect()
    }

    /// True when at least one finite value falls inside the window.
    #[must_use]
    pub fn has_data_in(&self, window: &TrainingWindow) -> bool {
        self.values
            .iter()
            .any(|(year, v)| window.contains(*year) && v.is_finite())
    }

    /// Applies `f` to every value, keeping the name and years.
    #[must_use]
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            name: self.name.clone(),
            values: self.values.iter().map(|(y, v)| (*y, f(*v))).collect(),
        }
    }
}

/// A collection of named series supplied by the dataset store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    series: Vec<AnnualSeries>,
}

impl Dataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a series, replacing any existing series with the same name.
    pub fn insert(&mut self, series: AnnualSeries) {
        match self.series.iter_mut().find(|s| s.name == series.name) {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    /// Looks up a series by name.
    ///
    /// # Errors
    ///
    /// Returns [`FlowcastError::UnknownSeries`] if no series has that name.
    pub fn get(&self, name: &str) -> Result<&AnnualSeries, FlowcastError> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| FlowcastError::UnknownSeries {
                name: name.to_string(),
            })
    }

    /// Series names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when the dataset holds no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<AnnualSeries> for Dataset {
    fn from_iter<I: IntoIterator<Item = AnnualSeries>>(iter: I) -> Self {
        let mut dataset = Self::new();
        for series in iter {
            dataset.insert(series);
        }
        dataset
    }
}
