use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use flowcast_core::FlowcastError;

/// Number of exceedance levels stored per year (1 % through 99 %).
pub const LEVELS: usize = 99;

/// Calibrated forecasts keyed by year and exceedance level in hundredths.
///
/// Level `q` holds the `q`-th percentile of the calibrated forecast
/// distribution for that year. Recomputing a year overwrites its entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastDistribution {
    forecasts: BTreeMap<i32, BTreeMap<u8, f64>>,
}

impl ForecastDistribution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the 99 values for levels 1..=99 of `year`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowcastError::DimensionMismatch`] unless exactly 99 values
    /// are given.
    pub fn set_forecasts_1_99(&mut self, year: i32, values: &[f64]) -> Result<(), FlowcastError> {
        if values.len() != LEVELS {
            return Err(FlowcastError::DimensionMismatch {
                expected: LEVELS,
                actual: values.len(),
            });
        }
        let entry = self.forecasts.entry(year).or_default();
        for (level, value) in (1..=99_u8).zip(values) {
            entry.insert(level, *value);
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, year: i32, level: u8) -> Option<f64> {
        self.forecasts.get(&year)?.get(&level).copied()
    }

    /// All 99 values for `year`, ordered by level.
    #[must_use]
    pub fn values(&self, year: i32) -> Option<Vec<f64>> {
        self.forecasts.get(&year).map(|levels| levels.values().copied().collect())
    }

    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.forecasts.keys().copied().collect()
    }

    #[must_use]
    pub fn contains_year(&self, year: i32) -> bool {
        self.forecasts.contains_key(&year)
    }

    #[must_use]
    pub fn get_10_50_90(&self, year: i32) -> Option<[f64; 3]> {
        Some([
            self.get(year, 10)?,
            self.get(year, 50)?,
            self.get(year, 90)?,
        ])
    }

    #[must_use]
    pub fn get_10_30_50_70_90(&self, year: i32) -> Option<[f64; 5]> {
        Some([
            self.get(year, 10)?,
            self.get(year, 30)?,
            self.get(year, 50)?,
            self.get(year, 70)?,
            self.get(year, 90)?,
        ])
    }
}
