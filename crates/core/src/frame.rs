//! Design-matrix assembly.
//!
//! A frame is the inner join of the selected predictors and the predictand on
//! year, restricted to the training window, with every incomplete row
//! dropped. Frames are rebuilt for each candidate subset and never shared.

use nalgebra::{DMatrix, DVector};

use crate::config::TrainingWindow;
use crate::series::AnnualSeries;

/// Rows are years, columns are the selected predictors in pool order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    pub years: Vec<i32>,
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
}

impl TrainingFrame {
    /// Joins `predictors` and `predictand` on year inside `window`.
    #[must_use]
    pub fn build(
        predictors: &[&AnnualSeries],
        predictand: &AnnualSeries,
        window: &TrainingWindow,
    ) -> Self {
        let mut years = Vec::new();
        let mut rows: Vec<f64> = Vec::new();
        let mut targets = Vec::new();

        for (&year, &target) in &predictand.values {
            if !window.contains(year) || !target.is_finite() {
                continue;
            }
            let Some(row) = row_for(predictors, year) else {
                continue;
            };
            years.push(year);
            rows.extend(row);
            targets.push(target);
        }

        let n = years.len();
        Self {
            years,
            x: DMatrix::from_row_slice(n, predictors.len(), &rows),
            y: DVector::from_vec(targets),
        }
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    #[must_use]
    pub fn n_predictors(&self) -> usize {
        self.x.ncols()
    }

    /// True when every row was dropped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Returns a copy with `year` removed, if present.
    #[must_use]
    pub fn without_year(&self, year: i32) -> Self {
        let keep: Vec<usize> = self
            .years
            .iter()
            .enumerate()
            .filter_map(|(i, y)| (*y != year).then_some(i))
            .collect();
        Self {
            years: keep.iter().map(|&i| self.years[i]).collect(),
            x: self.x.select_rows(keep.iter()),
            y: self.y.select_rows(keep.iter()),
        }
    }
}

/// Predictor values for `year`, or `None` if any predictor is missing there.
#[must_use]
pub fn row_for(predictors: &[&AnnualSeries], year: i32) -> Option<Vec<f64>> {
    predictors.iter().map(|s| s.value(year)).collect()
}
