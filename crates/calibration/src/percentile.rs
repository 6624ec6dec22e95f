//! Linear-interpolation percentiles.

/// Percentiles (`0..=100`) of `values` for every entry in `qs`, using linear
/// interpolation between closest ranks and sorting `values` once.
/// Non-finite values are ignored; every entry is NaN when nothing finite
/// remains.
#[must_use]
pub fn percentiles(values: &[f64], qs: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return vec![f64::NAN; qs.len()];
    }
    sorted.sort_by(f64::total_cmp);
    qs.iter().map(|&q| interpolate(&sorted, q)).collect()
}

fn interpolate(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = (q.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper.min(last)] - sorted[lower]) * frac
}

/// `0, 1, .., 99`.
#[must_use]
pub fn grid_0_99() -> Vec<f64> {
    (0..100).map(f64::from).collect()
}

/// `1, 2, .., 99`.
#[must_use]
pub fn grid_1_99() -> Vec<f64> {
    (1..100).map(f64::from).collect()
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(values: &[f64], q: f64) -> f64 {
        percentiles(values, &[q])[0]
    }

    #[test]
    fn empty_is_nan() {
        assert!(at(&[], 50.0).is_nan());
        assert!(at(&[f64::NAN], 50.0).is_nan());
    }

    #[test]
    fn single_value_is_every_percentile() {
        assert_eq!(at(&[3.5], 0.0), 3.5);
        assert_eq!(at(&[3.5], 99.0), 3.5);
    }

    #[test]
    fn interpolates_between_ranks() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(at(&values, 0.0), 1.0);
        assert_eq!(at(&values, 100.0), 4.0);
        assert!((at(&values, 50.0) - 2.5).abs() < 1e-12);
        // rank 0.1 * 3 = 0.3
        assert!((at(&values, 10.0) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn hundred_values_map_to_index() {
        let values: Vec<f64> = (0..101).map(f64::from).collect();
        let got = percentiles(&values, &grid_1_99());
        assert_eq!(got.len(), 99);
        for (i, v) in got.iter().enumerate() {
            assert!((v - (i + 1) as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn grids_and_mean() {
        assert_eq!(grid_0_99().len(), 100);
        assert_eq!(grid_1_99()[0], 1.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert!(mean(&[]).is_nan());
    }
}
