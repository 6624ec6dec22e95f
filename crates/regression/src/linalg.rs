//! Small dense linear-algebra helpers on top of `nalgebra`.
//!
//! All iterative decompositions go through the `try_*` constructors with an
//! iteration cap so that non-finite input can never spin forever.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

const MAX_ITERATIONS: usize = 10_000;

/// Relative cutoff for small singular values in the pseudo-inverse.
const PINV_RCOND: f64 = 1e-15;

/// Designs at or above this condition number are treated as singular.
#[must_use]
pub fn condition_limit() -> f64 {
    1.0 / f64::EPSILON
}

/// Prepends a column of ones.
#[must_use]
pub fn augment(x: &DMatrix<f64>) -> DMatrix<f64> {
    x.clone().insert_column(0, 1.0)
}

/// Singular values, or `None` when the matrix is empty, non-finite, or the
/// decomposition fails to converge.
#[must_use]
pub fn singular_values(m: &DMatrix<f64>) -> Option<DVector<f64>> {
    if m.is_empty() || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    m.clone()
        .try_svd(false, false, f64::EPSILON, MAX_ITERATIONS)
        .map(|svd| svd.singular_values)
}

/// 2-norm condition number (largest over smallest singular value).
///
/// Empty, non-finite and rank-deficient matrices report infinity.
#[must_use]
pub fn condition_number(m: &DMatrix<f64>) -> f64 {
    let Some(sv) = singular_values(m) else {
        return f64::INFINITY;
    };
    let max = sv.max();
    let min = sv.min();
    if min <= 0.0 {
        f64::INFINITY
    } else {
        max / min
    }
}

#[must_use]
pub fn is_well_conditioned(m: &DMatrix<f64>) -> bool {
    condition_number(m) < condition_limit()
}

/// Moore-Penrose pseudo-inverse.
#[must_use]
pub fn pseudo_inverse(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if m.is_empty() || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = m
        .clone()
        .try_svd(true, true, f64::EPSILON, MAX_ITERATIONS)?;
    let tol = PINV_RCOND * svd.singular_values.max();
    svd.pseudo_inverse(tol).ok()
}

/// Least-squares coefficients `pinv(X'X) X'y` for an intercept-augmented
/// design. Ill-conditioned designs yield an all-NaN vector.
#[must_use]
pub fn least_squares(augmented: &DMatrix<f64>, y: &DVector<f64>) -> DVector<f64> {
    let width = augmented.ncols();
    if augmented.nrows() == 0 || !is_well_conditioned(augmented) {
        return DVector::from_element(width, f64::NAN);
    }
    let xt = augmented.transpose();
    match pseudo_inverse(&(&xt * augmented)) {
        Some(inv) => inv * xt * y,
        None => DVector::from_element(width, f64::NAN),
    }
}

/// Column means, skipping non-finite entries.
#[must_use]
pub fn column_means(x: &DMatrix<f64>) -> Vec<f64> {
    x.column_iter()
        .map(|col| {
            let finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.is_empty() {
                f64::NAN
            } else {
                finite.iter().sum::<f64>() / finite.len() as f64
            }
        })
        .collect()
}

/// Sample standard deviations (`ddof = 1`), skipping non-finite entries.
#[must_use]
pub fn column_stds(x: &DMatrix<f64>, means: &[f64]) -> Vec<f64> {
    x.column_iter()
        .zip(means)
        .map(|(col, mean)| {
            let finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.len() < 2 {
                return f64::NAN;
            }
            let ss: f64 = finite.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (finite.len() - 1) as f64).sqrt()
        })
        .collect()
}

/// Column-wise `(x - mean) / std`.
#[must_use]
pub fn standardize(x: &DMatrix<f64>, means: &[f64], stds: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols(), |r, c| (x[(r, c)] - means[c]) / stds[c])
}

/// Sample covariance of the columns of `z`.
#[must_use]
pub fn covariance(z: &DMatrix<f64>) -> DMatrix<f64> {
    let n = z.nrows();
    let means = column_means(z);
    let centered = DMatrix::from_fn(n, z.ncols(), |r, c| z[(r, c)] - means[c]);
    (centered.transpose() * &centered) / (n.saturating_sub(1).max(1) as f64)
}

/// Eigenvalues (descending) and matching eigenvector columns of a symmetric
/// matrix.
#[must_use]
pub fn sorted_eigen(m: &DMatrix<f64>) -> Option<(Vec<f64>, DMatrix<f64>)> {
    if m.is_empty() || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let eig = SymmetricEigen::try_new(m.clone(), f64::EPSILON, MAX_ITERATIONS)?;

    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vectors = eig.eigenvectors.select_columns(order.iter());
    Some((values, vectors))
}

/// Squared Pearson correlation over the rows where both inputs are finite.
///
/// Returns NaN with fewer than two complete pairs or zero variance.
#[must_use]
pub fn pairwise_r2(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return f64::NAN;
    }
    let r = cov / (var_a * var_b).sqrt();
    r * r
}
