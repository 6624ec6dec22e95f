//! Train/test partitioning for out-of-fold prediction.
//!
//! Samples keep their original order (no shuffling). Fold `i` holds out one
//! contiguous block; the first `n % k` blocks are one sample longer than the
//! rest. Across one `split` call every sample is held out exactly once.

use flowcast_core::CrossValidationKind;

/// A boolean mask over samples; `true` marks a training row.
pub type TrainMask = Vec<bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splitter {
    KFold { k: usize },
    LeaveOneOut,
}

impl Splitter {
    /// Produces one training mask per fold for `n` samples.
    ///
    /// K-fold always yields `k` masks; when `n < k` the trailing folds hold
    /// out nothing and their masks are all `true`.
    #[must_use]
    pub fn split(&self, n: usize) -> Vec<TrainMask> {
        match *self {
            Self::KFold { k } => k_fold_masks(n, k),
            Self::LeaveOneOut => k_fold_masks(n, n),
        }
    }
}

impl From<CrossValidationKind> for Splitter {
    fn from(kind: CrossValidationKind) -> Self {
        match kind {
            CrossValidationKind::KFold { k } => Self::KFold { k },
            CrossValidationKind::LeaveOneOut => Self::LeaveOneOut,
        }
    }
}

fn k_fold_masks(n: usize, k: usize) -> Vec<TrainMask> {
    if k == 0 {
        return Vec::new();
    }

    let base = n / k;
    let extra = n % k;
    let mut masks = Vec::with_capacity(k);
    let mut start = 0;

    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let stop = start + size;
        masks.push((0..n).map(|i| i < start || i >= stop).collect());
        start = stop;
    }

    masks
}

/// Row indices selected (`true`) or rejected (`false`) by `mask`.
#[must_use]
pub fn rows_where(mask: &[bool], value: bool) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, m)| (*m == value).then_some(i))
        .collect()
}
