//! Fixed-width predictor subsets.

use serde::{Deserialize, Serialize};

/// One bit per candidate predictor; set bits are included in the model.
///
/// Equality and hashing are structural, so subsets can key the search's
/// "already evaluated" set directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictorSubset {
    bits: Vec<bool>,
}

impl PredictorSubset {
    /// Creates an all-clear subset of width `n`.
    #[must_use]
    pub fn empty(n: usize) -> Self {
        Self {
            bits: vec![false; n],
        }
    }

    /// Creates an all-set subset of width `n`.
    #[must_use]
    pub fn full(n: usize) -> Self {
        Self {
            bits: vec![true; n],
        }
    }

    /// Wraps an explicit bit vector.
    #[must_use]
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Decodes the low `n` bits of `value`; bit `i` maps to predictor `i`.
    #[must_use]
    pub fn from_index(value: u64, n: usize) -> Self {
        Self {
            bits: (0..n)
                .map(|i| i < 64 && value & (1_u64 << i) != 0)
                .collect(),
        }
    }

    /// Width of the subset (number of candidate predictors).
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True for a zero-width subset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns bit `i`; out-of-range bits read as clear.
    #[must_use]
    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).copied().unwrap_or(false)
    }

    /// Sets bit `i` to `value`. Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize, value: bool) {
        if let Some(bit) = self.bits.get_mut(i) {
            *bit = value;
        }
    }

    /// Flips bit `i`. Out-of-range indices are ignored.
    pub fn toggle(&mut self, i: usize) {
        if let Some(bit) = self.bits.get_mut(i) {
            *bit = !*bit;
        }
    }

    /// Returns a copy with bit `i` flipped.
    #[must_use]
    pub fn with_toggled(&self, i: usize) -> Self {
        let mut next = self.clone();
        next.toggle(i);
        next
    }

    /// Bitwise OR with `other`, in place.
    pub fn union_with(&mut self, other: &Self) {
        for (bit, forced) in self.bits.iter_mut().zip(&other.bits) {
            *bit |= *forced;
        }
    }

    /// Returns `self | other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.union_with(other);
        next
    }

    /// True when every bit set in `mask` is also set in `self`.
    #[must_use]
    pub fn contains_all(&self, mask: &Self) -> bool {
        mask.bits
            .iter()
            .enumerate()
            .all(|(i, forced)| !*forced || self.get(i))
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Indices of set bits, ascending.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.then_some(i))
            .collect()
    }

    /// Borrow the raw bits.
    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Display string with a filled dot per selected predictor.
    #[must_use]
    pub fn genome(&self) -> String {
        self.bits
            .iter()
            .map(|b| if *b { '\u{25cf}' } else { '\u{25cc}' })
            .collect()
    }
}
