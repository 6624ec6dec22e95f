//! Predictor subset search state machines.
//!
//! A search is driven by repeated `next` calls. Each call receives the score
//! of the subset returned by the previous call and either proposes a new
//! subset or reports exhaustion with `None`. Within one run no subset is
//! proposed twice and every proposal carries all forced bits.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use flowcast_core::{FeatureSelectionKind, FlowcastError, PredictorSubset};
use flowcast_regression::ScoreDirection;

/// Widest free-predictor count an exhaustive search can enumerate.
pub const MAX_EXHAUSTIVE_FREE: usize = 63;

pub trait SubsetSearch {
    /// Proposes the next subset, or `None` once the search is finished.
    ///
    /// `last_score` is the objective of the previously proposed subset (use
    /// `direction.worst()` for the first call and for rejected candidates).
    fn next(&mut self, last_score: f64, direction: ScoreDirection) -> Option<PredictorSubset>;

    /// Completion estimate in percent.
    fn progress(&self) -> u8;

    /// Number of subsets proposed so far.
    fn evaluated(&self) -> usize;
}

// ============================================================================
// Exhaustive
// ============================================================================

/// Visits every combination of the free predictors once, in counter order.
#[derive(Debug, Clone)]
pub struct ExhaustiveSearch {
    forced: PredictorSubset,
    free: Vec<usize>,
    counter: u64,
    total: u64,
}

impl ExhaustiveSearch {
    /// # Errors
    ///
    /// Returns [`FlowcastError::InvalidConfig`] when more than
    /// [`MAX_EXHAUSTIVE_FREE`] predictors are free, or when the forced mask
    /// width differs from `n`.
    pub fn new(n: usize, forced: PredictorSubset) -> Result<Self, FlowcastError> {
        check_width(n, &forced)?;
        let free: Vec<usize> = (0..n).filter(|&i| !forced.get(i)).collect();
        if free.len() > MAX_EXHAUSTIVE_FREE {
            return Err(FlowcastError::InvalidConfig(format!(
                "exhaustive search supports at most {MAX_EXHAUSTIVE_FREE} free predictors, got {}",
                free.len()
            )));
        }
        Ok(Self {
            forced,
            total: 1_u64 << free.len(),
            free,
            counter: 0,
        })
    }

    /// Deposits the bits of `value` into the free positions over the forced
    /// mask. Distinct values below `total` give distinct subsets.
    fn decode(&self, value: u64) -> PredictorSubset {
        let mut subset = self.forced.clone();
        for (bit, &position) in self.free.iter().enumerate() {
            if value & (1_u64 << bit) != 0 {
                subset.set(position, true);
            }
        }
        subset
    }
}

impl SubsetSearch for ExhaustiveSearch {
    fn next(&mut self, _last_score: f64, _direction: ScoreDirection) -> Option<PredictorSubset> {
        if self.counter >= self.total {
            return None;
        }
        let subset = self.decode(self.counter);
        self.counter += 1;
        Some(subset)
    }

    fn progress(&self) -> u8 {
        percent(self.counter as f64 / self.total as f64)
    }

    fn evaluated(&self) -> usize {
        self.counter as usize
    }
}

// ============================================================================
// Sequential floating
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Add,
    Remove,
}

/// Mixed forward/backward floating selection with random restarts.
///
/// An ADD pass proposes the base subset plus each absent predictor; a REMOVE
/// pass proposes it minus each present non-forced predictor. At the end of a
/// pass the best improving flip is committed and the same pass repeats; a
/// fruitless ADD pass switches to REMOVE, and a fruitless REMOVE pass
/// restarts from a random base. The first restart uses the full pool.
#[derive(Debug, Clone)]
pub struct FloatingSearch {
    n: usize,
    free: usize,
    forced: PredictorSubset,
    base: PredictorSubset,
    phase: Phase,
    scan_index: usize,
    best_index: Option<usize>,
    best_score: Option<f64>,
    pending: Option<usize>,
    evaluated: HashSet<PredictorSubset>,
    cap: usize,
    budget: Duration,
    started: Option<Instant>,
    next_milestone: u32,
    first_restart: bool,
    restarts: usize,
    rng: ChaCha8Rng,
}

impl FloatingSearch {
    /// # Errors
    ///
    /// Returns [`FlowcastError::InvalidConfig`] when the forced mask width
    /// differs from `n`.
    pub fn new(
        n: usize,
        forced: PredictorSubset,
        budget: Duration,
        seed: Option<u64>,
    ) -> Result<Self, FlowcastError> {
        check_width(n, &forced)?;
        let free = n - forced.count_ones();
        let cap = if free >= usize::BITS as usize - 1 {
            usize::MAX
        } else {
            ((1_usize << free) - 1).max(1)
        };
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            n,
            free,
            base: forced.clone(),
            forced,
            phase: Phase::Add,
            scan_index: 0,
            best_index: None,
            best_score: None,
            pending: None,
            evaluated: HashSet::new(),
            cap,
            budget,
            started: None,
            next_milestone: 1,
            first_restart: true,
            restarts: 0,
            rng,
        })
    }


    fn elapsed(&self) -> Duration {
        self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    fn time_share(&self) -> f64 {
        if self.budget.is_zero() {
            return 1.0;
        }
        self.elapsed().as_secs_f64() / self.budget.as_secs_f64()
    }

    fn exhausted(&self) -> bool {
        self.evaluated.len() >= self.cap || self.elapsed() >= self.budget
    }

    fn log_milestones(&mut self) {
        let tenths = (self.time_share() * 10.0).floor() as u32;
        while self.next_milestone <= tenths.min(9) {
            tracing::info!(
                elapsed_secs = self.elapsed().as_secs(),
                evaluated = self.evaluated.len(),
                "Floating search {}% of time budget used",
                self.next_milestone * 10
            );
            self.next_milestone += 1;
        }
    }

    fn record(&mut self, last_score: f64, direction: ScoreDirection) {
        let Some(index) = self.pending.take() else {
            return;
        };
        let best = self.best_score.unwrap_or_else(|| direction.worst());
        if direction.is_better(last_score, best) {
            self.best_score = Some(last_score);
            self.best_index = Some(index);
        }
    }

    fn restart(&mut self) {
        self.base = if self.first_restart {
            self.first_restart = false;
            PredictorSubset::full(self.n)
        } else {
            let bits = (0..self.n).map(|_| self.rng.gen_bool(0.5)).collect();
            PredictorSubset::from_bits(bits).union(&self.forced)
        };
        self.phase = Phase::Add;
        self.scan_index = 0;
        self.best_index = None;
        self.best_score = None;
        self.restarts += 1;
        tracing::debug!(restarts = self.restarts, genome = %self.base.genome(), "Floating search restart");
    }

    /// Commits the end of a pass. Returns false when the search must stop.
    fn end_of_pass(&mut self) -> bool {
        self.scan_index = 0;
        match (self.phase, self.best_index.take()) {
            (_, Some(index)) => {
                self.base.toggle(index);
                self.base.union_with(&self.forced);
            }
            (Phase::Add, None) => self.phase = Phase::Remove,
            (Phase::Remove, None) => {
                if self.exhausted() {
                    return false;
                }
                self.restart();
            }
        }
        true
    }

    /// Neighbour of the base obtained by flipping bit `i`, if the current
    /// phase allows that flip.
    fn proposal(&self, i: usize) -> Option<PredictorSubset> {
        match self.phase {
            Phase::Add if !self.base.get(i) => Some(self.base.with_toggled(i)),
            Phase::Remove if self.base.get(i) && !self.forced.get(i) => {
                Some(self.base.with_toggled(i))
            }
            _ => None,
        }
    }
}

impl SubsetSearch for FloatingSearch {
    fn next(&mut self, last_score: f64, direction: ScoreDirection) -> Option<PredictorSubset> {
        if self.started.is_none() {
            tracing::info!(
                budget_secs = self.budget.as_secs_f64(),
                cap = self.cap,
                "Starting floating search"
            );
            self.started = Some(Instant::now());
        }
        self.record(last_score, direction);
        self.log_milestones();
        if self.exhausted() {
            return None;
        }
        if self.free == 0 {
            // nothing to flip: the forced set is the only candidate
            let only = self.forced.clone();
            return self.evaluated.insert(only.clone()).then_some(only);
        }

        let mut skips = 0;
        loop {
            if self.scan_index >= self.n {
                if !self.end_of_pass() {
                    return None;
                }
                continue;
            }

            let index = self.scan_index;
            self.scan_index += 1;
            match self.proposal(index) {
                Some(candidate) if self.evaluated.insert(candidate.clone()) => {
                    self.pending = Some(index);
                    return Some(candidate);
                }
                _ => {
                    skips += 1;
                    if skips > self.n {
                        if self.exhausted() {
                            return None;
                        }
                        self.restart();
                        skips = 0;
                    }
                }
            }
        }
    }

    fn progress(&self) -> u8 {
        let by_count = self.evaluated.len() as f64 / self.cap as f64;
        percent(self.time_share().max(by_count))
    }

    fn evaluated(&self) -> usize {
        self.evaluated.len()
    }
}

// ============================================================================
// Selection by kind
// ============================================================================

/// The closed set of search strategies, selected by [`FeatureSelectionKind`].
#[derive(Debug, Clone)]
pub enum SubsetSearcher {
    Exhaustive(ExhaustiveSearch),
    Floating(FloatingSearch),
}

impl SubsetSearcher {
    /// # Errors
    ///
    /// Propagates the constructor errors of the selected strategy.
    pub fn new(
        kind: FeatureSelectionKind,
        n: usize,
        forced: PredictorSubset,
        budget: Duration,
        seed: Option<u64>,
    ) -> Result<Self, FlowcastError> {
        Ok(match kind {
            FeatureSelectionKind::Exhaustive => Self::Exhaustive(ExhaustiveSearch::new(n, forced)?),
            FeatureSelectionKind::SequentialFloating => {
                Self::Floating(FloatingSearch::new(n, forced, budget, seed)?)
            }
        })
    }
}

impl SubsetSearch for SubsetSearcher {
    fn next(&mut self, last_score: f64, direction: ScoreDirection) -> Option<PredictorSubset> {
        match self {
            Self::Exhaustive(s) => s.next(last_score, direction),
            Self::Floating(s) => s.next(last_score, direction),
        }
    }

    fn progress(&self) -> u8 {
        match self {
            Self::Exhaustive(s) => s.progress(),
            Self::Floating(s) => s.progress(),
        }
    }

    fn evaluated(&self) -> usize {
        match self {
            Self::Exhaustive(s) => s.evaluated(),
            Self::Floating(s) => s.evaluated(),
        }
    }
}

fn check_width(n: usize, forced: &PredictorSubset) -> Result<(), FlowcastError> {
    if forced.len() == n {
        Ok(())
    } else {
        Err(FlowcastError::DimensionMismatch {
            expected: n,
            actual: forced.len(),
        })
    }
}

fn percent(share: f64) -> u8 {
    (share * 100.0).clamp(0.0, 100.0) as u8
}
