//! Predictor subset search and the model search loop.
//!
//! [`ModelSearch`] runs each configured regressor tuple over the predictor
//! pool, asking a [`SubsetSearcher`] for subsets and streaming every valid
//! [`ScoredCandidate`] to a [`SearchObserver`].

pub mod candidate;
pub mod observer;
pub mod orchestrator;
pub mod subset_search;

pub use candidate::{rank_candidates, ScoredCandidate};
pub use observer::{CollectingObserver, SearchObserver};
pub use orchestrator::{ModelSearch, PreparedPool, SearchSummary};
pub use subset_search::{ExhaustiveSearch, FloatingSearch, SubsetSearch, SubsetSearcher};
