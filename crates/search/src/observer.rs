use crate::candidate::ScoredCandidate;

/// Receives progress, status text and accepted candidates from a running
/// model search.
pub trait SearchObserver: Send {
    /// Overall completion across every regressor tuple, 0-100.
    fn on_progress(&mut self, _percent: u8) {}

    fn on_message(&mut self, _message: &str) {}

    fn on_candidate(&mut self, candidate: &ScoredCandidate);
}

/// Keeps every emitted candidate in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    pub candidates: Vec<ScoredCandidate>,
    pub last_progress: u8,
    pub messages: Vec<String>,
}

impl CollectingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_candidates(self) -> Vec<ScoredCandidate> {
        self.candidates
    }
}

impl SearchObserver for CollectingObserver {
    fn on_progress(&mut self, percent: u8) {
        self.last_progress = percent;
    }

    fn on_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn on_candidate(&mut self, candidate: &ScoredCandidate) {
        self.candidates.push(candidate.clone());
    }
}
