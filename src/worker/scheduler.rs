// ABOUTME: Worker selection heuristic for dispatching a pending build.
// ABOUTME: Picks the highest-readiness candidate; earlier candidates win ties.

use nonempty::NonEmpty;

use super::state::WorkerState;
use crate::types::WorkerId;

/// A worker as seen by the scheduler: identity plus current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: WorkerId,
    pub state: WorkerState,
}

impl Candidate {
    pub fn new(id: impl Into<String>, state: WorkerState) -> Self {
        Self {
            id: WorkerId::new(id),
            state,
        }
    }
}

/// Select the worker that should run the next build.
///
/// Scans candidates in their given order and keeps the first one whose
/// readiness rank is strictly higher than anything seen before, so an
/// earlier candidate wins against a later one in the same state. The
/// `NonEmpty` input makes an empty candidate set unrepresentable;
/// callers guarantee at least one candidate before scheduling.
pub fn select_worker(candidates: &NonEmpty<Candidate>) -> &Candidate {
    let mut best = candidates.first();
    let mut best_rank = best.state.readiness_rank();

    for candidate in candidates.tail() {
        let rank = candidate.state.readiness_rank();
        if rank > best_rank {
            best = candidate;
            best_rank = rank;
        }
    }

    best
}
