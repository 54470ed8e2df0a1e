//! Branch-and-bound search for shortest plans

pub mod successors;
pub mod engine;
pub mod parallel;

pub use successors::{branching_bound, Candidate, CompletedMove, CompletedMoves, SuccessorGenerator};
pub use engine::{
    AbortReason, BranchAndBound, NodeOutcome, SearchBudget, SearchOutcome, SearchStatistics,
    SearchStatus,
};
