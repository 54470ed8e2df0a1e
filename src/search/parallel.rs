//! Parallel root split for the branch-and-bound search
//!
//! The root's children are explored as independent rayon tasks. They share
//! the engine's atomic best bound, which only ever decreases, while every
//! task keeps its own states, move records and branch path.

use super::engine::{BranchAndBound, NodeOutcome, SearchOutcome, SearchStatus};
use super::successors::CompletedMoves;
use crate::config::PruningStrategy;
use crate::world::State;
use rayon::prelude::*;
use tracing::{debug, info};

impl BranchAndBound<'_> {
    /// Find a shortest plan, exploring the root's children in parallel.
    ///
    /// The plan length is optimal as in [`BranchAndBound::solve`]; when
    /// several optimal plans exist the one returned may differ from the
    /// sequential search.
    pub fn solve_parallel(&self, initial: &State) -> SearchOutcome {
        if let Some(trivial) = self.trivial_outcome(initial) {
            return trivial;
        }

        let root_path = self.initial_path(initial);
        let candidates = self.expand(initial, &CompletedMoves::new(), 0, &root_path);

        info!(
            blocks = initial.block_count(),
            goal_atoms = self.goal.num_goals(),
            root_branches = candidates.len(),
            threads = rayon::current_num_threads(),
            "starting parallel branch-and-bound search"
        );

        // a one-move plan cannot be beaten
        if let Some(winner) = candidates
            .iter()
            .find(|candidate| self.goal.is_satisfied(&candidate.state))
        {
            return self.conclude(NodeOutcome {
                status: SearchStatus::Done,
                bound: 1,
                solution: Some(winner.moves.clone()),
            });
        }

        let tracks_path = self.generator.pruning() == PruningStrategy::VisitedStates;
        let outcomes: Vec<(usize, NodeOutcome)> = candidates
            .into_par_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let mut path = root_path.clone();
                if tracks_path {
                    path.insert(candidate.state.clone());
                }
                let outcome = self.search(&candidate.state, &candidate.moves, 1, usize::MAX, &mut path);
                debug!(branch = index, status = ?outcome.status, bound = outcome.bound, "root branch finished");
                (index, outcome)
            })
            .collect();

        self.conclude(merge_root_outcomes(outcomes))
    }
}

/// Combine the root branches: shortest plan wins, ties go to the earlier
/// branch in best-first order, and any abort marks the whole search aborted.
fn merge_root_outcomes(outcomes: Vec<(usize, NodeOutcome)>) -> NodeOutcome {
    let aborted = outcomes
        .iter()
        .any(|(_, outcome)| outcome.status == SearchStatus::Aborted);

    let best = outcomes
        .into_iter()
        .filter(|(_, outcome)| outcome.solution.is_some())
        .min_by_key(|(index, outcome)| (outcome.bound, *index))
        .map(|(_, outcome)| outcome);

    let status = match (aborted, best.is_some()) {
        (true, _) => SearchStatus::Aborted,
        (false, true) => SearchStatus::Done,
        (false, false) => SearchStatus::Continue,
    };

    match best {
        Some(outcome) => NodeOutcome { status, ..outcome },
        None => NodeOutcome {
            status,
            bound: usize::MAX,
            solution: None,
        },
    }
}
