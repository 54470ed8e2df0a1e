//! Branch-and-bound depth-first search for a shortest plan
//!
//! Each call explores one node and returns `(status, bound, solution)`.
//! Children are visited best-first by f-score so that a tight bound is found
//! early; any branch whose length already reaches the bound is cut.
//!
//! Counters, the best bound and the abort flag live in atomics so the same
//! engine can be shared by the parallel root split in `parallel.rs`.

use super::successors::{Candidate, CompletedMoves, SuccessorGenerator};
use crate::config::{PruningStrategy, SearchConfig};
use crate::world::{Action, Goal, State};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Limits checked at every call entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    /// Longest plan considered; deeper branches are cut
    pub max_depth: Option<usize>,
    /// Node expansions before the whole search aborts
    pub max_nodes: Option<u64>,
    /// Wall-clock time before the whole search aborts
    pub time_limit: Option<Duration>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }
}

impl From<&SearchConfig> for SearchBudget {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_nodes: config.max_nodes,
            time_limit: config.time_limit(),
        }
    }
}

/// Status of one recursive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Nothing better than the incoming bound below this node
    Continue,
    /// A plan shorter than the incoming bound was found
    Done,
    /// The budget ran out; the search is unwinding
    Aborted,
}

/// Result of exploring one node
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub status: SearchStatus,
    pub bound: usize,
    pub solution: Option<CompletedMoves>,
}

impl NodeOutcome {
    fn with_status(status: SearchStatus, bound: usize) -> Self {
        Self {
            status,
            bound,
            solution: None,
        }
    }
}

/// Why a search stopped before exhausting the tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    NodeBudget { limit: u64 },
    TimeLimit { seconds: f64 },
    /// Every remaining branch was cut at the depth limit
    DepthLimit { limit: usize },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NodeBudget { limit } => write!(f, "node budget of {} expansions exhausted", limit),
            AbortReason::TimeLimit { seconds } => write!(f, "time limit of {:.1}s reached", seconds),
            AbortReason::DepthLimit { limit } => write!(f, "no plan within depth {}", limit),
        }
    }
}

/// Final answer of a search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A provably shortest plan (possibly empty)
    Solved(Vec<Action>),
    /// The tree was exhausted without reaching the goal
    NoSolution,
    /// The budget ran out; `best` is the shortest plan seen, not proven optimal
    Aborted {
        reason: AbortReason,
        best: Option<Vec<Action>>,
    },
}

/// Counters collected while searching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub nodes_expanded: u64,
    pub candidates_generated: u64,
    pub bound_improvements: u64,
    pub deepest_level: usize,
    pub truncated_branches: u64,
    pub elapsed_ms: u64,
}

impl fmt::Display for SearchStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search Statistics:")?;
        writeln!(f, "  Nodes expanded: {}", self.nodes_expanded)?;
        writeln!(f, "  Candidates generated: {}", self.candidates_generated)?;
        writeln!(f, "  Bound improvements: {}", self.bound_improvements)?;
        writeln!(f, "  Deepest level: {}", self.deepest_level)?;
        writeln!(f, "  Truncated branches: {}", self.truncated_branches)?;
        writeln!(f, "  Elapsed: {}ms", self.elapsed_ms)
    }
}

/// Branch-and-bound planner over the successor relation
pub struct BranchAndBound<'a> {
    pub(super) goal: &'a Goal,
    pub(super) generator: SuccessorGenerator<'a>,
    budget: SearchBudget,
    started: Instant,
    best_bound: AtomicUsize,
    nodes_expanded: AtomicU64,
    candidates_generated: AtomicU64,
    bound_improvements: AtomicU64,
    deepest_level: AtomicUsize,
    truncated_branches: AtomicU64,
    abort: OnceLock<AbortReason>,
}

impl<'a> BranchAndBound<'a> {
    pub fn new(goal: &'a Goal, pruning: PruningStrategy, budget: SearchBudget) -> Self {
        Self {
            goal,
            generator: SuccessorGenerator::new(goal, pruning),
            budget,
            started: Instant::now(),
            best_bound: AtomicUsize::new(usize::MAX),
            nodes_expanded: AtomicU64::new(0),
            candidates_generated: AtomicU64::new(0),
            bound_improvements: AtomicU64::new(0),
            deepest_level: AtomicUsize::new(0),
            truncated_branches: AtomicU64::new(0),
            abort: OnceLock::new(),
        }
    }

    /// Build an engine from the search section of the settings
    pub fn from_config(goal: &'a Goal, config: &SearchConfig) -> Self {
        Self::new(goal, config.pruning, SearchBudget::from(config))
    }

    /// Find a shortest plan from `initial` on the current thread
    pub fn solve(&self, initial: &State) -> SearchOutcome {
        if let Some(trivial) = self.trivial_outcome(initial) {
            return trivial;
        }

        info!(
            blocks = initial.block_count(),
            goal_atoms = self.goal.num_goals(),
            heuristic = self.goal.heuristic(initial),
            pruning = ?self.generator.pruning(),
            "starting branch-and-bound search"
        );

        let mut path = self.initial_path(initial);
        let outcome = self.search(initial, &CompletedMoves::new(), 0, usize::MAX, &mut path);
        self.conclude(outcome)
    }

    /// Zero goal atoms, or an initial state already satisfying the goal
    pub(super) fn trivial_outcome(&self, initial: &State) -> Option<SearchOutcome> {
        if self.goal.is_empty() {
            info!("goal has no conditions; empty plan");
            return Some(SearchOutcome::Solved(Vec::new()));
        }
        if self.goal.is_satisfied(initial) {
            info!("initial state already satisfies the goal; empty plan");
            return Some(SearchOutcome::Solved(Vec::new()));
        }
        // moves never add blocks, so a goal naming an absent one never holds
        let unknown = self.goal.unknown_blocks(initial);
        if !unknown.is_empty() {
            info!(unknown_blocks = unknown.len(), "goal names blocks absent from the initial state; no plan");
            return Some(SearchOutcome::NoSolution);
        }
        None
    }

    pub(super) fn initial_path(&self, initial: &State) -> HashSet<State> {
        let mut path = HashSet::new();
        if self.generator.pruning() == PruningStrategy::VisitedStates {
            path.insert(initial.clone());
        }
        path
    }

    /// Explore the node `state`, reached by `moves` after `depth` moves.
    ///
    /// `path` holds the states on the current branch and is only maintained
    /// under visited-state pruning.
    pub fn search(
        &self,
        state: &State,
        moves: &CompletedMoves,
        depth: usize,
        best_bound: usize,
        path: &mut HashSet<State>,
    ) -> NodeOutcome {
        let mut best_bound = best_bound.min(self.best_bound.load(Ordering::Acquire));
        if depth >= best_bound {
            return NodeOutcome::with_status(SearchStatus::Continue, best_bound);
        }
        if self.budget_exhausted() {
            return NodeOutcome::with_status(SearchStatus::Aborted, best_bound);
        }
        if let Some(limit) = self.budget.max_depth {
            if depth >= limit {
                self.truncated_branches.fetch_add(1, Ordering::Relaxed);
                return NodeOutcome::with_status(SearchStatus::Continue, best_bound);
            }
        }

        let candidates = self.expand(state, moves, depth, path);

        let mut status = SearchStatus::Continue;
        let mut solution = None;

        for candidate in candidates {
            // sorted by f-score, and no plan through this child beats f
            if candidate.f_score >= best_bound {
                break;
            }

            if self.goal.is_satisfied(&candidate.state) {
                let length = depth + 1;
                self.record_improvement(length, &candidate.action);
                return NodeOutcome {
                    status: SearchStatus::Done,
                    bound: length,
                    solution: Some(candidate.moves),
                };
            }

            let tracks_path = self.generator.pruning() == PruningStrategy::VisitedStates;
            if tracks_path {
                path.insert(candidate.state.clone());
            }
            let child = self.search(&candidate.state, &candidate.moves, depth + 1, best_bound, path);
            if tracks_path {
                path.remove(&candidate.state);
            }

            let improved = child.bound < best_bound && child.solution.is_some();
            if improved {
                best_bound = child.bound;
                solution = child.solution;
                status = SearchStatus::Done;
            }

            if child.status == SearchStatus::Aborted {
                return NodeOutcome {
                    status: SearchStatus::Aborted,
                    bound: best_bound,
                    solution,
                };
            }
        }

        NodeOutcome {
            status,
            bound: best_bound,
            solution,
        }
    }

    /// Count the node and produce its children, best first
    pub(super) fn expand(
        &self,
        state: &State,
        moves: &CompletedMoves,
        depth: usize,
        path: &HashSet<State>,
    ) -> Vec<Candidate> {
        self.nodes_expanded.fetch_add(1, Ordering::Relaxed);
        self.deepest_level.fetch_max(depth, Ordering::Relaxed);

        let candidates: Vec<Candidate> = self
            .generator
            .generate(state, moves, depth, path)
            .into_iter()
            .sorted_by(|a, b| a.f_score.cmp(&b.f_score).then_with(|| a.action.cmp(&b.action)))
            .collect();
        self.candidates_generated
            .fetch_add(candidates.len() as u64, Ordering::Relaxed);

        trace!(
            depth,
            candidates = candidates.len(),
            best_f = candidates.first().map(|c| c.f_score),
            "expanded node"
        );
        candidates
    }

    fn record_improvement(&self, length: usize, last: &Action) {
        let previous = self.best_bound.fetch_min(length, Ordering::AcqRel);
        if length < previous {
            self.bound_improvements.fetch_add(1, Ordering::Relaxed);
            debug!(length, last_move = %last, "found shorter plan");
        }
    }

    fn budget_exhausted(&self) -> bool {
        if self.abort.get().is_some() {
            return true;
        }
        if let Some(limit) = self.budget.max_nodes {
            if self.nodes_expanded.load(Ordering::Relaxed) >= limit {
                let _ = self.abort.set(AbortReason::NodeBudget { limit });
                return true;
            }
        }
        if let Some(limit) = self.budget.time_limit {
            if self.started.elapsed() >= limit {
                let _ = self.abort.set(AbortReason::TimeLimit {
                    seconds: limit.as_secs_f64(),
                });
                return true;
            }
        }
        false
    }

    /// Turn the root's outcome into a final answer
    pub(super) fn conclude(&self, outcome: NodeOutcome) -> SearchOutcome {
        let plan = outcome.solution.map(CompletedMoves::into_actions);

        let result = match (self.abort.get(), outcome.status, plan) {
            (Some(reason), _, best) => SearchOutcome::Aborted {
                reason: *reason,
                best,
            },
            (None, SearchStatus::Done, Some(plan)) => SearchOutcome::Solved(plan),
            (None, _, _) if self.truncated_branches.load(Ordering::Relaxed) > 0 => {
                SearchOutcome::Aborted {
                    reason: AbortReason::DepthLimit {
                        limit: self.budget.max_depth.unwrap_or_default(),
                    },
                    best: None,
                }
            }
            (None, _, _) => SearchOutcome::NoSolution,
        };

        let statistics = self.statistics();
        match &result {
            SearchOutcome::Solved(plan) => info!(
                length = plan.len(),
                nodes = statistics.nodes_expanded,
                elapsed_ms = statistics.elapsed_ms,
                "search finished with an optimal plan"
            ),
            SearchOutcome::NoSolution => info!(
                nodes = statistics.nodes_expanded,
                elapsed_ms = statistics.elapsed_ms,
                "search tree exhausted without reaching the goal"
            ),
            SearchOutcome::Aborted { reason, best } => info!(
                %reason,
                best_length = best.as_ref().map(Vec::len),
                nodes = statistics.nodes_expanded,
                "search aborted"
            ),
        }

        result
    }

    /// Snapshot of the counters so far
    pub fn statistics(&self) -> SearchStatistics {
        SearchStatistics {
            nodes_expanded: self.nodes_expanded.load(Ordering::Relaxed),
            candidates_generated: self.candidates_generated.load(Ordering::Relaxed),
            bound_improvements: self.bound_improvements.load(Ordering::Relaxed),
            deepest_level: self.deepest_level.load(Ordering::Relaxed),
            truncated_branches: self.truncated_branches.load(Ordering::Relaxed),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
