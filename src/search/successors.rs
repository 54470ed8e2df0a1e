//! Successor generation for the branch-and-bound search

use crate::config::PruningStrategy;
use crate::world::operators::{can_move, can_move_to_table};
use crate::world::{Action, Goal, State, Support};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A move taken on the current branch, with its position in the sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMove {
    pub action: Action,
    pub order: usize,
}

/// Append-only record of the moves taken along one search branch.
///
/// Children get their own extended copy, so siblings never observe each
/// other's moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedMoves {
    moves: Vec<CompletedMove>,
}

impl CompletedMoves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an identical move was already taken on this branch
    pub fn contains(&self, action: &Action) -> bool {
        self.moves.iter().any(|taken| taken.action == *action)
    }

    /// A copy of this record with `action` appended at the next index
    pub fn with(&self, action: Action) -> Self {
        let mut moves = Vec::with_capacity(self.moves.len() + 1);
        moves.extend_from_slice(&self.moves);
        moves.push(CompletedMove {
            action,
            order: self.moves.len(),
        });
        Self { moves }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn entries(&self) -> &[CompletedMove] {
        &self.moves
    }

    /// The moves in the order they were taken
    pub fn into_actions(self) -> Vec<Action> {
        let mut moves = self.moves;
        moves.sort_by_key(|taken| taken.order);
        moves.into_iter().map(|taken| taken.action).collect()
    }
}

/// A child of the current node, ready to be explored
#[derive(Debug, Clone)]
pub struct Candidate {
    pub action: Action,
    pub state: State,
    pub moves: CompletedMoves,
    pub f_score: usize,
}

/// Enumerates legal, not-yet-attempted moves from a state
pub struct SuccessorGenerator<'a> {
    goal: &'a Goal,
    pruning: PruningStrategy,
}

impl<'a> SuccessorGenerator<'a> {
    pub fn new(goal: &'a Goal, pruning: PruningStrategy) -> Self {
        Self { goal, pruning }
    }

    pub fn pruning(&self) -> PruningStrategy {
        self.pruning
    }

    /// All candidates reachable in one move from `state`.
    ///
    /// `moves_so_far` is the depth of `state`; `path` holds the states on
    /// the current branch and is only consulted under
    /// [`PruningStrategy::VisitedStates`].
    pub fn generate(
        &self,
        state: &State,
        moves: &CompletedMoves,
        moves_so_far: usize,
        path: &HashSet<State>,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for block in state.clear() {
            let Some(from) = state.support_of(block) else {
                continue;
            };

            for target in state.blocks() {
                if !can_move(state, block, from, target) {
                    continue;
                }
                let action = Action::Move {
                    block: block.clone(),
                    from: from.clone(),
                    to: target.clone(),
                };
                self.push_candidate(&mut candidates, state, moves, moves_so_far, path, action);
            }

            if can_move_to_table(state, block, from) {
                if let Support::Block(below) = from {
                    let action = Action::MoveToTable {
                        block: block.clone(),
                        from: below.clone(),
                    };
                    self.push_candidate(&mut candidates, state, moves, moves_so_far, path, action);
                }
            }
        }

        candidates
    }

    fn push_candidate(
        &self,
        candidates: &mut Vec<Candidate>,
        state: &State,
        moves: &CompletedMoves,
        moves_so_far: usize,
        path: &HashSet<State>,
        action: Action,
    ) {
        if self.pruning == PruningStrategy::CompletedMoves && moves.contains(&action) {
            return;
        }

        // preconditions were checked by the caller
        let Ok(child) = action.apply(state) else {
            return;
        };

        if self.pruning == PruningStrategy::VisitedStates && path.contains(&child) {
            return;
        }

        let f_score = self.goal.f_score(moves_so_far + 1, &child);
        candidates.push(Candidate {
            moves: moves.with(action.clone()),
            action,
            state: child,
            f_score,
        });
    }
}

/// Number of (block, target) pairs the generator may consider from `state`
pub fn branching_bound(state: &State) -> usize {
    state.clear().len() * state.block_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Block;
    use std::collections::{BTreeMap, BTreeSet};

    fn b(name: &str) -> Block {
        Block::new(name)
    }

    /// A on B, B on Table, C on Table
    fn state() -> State {
        State::from_on(BTreeMap::from([
            (b("A"), Support::Block(b("B"))),
            (b("B"), Support::Table),
            (b("C"), Support::Table),
        ]))
        .unwrap()
    }

    fn goal() -> Goal {
        Goal::new(BTreeMap::from([(b("A"), Support::Table)]), BTreeSet::new())
    }

    #[test]
    fn test_generates_every_legal_move() {
        let goal = goal();
        let generator = SuccessorGenerator::new(&goal, PruningStrategy::CompletedMoves);
        let candidates = generator.generate(&state(), &CompletedMoves::new(), 0, &HashSet::new());

        let labels: BTreeSet<String> = candidates.iter().map(|c| c.action.to_string()).collect();
        assert_eq!(
            labels,
            BTreeSet::from([
                "Move(A, B, C)".to_string(),
                "MoveToTable(A, B)".to_string(),
                "Move(C, Table, A)".to_string(),
            ])
        );
        assert!(candidates.len() <= branching_bound(&state()));

        for candidate in &candidates {
            candidate.state.check_invariants().unwrap();
            assert_eq!(candidate.moves.len(), 1);
            assert_eq!(candidate.moves.entries()[0].order, 0);
        }
    }

    #[test]
    fn test_f_scores() {
        let goal = goal();
        let generator = SuccessorGenerator::new(&goal, PruningStrategy::CompletedMoves);
        let candidates = generator.generate(&state(), &CompletedMoves::new(), 2, &HashSet::new());

        for candidate in candidates {
            let expected = if candidate.action.to_string() == "MoveToTable(A, B)" { 3 } else { 4 };
            assert_eq!(candidate.f_score, expected, "{}", candidate.action);
        }
    }

    #[test]
    fn test_completed_moves_are_not_repeated() {
        let goal = goal();
        let generator = SuccessorGenerator::new(&goal, PruningStrategy::CompletedMoves);
        let taken = CompletedMoves::new().with(Action::Move {
            block: b("C"),
            from: Support::Table,
            to: b("A"),
        });

        let candidates = generator.generate(&state(), &taken, 1, &HashSet::new());
        assert!(candidates.iter().all(|c| c.action.to_string() != "Move(C, Table, A)"));
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.moves.len() == 2));
    }

    #[test]
    fn test_visited_states_are_not_revisited() {
        let goal = goal();
        let generator = SuccessorGenerator::new(&goal, PruningStrategy::VisitedStates);
        let start = state();
        let unstacked = Action::MoveToTable { block: b("A"), from: b("B") }.apply(&start).unwrap();

        let path = HashSet::from([start.clone(), unstacked.clone()]);
        let taken = CompletedMoves::new().with(Action::MoveToTable { block: b("A"), from: b("B") });
        let candidates = generator.generate(&unstacked, &taken, 1, &path);

        // putting A back on B would return to the start state
        assert!(candidates.iter().all(|c| c.state != start));
        assert!(candidates.iter().all(|c| !path.contains(&c.state)));
        assert!(!candidates.is_empty());
    }

    #[test]
    fn test_completed_moves_keep_order() {
        let first = Action::MoveToTable { block: b("A"), from: b("B") };
        let second = Action::Move { block: b("B"), from: Support::Table, to: b("A") };
        let moves = CompletedMoves::new().with(first.clone()).with(second.clone());

        assert!(moves.contains(&first));
        assert_eq!(moves.into_actions(), vec![first, second]);
    }
}
