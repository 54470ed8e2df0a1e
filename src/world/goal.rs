//! Goal predicate and the admissible remaining-moves heuristic

use super::block::{Block, Support};
use super::state::State;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A partially specified target arrangement.
///
/// Every `CLEAR` entry and every `ON` entry is one atomic goal condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    clear: BTreeSet<Block>,
    on: BTreeMap<Block, Support>,
}

impl Goal {
    pub fn new(on: BTreeMap<Block, Support>, clear: BTreeSet<Block>) -> Self {
        Self { clear, on }
    }

    /// Blocks required to be clear
    pub fn clear(&self) -> &BTreeSet<Block> {
        &self.clear
    }

    /// Required `block -> support` relations
    pub fn on(&self) -> &BTreeMap<Block, Support> {
        &self.on
    }

    /// Number of atomic goal conditions
    pub fn num_goals(&self) -> usize {
        self.clear.len() + self.on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_goals() == 0
    }

    /// True when every goal atom holds in `state`
    pub fn is_satisfied(&self, state: &State) -> bool {
        self.clear.iter().all(|block| state.is_clear(block))
            && self.on.iter().all(|(block, support)| state.rests_on(block, support))
    }

    /// Number of goal atoms that already hold in `state`
    pub fn count_satisfied(&self, state: &State) -> usize {
        let clear_met = self.clear.iter().filter(|block| state.is_clear(block)).count();
        let on_met = self
            .on
            .iter()
            .filter(|(block, support)| state.rests_on(block, support))
            .count();
        clear_met + on_met
    }

    /// Count of goal atoms not yet true.
    ///
    /// Never overestimates: every unmet atom needs at least one move.
    pub fn heuristic(&self, state: &State) -> usize {
        self.num_goals() - self.count_satisfied(state)
    }

    /// Moves taken so far plus the heuristic estimate
    pub fn f_score(&self, moves_so_far: usize, state: &State) -> usize {
        moves_so_far + self.heuristic(state)
    }

    /// Goal atoms still unmet in `state`, rendered as `CLEAR b` / `ON b s`
    pub fn unmet_atoms(&self, state: &State) -> Vec<String> {
        let clear = self
            .clear
            .iter()
            .filter(|block| !state.is_clear(block))
            .map(|block| format!("CLEAR {}", block));
        let on = self
            .on
            .iter()
            .filter(|(block, support)| !state.rests_on(block, support))
            .map(|(block, support)| format!("ON {} {}", block, support));
        clear.chain(on).collect()
    }

    /// Goal blocks or supports that the state does not know about
    pub fn unknown_blocks(&self, state: &State) -> BTreeSet<Block> {
        self.clear
            .iter()
            .chain(self.on.keys())
            .chain(self.on.values().filter_map(Support::as_block))
            .filter(|block| !state.is_known(block))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::operators::Action;

    fn b(name: &str) -> Block {
        Block::new(name)
    }

    fn initial() -> State {
        // A on B, B on Table, C on Table
        State::from_on(BTreeMap::from([
            (b("A"), Support::Block(b("B"))),
            (b("B"), Support::Table),
            (b("C"), Support::Table),
        ]))
        .unwrap()
    }

    fn goal() -> Goal {
        Goal::new(
            BTreeMap::from([(b("A"), Support::Table)]),
            BTreeSet::from([b("B")]),
        )
    }

    #[test]
    fn test_counts_and_heuristic() {
        let state = initial();
        let goal = goal();

        assert_eq!(goal.num_goals(), 2);
        assert_eq!(goal.count_satisfied(&state), 0);
        assert_eq!(goal.heuristic(&state), 2);
        assert_eq!(goal.f_score(3, &state), 5);
        assert!(!goal.is_satisfied(&state));
        assert_eq!(goal.unmet_atoms(&state), vec!["CLEAR B", "ON A Table"]);
    }

    #[test]
    fn test_one_move_satisfies_two_atoms() {
        let goal = goal();
        let next = Action::MoveToTable { block: b("A"), from: b("B") }
            .apply(&initial())
            .unwrap();

        assert_eq!(goal.heuristic(&next), 0);
        assert!(goal.is_satisfied(&next));
        assert!(goal.unmet_atoms(&next).is_empty());
    }

    #[test]
    fn test_heuristic_bounds_over_reachable_states() {
        let goal = Goal::new(
            BTreeMap::from([(b("C"), Support::Block(b("A"))), (b("B"), Support::Block(b("C")))]),
            BTreeSet::from([b("B")]),
        );
        let mut frontier = vec![initial()];
        let mut seen = BTreeSet::new();

        while let Some(state) = frontier.pop() {
            let key = format!("{:?}", state);
            if !seen.insert(key) {
                continue;
            }
            let h = goal.heuristic(&state);
            assert!(h <= goal.num_goals());
            if h == 0 {
                assert!(goal.is_satisfied(&state));
            }
            for block in state.clear().clone() {
                let from = state.support_of(&block).cloned().unwrap();
                for target in state.blocks().cloned().collect::<Vec<_>>() {
                    let action = Action::Move { block: block.clone(), from: from.clone(), to: target };
                    if let Ok(next) = action.apply(&state) {
                        frontier.push(next);
                    }
                }
                if let Some(below) = from.as_block() {
                    let action = Action::MoveToTable { block: block.clone(), from: below.clone() };
                    frontier.push(action.apply(&state).unwrap());
                }
            }
        }

        // 3 blocks have 13 arrangements
        assert_eq!(seen.len(), 13);
    }

    #[test]
    fn test_empty_goal_is_trivially_satisfied() {
        let goal = Goal::default();
        assert!(goal.is_empty());
        assert!(goal.is_satisfied(&initial()));
        assert_eq!(goal.heuristic(&initial()), 0);
    }

    #[test]
    fn test_unknown_goal_blocks() {
        let goal = Goal::new(BTreeMap::from([(b("A"), Support::Block(b("Z")))]), BTreeSet::new());
        assert_eq!(goal.unknown_blocks(&initial()), BTreeSet::from([b("Z")]));
    }
}
