//! Immutable snapshot of a blocks-world arrangement

use super::block::{Block, Support};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Which blocks are clear and what every known block rests on.
///
/// The set of known blocks is the key set of `on` and never changes once the
/// state has been built. Operators produce new states instead of mutating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    clear: BTreeSet<Block>,
    on: BTreeMap<Block, Support>,
}

/// Ways a proposed state can break the clear/on invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("block {0} has no support (missing ON line)")]
    MissingSupport(Block),
    #[error("block {block} rests on unknown block {support}")]
    UnknownSupport { block: Block, support: Block },
    #[error("block {0} is marked clear but another block rests on it")]
    ClearButCovered(Block),
    #[error("block {0} has nothing on it but is not marked clear")]
    UncoveredButNotClear(Block),
    #[error("block {0} is marked clear but is not a known block")]
    UnknownClear(Block),
    #[error("block {0} rests on itself")]
    SelfSupport(Block),
    #[error("more than one block rests on {0}")]
    DoublyCovered(Block),
    #[error("block {0} is part of a cycle that never reaches the table")]
    Cycle(Block),
}

impl State {
    /// Build a state, checking that `clear` agrees with `on` and that every
    /// known block has a support.
    pub fn new(on: BTreeMap<Block, Support>, clear: BTreeSet<Block>) -> Result<Self, StateError> {
        let state = Self { clear, on };
        state.check_invariants()?;
        Ok(state)
    }

    /// Build a state whose clear set is derived from `on`
    pub fn from_on(on: BTreeMap<Block, Support>) -> Result<Self, StateError> {
        let covered: BTreeSet<&Block> = on.values().filter_map(Support::as_block).collect();
        let clear = on
            .keys()
            .filter(|block| !covered.contains(block))
            .cloned()
            .collect();
        Self::new(on, clear)
    }

    /// Build without checking; used by the operators, which preserve the invariant
    pub(crate) fn from_parts_unchecked(on: BTreeMap<Block, Support>, clear: BTreeSet<Block>) -> Self {
        Self { clear, on }
    }

    /// Verify `b ∈ clear ⇔ no block rests on b` and that supports are known blocks
    pub fn check_invariants(&self) -> Result<(), StateError> {
        let mut covered = BTreeSet::new();
        for (block, support) in &self.on {
            if let Support::Block(below) = support {
                if below == block {
                    return Err(StateError::SelfSupport(block.clone()));
                }
                if !self.on.contains_key(below) {
                    return Err(StateError::UnknownSupport {
                        block: block.clone(),
                        support: below.clone(),
                    });
                }
                if !covered.insert(below) {
                    return Err(StateError::DoublyCovered(below.clone()));
                }
            }
        }

        for start in self.on.keys() {
            let mut current = start;
            let mut steps = 0;
            while let Some(Support::Block(below)) = self.on.get(current) {
                steps += 1;
                if steps > self.on.len() {
                    return Err(StateError::Cycle(start.clone()));
                }
                current = below;
            }
        }

        for block in &self.clear {
            if !self.on.contains_key(block) {
                return Err(StateError::UnknownClear(block.clone()));
            }
            if covered.contains(block) {
                return Err(StateError::ClearButCovered(block.clone()));
            }
        }

        for block in self.on.keys() {
            if !covered.contains(block) && !self.clear.contains(block) {
                return Err(StateError::UncoveredButNotClear(block.clone()));
            }
        }

        Ok(())
    }

    /// Blocks with nothing resting on them
    pub fn clear(&self) -> &BTreeSet<Block> {
        &self.clear
    }

    /// Mapping from every known block to its support
    pub fn on(&self) -> &BTreeMap<Block, Support> {
        &self.on
    }

    pub fn is_clear(&self, block: &Block) -> bool {
        self.clear.contains(block)
    }

    pub fn is_known(&self, block: &Block) -> bool {
        self.on.contains_key(block)
    }

    /// What `block` currently rests on
    pub fn support_of(&self, block: &Block) -> Option<&Support> {
        self.on.get(block)
    }

    /// Whether `block` currently rests on `support`
    pub fn rests_on(&self, block: &Block, support: &Support) -> bool {
        self.on.get(block) == Some(support)
    }

    /// Iterate over all known blocks in order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.on.keys()
    }

    pub fn block_count(&self) -> usize {
        self.on.len()
    }

    /// Towers from bottom to top, ordered by their bottom block
    pub fn towers(&self) -> Vec<Vec<Block>> {
        let mut above: BTreeMap<&Block, &Block> = BTreeMap::new();
        for (block, support) in &self.on {
            if let Support::Block(below) = support {
                above.insert(below, block);
            }
        }

        self.on
            .iter()
            .filter(|(_, support)| support.is_table())
            .map(|(bottom, _)| {
                let mut tower = vec![bottom.clone()];
                let mut current = bottom;
                while let Some(next) = above.get(current) {
                    tower.push((*next).clone());
                    current = next;
                }
                tower
            })
            .collect()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tower in self.towers() {
            let names: Vec<&str> = tower.iter().map(Block::name).collect();
            writeln!(f, "Table | {}", names.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(name: &str) -> Block {
        Block::new(name)
    }

    fn stacked_state() -> State {
        // A on B, B on Table, C on Table
        let on = BTreeMap::from([
            (b("A"), Support::Block(b("B"))),
            (b("B"), Support::Table),
            (b("C"), Support::Table),
        ]);
        let clear = BTreeSet::from([b("A"), b("C")]);
        State::new(on, clear).unwrap()
    }

    #[test]
    fn test_valid_state_accessors() {
        let state = stacked_state();
        assert_eq!(state.block_count(), 3);
        assert!(state.is_clear(&b("A")));
        assert!(!state.is_clear(&b("B")));
        assert!(state.rests_on(&b("A"), &Support::Block(b("B"))));
        assert_eq!(state.support_of(&b("C")), Some(&Support::Table));
        assert!(!state.is_known(&b("Z")));
    }

    #[test]
    fn test_from_on_derives_clear_set() {
        let state = State::from_on(BTreeMap::from([
            (b("A"), Support::Block(b("B"))),
            (b("B"), Support::Table),
            (b("C"), Support::Table),
        ]))
        .unwrap();
        assert_eq!(state, stacked_state());
    }

    #[test]
    fn test_invariant_violations_are_reported() {
        let on = BTreeMap::from([(b("A"), Support::Block(b("B"))), (b("B"), Support::Table)]);

        let covered_clear = State::new(on.clone(), BTreeSet::from([b("A"), b("B")]));
        assert_eq!(covered_clear, Err(StateError::ClearButCovered(b("B"))));

        let missing_clear = State::new(on.clone(), BTreeSet::new());
        assert_eq!(missing_clear, Err(StateError::UncoveredButNotClear(b("A"))));

        let unknown_support = State::new(
            BTreeMap::from([(b("A"), Support::Block(b("Q")))]),
            BTreeSet::from([b("A")]),
        );
        assert!(matches!(unknown_support, Err(StateError::UnknownSupport { .. })));

        let self_support = State::new(
            BTreeMap::from([(b("A"), Support::Block(b("A")))]),
            BTreeSet::new(),
        );
        assert_eq!(self_support, Err(StateError::SelfSupport(b("A"))));

        let shared = State::new(
            BTreeMap::from([
                (b("A"), Support::Block(b("C"))),
                (b("B"), Support::Block(b("C"))),
                (b("C"), Support::Table),
            ]),
            BTreeSet::from([b("A"), b("B")]),
        );
        assert_eq!(shared, Err(StateError::DoublyCovered(b("C"))));

        let cycle = State::new(
            BTreeMap::from([
                (b("A"), Support::Block(b("B"))),
                (b("B"), Support::Block(b("A"))),
            ]),
            BTreeSet::new(),
        );
        assert!(matches!(cycle, Err(StateError::Cycle(_))));
    }

    #[test]
    fn test_towers_and_display() {
        let state = stacked_state();
        assert_eq!(state.towers(), vec![vec![b("B"), b("A")], vec![b("C")]]);
        assert_eq!(state.to_string(), "Table | B A\nTable | C\n");
    }
}
