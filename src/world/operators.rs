//! The two move operators and their preconditions
//!
//! Both operators are pure: they check every precondition against the input
//! state and either return a fresh successor state or a typed violation,
//! leaving the input untouched.

use super::block::{Block, Support};
use super::state::State;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single move, also used as the label recorded on a search branch.
///
/// The derived ordering (every `Move` before every `MoveToTable`, then by
/// block names) is the deterministic tie-break used by the search.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Move `block` from `from` onto the block `to`
    Move { block: Block, from: Support, to: Block },
    /// Move `block` from the block `from` down to the table
    MoveToTable { block: Block, from: Block },
}

/// Why an operator refused to apply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("{0} is not a known block")]
    UnknownBlock(Block),
    #[error("{0} is not clear")]
    NotClear(Block),
    #[error("{block} rests on {actual}, not on {expected}")]
    WrongSupport {
        block: Block,
        expected: Support,
        actual: Support,
    },
    #[error("{0} cannot be moved onto or from itself")]
    SameBlock(Block),
    #[error("{0} already rests on the table")]
    AlreadyOnTable(Block),
}

impl Action {
    /// The block being moved
    pub fn block(&self) -> &Block {
        match self {
            Action::Move { block, .. } | Action::MoveToTable { block, .. } => block,
        }
    }

    /// Check every precondition of this action against `state`
    pub fn check(&self, state: &State) -> Result<(), PreconditionViolation> {
        match self {
            Action::Move { block, from, to } => check_move(state, block, from, to),
            Action::MoveToTable { block, from } => {
                check_move_to_table(state, block, &Support::Block(from.clone()))
            }
        }
    }

    pub fn is_applicable(&self, state: &State) -> bool {
        self.check(state).is_ok()
    }

    /// Apply this action, producing the successor state
    pub fn apply(&self, state: &State) -> Result<State, PreconditionViolation> {
        match self {
            Action::Move { block, from, to } => move_block(state, block, from, to),
            Action::MoveToTable { block, from } => {
                move_to_table(state, block, &Support::Block(from.clone()))
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { block, from, to } => write!(f, "Move({}, {}, {})", block, from, to),
            Action::MoveToTable { block, from } => write!(f, "MoveToTable({}, {})", block, from),
        }
    }
}

/// Preconditions of `Move(b, x, y)`: b and y known, both clear, b rests on x,
/// and b differs from both x and y.
pub fn check_move(
    state: &State,
    block: &Block,
    from: &Support,
    to: &Block,
) -> Result<(), PreconditionViolation> {
    if !state.is_known(block) {
        return Err(PreconditionViolation::UnknownBlock(block.clone()));
    }
    if !state.is_known(to) {
        return Err(PreconditionViolation::UnknownBlock(to.clone()));
    }
    if block == to || from.as_block() == Some(block) {
        return Err(PreconditionViolation::SameBlock(block.clone()));
    }
    if !state.is_clear(block) {
        return Err(PreconditionViolation::NotClear(block.clone()));
    }
    if !state.is_clear(to) {
        return Err(PreconditionViolation::NotClear(to.clone()));
    }
    check_support(state, block, from)
}

pub fn can_move(state: &State, block: &Block, from: &Support, to: &Block) -> bool {
    check_move(state, block, from, to).is_ok()
}

/// Move `block` from `from` onto `to`.
///
/// Postconditions: `block` rests on `to`, `to` is no longer clear, and `from`
/// becomes clear unless it is the table.
pub fn move_block(
    state: &State,
    block: &Block,
    from: &Support,
    to: &Block,
) -> Result<State, PreconditionViolation> {
    check_move(state, block, from, to)?;

    let mut on = state.on().clone();
    let mut clear = state.clear().clone();
    on.insert(block.clone(), Support::Block(to.clone()));
    clear.remove(to);
    if let Support::Block(below) = from {
        clear.insert(below.clone());
    }
    Ok(State::from_parts_unchecked(on, clear))
}

/// Preconditions of `MoveToTable(b, x)`: b known and clear, b rests on x, and
/// x is a block. Moving a block that already rests on the table is refused.
pub fn check_move_to_table(
    state: &State,
    block: &Block,
    from: &Support,
) -> Result<(), PreconditionViolation> {
    if !state.is_known(block) {
        return Err(PreconditionViolation::UnknownBlock(block.clone()));
    }
    if !state.is_clear(block) {
        return Err(PreconditionViolation::NotClear(block.clone()));
    }
    check_support(state, block, from)?;
    if from.is_table() {
        return Err(PreconditionViolation::AlreadyOnTable(block.clone()));
    }
    Ok(())
}

pub fn can_move_to_table(state: &State, block: &Block, from: &Support) -> bool {
    check_move_to_table(state, block, from).is_ok()
}

/// Move `block` from `from` to the table; `from` becomes clear.
pub fn move_to_table(
    state: &State,
    block: &Block,
    from: &Support,
) -> Result<State, PreconditionViolation> {
    check_move_to_table(state, block, from)?;

    let mut on = state.on().clone();
    let mut clear = state.clear().clone();
    on.insert(block.clone(), Support::Table);
    if let Support::Block(below) = from {
        clear.insert(below.clone());
    }
    Ok(State::from_parts_unchecked(on, clear))
}

fn check_support(state: &State, block: &Block, expected: &Support) -> Result<(), PreconditionViolation> {
    match state.support_of(block) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(PreconditionViolation::WrongSupport {
            block: block.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        }),
        None => Err(PreconditionViolation::UnknownBlock(block.clone())),
    }
}
