//! Plan representation and persistence

use crate::config::PruningStrategy;
use crate::search::{AbortReason, SearchOutcome, SearchStatistics};
use crate::world::Action;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a search run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanStatus {
    /// The moves form a provably shortest plan
    Optimal,
    /// No sequence of moves reaches the goal
    NoSolution,
    /// The budget ran out; any moves are the best found, not proven shortest
    Aborted { reason: AbortReason },
}

/// The result of planning one problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Moves in the order they are executed
    pub moves: Vec<Action>,
    pub length: usize,
    pub status: PlanStatus,
    pub metadata: PlanMetadata,
}

/// Details about the run that produced a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub pruning: PruningStrategy,
    pub parallel: bool,
    pub statistics: SearchStatistics,
}

impl Plan {
    /// Build a plan from a finished search
    pub fn from_outcome(outcome: SearchOutcome, metadata: PlanMetadata) -> Self {
        let (moves, status) = match outcome {
            SearchOutcome::Solved(moves) => (moves, PlanStatus::Optimal),
            SearchOutcome::NoSolution => (Vec::new(), PlanStatus::NoSolution),
            SearchOutcome::Aborted { reason, best } => {
                (best.unwrap_or_default(), PlanStatus::Aborted { reason })
            }
        };

        Self {
            length: moves.len(),
            moves,
            status,
            metadata,
        }
    }

    /// Whether the moves reach the goal (optimal, or the best of an aborted run)
    pub fn has_moves_to_goal(&self) -> bool {
        match self.status {
            PlanStatus::Optimal => true,
            PlanStatus::NoSolution => false,
            PlanStatus::Aborted { .. } => !self.moves.is_empty(),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == PlanStatus::Optimal
    }

    /// Move labels, one per step
    pub fn labels(&self) -> Vec<String> {
        self.moves.iter().map(ToString::to_string).collect()
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Create from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Save to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }
}
