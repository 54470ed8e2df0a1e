//! Planning problem definition

use super::{Plan, PlanMetadata, PlanValidator};
use crate::config::Settings;
use crate::search::{branching_bound, BranchAndBound, SearchOutcome};
use crate::world::{load_problem_from_file, Block, Goal, ProblemDefinition, SkippedLine, State};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tracing::info;

/// A loaded problem together with the settings used to plan it
pub struct PlanningProblem {
    settings: Settings,
    definition: ProblemDefinition,
}

impl PlanningProblem {
    /// Create a new problem from settings, loading the configured problem file
    pub fn new(settings: Settings) -> Result<Self> {
        let definition = load_problem_from_file(&settings.input.problem_file)
            .context("Failed to load problem file")?;

        Ok(Self::with_definition(settings, definition))
    }

    /// Create a problem with an explicit definition (useful for testing)
    pub fn with_definition(settings: Settings, definition: ProblemDefinition) -> Self {
        Self { settings, definition }
    }

    /// Search for a shortest plan
    pub fn solve(&self) -> Result<Plan> {
        let search = &self.settings.search;
        let engine = BranchAndBound::from_config(&self.definition.goal, search);

        let outcome = if search.parallel {
            engine.solve_parallel(&self.definition.initial)
        } else {
            engine.solve(&self.definition.initial)
        };

        let best = match &outcome {
            SearchOutcome::Solved(moves) => Some(moves),
            SearchOutcome::Aborted { best, .. } => best.as_ref(),
            SearchOutcome::NoSolution => None,
        };
        if let Some(moves) = best {
            let result = self.validator().validate(moves);
            if !result.is_valid {
                anyhow::bail!(
                    "Search produced a plan that fails replay: {}",
                    result.error_message.unwrap_or_default()
                );
            }
        }

        let plan = Plan::from_outcome(
            outcome,
            PlanMetadata {
                pruning: search.pruning,
                parallel: search.parallel,
                statistics: engine.statistics(),
            },
        );
        info!(length = plan.length, status = ?plan.status, "planning finished");

        Ok(plan)
    }

    /// Validator bound to this problem's initial state and goal
    pub fn validator(&self) -> PlanValidator<'_> {
        PlanValidator::new(&self.definition.initial, &self.definition.goal)
    }

    pub fn initial_state(&self) -> &State {
        &self.definition.initial
    }

    pub fn goal(&self) -> &Goal {
        &self.definition.goal
    }

    pub fn skipped_lines(&self) -> &[SkippedLine] {
        &self.definition.skipped_lines
    }

    /// Get the problem settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Summarise the problem without searching
    pub fn analyze(&self) -> ProblemAnalysis {
        let initial = &self.definition.initial;
        let goal = &self.definition.goal;

        let unknown_blocks = goal.unknown_blocks(initial);
        let heuristic = goal.heuristic(initial);

        let solvability = if goal.is_empty() || goal.is_satisfied(initial) {
            Solvability::Trivial
        } else if !unknown_blocks.is_empty() {
            Solvability::Unsolvable
        } else {
            Solvability::NeedsSearch
        };

        let recommendations = self.generate_recommendations(solvability, initial.block_count());

        ProblemAnalysis {
            block_count: initial.block_count(),
            tower_count: initial.towers().len(),
            goal_atoms: goal.num_goals(),
            satisfied_atoms: goal.count_satisfied(initial),
            initial_heuristic: heuristic,
            branching_bound: branching_bound(initial),
            unknown_blocks,
            unmet_goals: goal.unmet_atoms(initial),
            skipped_lines: self.definition.skipped_lines.len(),
            solvability,
            recommendations,
        }
    }

    fn generate_recommendations(&self, solvability: Solvability, blocks: usize) -> Vec<String> {
        let search = &self.settings.search;
        let mut recommendations = Vec::new();

        match solvability {
            Solvability::Trivial => {
                recommendations.push("Goal already holds; the plan is empty".to_string());
            }
            Solvability::Unsolvable => {
                recommendations.push(
                    "Goal names blocks missing from INIT; check the problem file".to_string(),
                );
            }
            Solvability::NeedsSearch => {
                if blocks > 8 && !search.parallel {
                    recommendations.push("Many blocks: consider --parallel".to_string());
                }
                if blocks > 8 && search.max_nodes.is_none() && search.timeout_seconds.is_none() {
                    recommendations.push("Unbounded search: set max_nodes or timeout_seconds".to_string());
                }
            }
        }

        if !self.definition.skipped_lines.is_empty() {
            recommendations.push(format!(
                "{} malformed line(s) were ignored",
                self.definition.skipped_lines.len()
            ));
        }

        if recommendations.is_empty() {
            recommendations.push("Problem looks reasonable to solve".to_string());
        }

        recommendations
    }
}

/// Coarse classification of a problem before searching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solvability {
    /// The empty plan works
    Trivial,
    /// The goal mentions blocks that do not exist
    Unsolvable,
    NeedsSearch,
}

/// Static summary of a problem
#[derive(Debug, Clone)]
pub struct ProblemAnalysis {
    pub block_count: usize,
    pub tower_count: usize,
    pub goal_atoms: usize,
    pub satisfied_atoms: usize,
    /// Lower bound on the plan length
    pub initial_heuristic: usize,
    /// Upper bound on the children of the initial state
    pub branching_bound: usize,
    pub unknown_blocks: BTreeSet<Block>,
    pub unmet_goals: Vec<String>,
    pub skipped_lines: usize,
    pub solvability: Solvability,
    pub recommendations: Vec<String>,
}

impl std::fmt::Display for ProblemAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Problem Analysis:")?;
        writeln!(f, "  Blocks: {} in {} tower(s)", self.block_count, self.tower_count)?;
        writeln!(f, "  Goal conditions: {} ({} already met)", self.goal_atoms, self.satisfied_atoms)?;
        writeln!(f, "  Plan length lower bound: {}", self.initial_heuristic)?;
        writeln!(f, "  Branching bound: {}", self.branching_bound)?;
        writeln!(f, "  Skipped lines: {}", self.skipped_lines)?;
        writeln!(f, "  Solvability: {:?}", self.solvability)?;
        if !self.unknown_blocks.is_empty() {
            let names: Vec<&str> = self.unknown_blocks.iter().map(Block::name).collect();
            writeln!(f, "  Unknown goal blocks: {}", names.join(", "))?;
        }
        if !self.unmet_goals.is_empty() {
            writeln!(f, "  Unmet goal conditions:")?;
            for atom in &self.unmet_goals {
                writeln!(f, "    - {}", atom)?;
            }
        }
        writeln!(f, "  Recommendations:")?;
        for rec in &self.recommendations {
            writeln!(f, "    - {}", rec)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PruningStrategy;
    use crate::planner::PlanStatus;
    use crate::search::AbortReason;
    use crate::world::parse_problem_from_string;
    use tempfile::tempdir;

    fn problem(content: &str) -> PlanningProblem {
        let definition = parse_problem_from_string(content).unwrap();
        PlanningProblem::with_definition(Settings::default(), definition)
    }

    const SUSSMAN: &str =
        "INIT\nON C A\nON A Table\nON B Table\nCLEAR C\nCLEAR B\nGOAL\nON A B\nON B C\n";

    #[test]
    fn test_problem_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("sussman.txt");
        std::fs::write(&path, SUSSMAN).unwrap();

        let mut settings = Settings::default();
        settings.input.problem_file = path;
        let problem = PlanningProblem::new(settings).unwrap();
        assert_eq!(problem.initial_state().block_count(), 3);
        assert_eq!(problem.goal().num_goals(), 2);

        let mut settings = Settings::default();
        settings.input.problem_file = temp_dir.path().join("missing.txt");
        assert!(PlanningProblem::new(settings).is_err());
    }

    #[test]
    fn test_solve_sequential_and_parallel() {
        let sequential = problem(SUSSMAN).solve().unwrap();
        assert!(sequential.is_optimal());
        assert_eq!(sequential.length, 3);
        assert!(sequential.metadata.statistics.nodes_expanded > 0);

        let definition = parse_problem_from_string(SUSSMAN).unwrap();
        let mut settings = Settings::default();
        settings.search.parallel = true;
        settings.search.pruning = PruningStrategy::VisitedStates;
        let parallel = PlanningProblem::with_definition(settings, definition).solve().unwrap();
        assert!(parallel.is_optimal());
        assert_eq!(parallel.length, 3);
        assert!(parallel.metadata.parallel);
    }

    #[test]
    fn test_solve_no_solution() {
        let plan = problem("INIT\nON A Table\nCLEAR A\nGOAL\nON A Z\n").solve().unwrap();
        assert_eq!(plan.status, PlanStatus::NoSolution);
        assert!(plan.moves.is_empty());
    }

    #[test]
    fn test_solve_with_depth_limit() {
        let definition = parse_problem_from_string(SUSSMAN).unwrap();
        let mut settings = Settings::default();
        settings.search.max_depth = Some(1);
        let plan = PlanningProblem::with_definition(settings, definition).solve().unwrap();
        assert_eq!(
            plan.status,
            PlanStatus::Aborted {
                reason: AbortReason::DepthLimit { limit: 1 }
            }
        );
    }

    #[test]
    fn test_analyze() {
        let analysis = problem(SUSSMAN).analyze();
        assert_eq!(analysis.block_count, 3);
        assert_eq!(analysis.tower_count, 2);
        assert_eq!(analysis.goal_atoms, 2);
        assert_eq!(analysis.satisfied_atoms, 0);
        assert_eq!(analysis.initial_heuristic, 2);
        assert_eq!(analysis.solvability, Solvability::NeedsSearch);
        assert!(analysis.to_string().contains("Plan length lower bound: 2"));

        let analysis = problem("INIT\nON A Table\nCLEAR A\nGOAL\nON A Z\n").analyze();
        assert_eq!(analysis.solvability, Solvability::Unsolvable);
        assert!(analysis.unknown_blocks.contains(&Block::new("Z")));

        let analysis = problem("INIT\nON A Table\nCLEAR A\nGOAL\n").analyze();
        assert_eq!(analysis.solvability, Solvability::Trivial);
    }
}
