//! Display and output formatting utilities

use crate::config::OutputFormat;
use crate::planner::{Plan, PlanStatus};
use crate::world::State;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Printed when the search proves the goal unreachable
pub const NO_SOLUTION: &str = "no solution found";

/// Format plans for display
pub struct PlanFormatter;

impl PlanFormatter {
    /// One move per line in execution order, or a line saying why there is no plan
    pub fn format_moves(plan: &Plan) -> String {
        if !plan.has_moves_to_goal() {
            return match &plan.status {
                PlanStatus::Aborted { reason } => format!("search aborted: {}\n", reason),
                _ => format!("{}\n", NO_SOLUTION),
            };
        }

        let mut output = String::new();
        for action in &plan.moves {
            output.push_str(&action.to_string());
            output.push('\n');
        }
        output
    }

    /// Moves together with the run's status and statistics
    pub fn format_plan(plan: &Plan) -> String {
        let mut output = String::new();

        match &plan.status {
            PlanStatus::Optimal => {
                output.push_str(&format!("=== Optimal plan: {} move(s) ===\n", plan.length));
            }
            PlanStatus::NoSolution => {
                output.push_str("=== No plan exists ===\n");
            }
            PlanStatus::Aborted { reason } => {
                output.push_str(&format!("=== Search aborted: {} ===\n", reason));
                if plan.has_moves_to_goal() {
                    output.push_str(&format!(
                        "Best plan found ({} move(s), not proven shortest):\n",
                        plan.length
                    ));
                }
            }
        }

        for (i, action) in plan.moves.iter().enumerate() {
            output.push_str(&format!("{:3}. {}\n", i + 1, action));
        }
        if plan.status == PlanStatus::NoSolution {
            output.push_str(NO_SOLUTION);
            output.push('\n');
        }

        output.push('\n');
        output.push_str(&format!(
            "Pruning: {:?}, parallel: {}\n",
            plan.metadata.pruning, plan.metadata.parallel
        ));
        output.push_str(&plan.metadata.statistics.to_string());
        output
    }

    /// Towers bottom to top, one per line
    pub fn format_state(state: &State) -> String {
        let mut output = String::new();
        for tower in state.towers() {
            let names: Vec<&str> = tower.iter().map(|block| block.name()).collect();
            output.push_str(&format!("  [{}]\n", names.join(" ")));
        }
        output
    }

    /// Every state along a replay, labelled by step
    pub fn format_trajectory(trajectory: &[State]) -> String {
        let mut output = String::new();
        for (i, state) in trajectory.iter().enumerate() {
            output.push_str(&format!("Step {}:\n", i));
            output.push_str(&Self::format_state(state));
        }
        output
    }

    /// Save a plan into `output_dir` as `<name>.txt` or `<name>.json`
    pub fn save_plan<P: AsRef<Path>>(
        plan: &Plan,
        output_dir: P,
        name: &str,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;

        let path = match format {
            OutputFormat::Text => {
                let path = output_dir.join(format!("{}.txt", name));
                std::fs::write(&path, Self::format_moves(plan))
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                path
            }
            OutputFormat::Json => {
                let path = output_dir.join(format!("{}.json", name));
                plan.save_to_file(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                path
            }
        };

        Ok(path)
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PruningStrategy;
    use crate::planner::PlanMetadata;
    use crate::search::{AbortReason, SearchOutcome, SearchStatistics};
    use crate::world::{parse_problem_from_string, Action, Block};
    use tempfile::tempdir;

    fn plan(outcome: SearchOutcome) -> Plan {
        Plan::from_outcome(
            outcome,
            PlanMetadata {
                pruning: PruningStrategy::CompletedMoves,
                parallel: false,
                statistics: SearchStatistics::default(),
            },
        )
    }

    fn unstack() -> Vec<Action> {
        vec![Action::MoveToTable {
            block: Block::new("A"),
            from: Block::new("B"),
        }]
    }

    #[test]
    fn test_format_moves() {
        assert_eq!(
            PlanFormatter::format_moves(&plan(SearchOutcome::Solved(unstack()))),
            "MoveToTable(A, B)\n"
        );
        assert_eq!(PlanFormatter::format_moves(&plan(SearchOutcome::Solved(Vec::new()))), "");
        assert_eq!(
            PlanFormatter::format_moves(&plan(SearchOutcome::NoSolution)),
            "no solution found\n"
        );
    }

    #[test]
    fn test_format_moves_reports_abort_without_plan() {
        let aborted = plan(SearchOutcome::Aborted {
            reason: AbortReason::TimeLimit { seconds: 5.0 },
            best: None,
        });
        let text = PlanFormatter::format_moves(&aborted);
        assert_eq!(text, "search aborted: time limit of 5.0s reached\n");
        assert!(!text.contains(NO_SOLUTION));
        assert!(!PlanFormatter::format_plan(&aborted).contains(NO_SOLUTION));
    }

    #[test]
    fn test_format_plan_reports_abort() {
        let aborted = plan(SearchOutcome::Aborted {
            reason: AbortReason::NodeBudget { limit: 7 },
            best: Some(unstack()),
        });
        let text = PlanFormatter::format_plan(&aborted);
        assert!(text.contains("node budget of 7"));
        assert!(text.contains("not proven shortest"));
        assert!(text.contains("  1. MoveToTable(A, B)"));
        assert!(text.contains("Nodes expanded"));
    }

    #[test]
    fn test_format_state() {
        let problem =
            parse_problem_from_string("INIT\nON A B\nON B Table\nON C Table\nCLEAR A\nCLEAR C\nGOAL\n")
                .unwrap();
        let text = PlanFormatter::format_state(&problem.initial);
        assert_eq!(text, "  [B A]\n  [C]\n");
        assert!(PlanFormatter::format_trajectory(&[problem.initial]).starts_with("Step 0:\n"));
    }

    #[test]
    fn test_save_plan() {
        let temp_dir = tempdir().unwrap();
        let solved = plan(SearchOutcome::Solved(unstack()));

        let text_path = PlanFormatter::save_plan(&solved, temp_dir.path(), "unstack", OutputFormat::Text).unwrap();
        assert_eq!(std::fs::read_to_string(text_path).unwrap(), "MoveToTable(A, B)\n");

        let json_path = PlanFormatter::save_plan(&solved, temp_dir.path(), "unstack", OutputFormat::Json).unwrap();
        assert_eq!(Plan::load_from_file(json_path).unwrap(), solved);
    }

    #[test]
    fn test_color_output() {
        let colored = ColorOutput::colored("test", Color::Red);
        assert!(colored.contains("test"));

        let success = ColorOutput::success("OK");
        assert!(success.contains("OK"));
    }
}
