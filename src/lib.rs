//! Blocks-World Planner
//!
//! Finds a shortest sequence of block moves that turns an initial
//! arrangement of stacked blocks into one satisfying a goal, using a
//! branch-and-bound depth-first search guided by an admissible heuristic.

pub mod config;
pub mod world;
pub mod search;
pub mod planner;
pub mod utils;

pub use config::Settings;
pub use planner::{Plan, PlanningProblem};

use anyhow::Result;

/// Main entry point: load the configured problem and plan it
pub fn plan(settings: Settings) -> Result<Plan> {
    let problem = PlanningProblem::new(settings)?;
    problem.solve()
}
