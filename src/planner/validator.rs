//! Plan validation by replaying moves from the initial state

use crate::world::{Action, Goal, PreconditionViolation, State};
use std::time::Instant;

/// Replays plans against a problem's initial state and goal
pub struct PlanValidator<'a> {
    initial: &'a State,
    goal: &'a Goal,
}

/// Result of replaying a plan
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// States visited, starting with the initial state
    pub trajectory: Vec<State>,
    pub error_message: Option<String>,
    pub validation_details: ValidationDetails,
}

/// Detailed validation information
#[derive(Debug, Clone, Default)]
pub struct ValidationDetails {
    pub moves_checked: usize,
    pub moves_applied: usize,
    pub goal_reached: bool,
    /// The first move whose preconditions did not hold
    pub violation: Option<StepViolation>,
    /// Goal atoms the final state leaves unmet
    pub unmet_goals: Vec<String>,
    pub validation_time_ms: u64,
}

/// A move that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepViolation {
    /// 1-based position of the move in the plan
    pub step: usize,
    pub action: Action,
    pub violation: PreconditionViolation,
}

impl<'a> PlanValidator<'a> {
    pub fn new(initial: &'a State, goal: &'a Goal) -> Self {
        Self { initial, goal }
    }

    /// Apply every move in order, then check the goal on the final state
    pub fn validate(&self, plan: &[Action]) -> ValidationResult {
        let start_time = Instant::now();

        let mut trajectory = vec![self.initial.clone()];
        let mut current = self.initial.clone();
        let mut violation = None;

        for (index, action) in plan.iter().enumerate() {
            match action.apply(&current) {
                Ok(next) => {
                    trajectory.push(next.clone());
                    current = next;
                }
                Err(error) => {
                    violation = Some(StepViolation {
                        step: index + 1,
                        action: action.clone(),
                        violation: error,
                    });
                    break;
                }
            }
        }

        let moves_applied = trajectory.len() - 1;
        let unmet_goals = if violation.is_none() {
            self.goal.unmet_atoms(&current)
        } else {
            Vec::new()
        };
        let goal_reached = violation.is_none() && unmet_goals.is_empty();

        let details = ValidationDetails {
            moves_checked: plan.len(),
            moves_applied,
            goal_reached,
            violation,
            unmet_goals,
            validation_time_ms: start_time.elapsed().as_millis() as u64,
        };

        let error_message = if goal_reached {
            None
        } else {
            Some(Self::generate_error_message(&details))
        };

        ValidationResult {
            is_valid: goal_reached,
            trajectory,
            error_message,
            validation_details: details,
        }
    }

    /// Quick check that only reports whether the plan reaches the goal
    pub fn quick_validate(&self, plan: &[Action]) -> bool {
        let mut current = self.initial.clone();
        for action in plan {
            match action.apply(&current) {
                Ok(next) => current = next,
                Err(_) => return false,
            }
        }
        self.goal.is_satisfied(&current)
    }

    fn generate_error_message(details: &ValidationDetails) -> String {
        if let Some(step) = &details.violation {
            return format!("Step {} ({}) is not applicable: {}", step.step, step.action, step.violation);
        }

        let shown: Vec<&str> = details.unmet_goals.iter().take(3).map(String::as_str).collect();
        let mut message = format!(
            "Final state leaves {} goal condition(s) unmet: {}",
            details.unmet_goals.len(),
            shown.join(", ")
        );
        if details.unmet_goals.len() > 3 {
            message.push_str(&format!(" ... and {} more", details.unmet_goals.len() - 3));
        }
        message
    }
}

impl ValidationResult {
    /// The state reached after the last applied move
    pub fn final_state(&self) -> Option<&State> {
        self.trajectory.last()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Validation Result: {}", if self.is_valid { "VALID" } else { "INVALID" })?;

        if let Some(ref error) = self.error_message {
            writeln!(f, "Error: {}", error)?;
        }

        let details = &self.validation_details;
        writeln!(f, "Moves checked: {}", details.moves_checked)?;
        writeln!(f, "Moves applied: {}", details.moves_applied)?;
        writeln!(f, "Goal reached: {}", details.goal_reached)?;
        writeln!(f, "Unmet goal conditions: {}", details.unmet_goals.len())?;
        writeln!(f, "Validation time: {}ms", details.validation_time_ms)?;

        Ok(())
    }
}
