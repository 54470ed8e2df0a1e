//! Planning problem definition, plan handling and validation

pub mod problem;
pub mod solution;
pub mod validator;

pub use problem::{PlanningProblem, ProblemAnalysis, Solvability};
pub use solution::{Plan, PlanMetadata, PlanStatus};
pub use validator::{PlanValidator, StepViolation, ValidationResult};
