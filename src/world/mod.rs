//! Blocks-world model: blocks, states, operators, goals and problem files

pub mod block;
pub mod state;
pub mod operators;
pub mod goal;
pub mod io;

pub use block::{Block, Support};
pub use state::{State, StateError};
pub use operators::{Action, PreconditionViolation};
pub use goal::Goal;
pub use io::{
    create_example_problems, load_problem_from_file, parse_problem_from_string, ParseError,
    ProblemDefinition, SkippedLine,
};
