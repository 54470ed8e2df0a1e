//! Configuration management for the blocks-world planner

pub mod settings;

pub use settings::{
    CliOverrides, InputConfig, OutputConfig, OutputFormat, PruningStrategy, SearchConfig, Settings,
};
