//! Configuration settings for the blocks-world planner

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub search: SearchConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Deepest plan length explored; longer branches are cut
    pub max_depth: Option<usize>,
    /// Number of node expansions before the search aborts
    pub max_nodes: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub pruning: PruningStrategy,
    /// Explore the root's children on the rayon thread pool
    pub parallel: bool,
}

/// How the successor generator avoids repeating itself along a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PruningStrategy {
    /// Never repeat an identical move label on one branch
    CompletedMoves,
    /// Never revisit a state already on the current branch
    VisitedStates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub problem_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub save_plan: bool,
    pub output_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                max_depth: None,
                max_nodes: Some(5_000_000),
                timeout_seconds: Some(300),
                pruning: PruningStrategy::CompletedMoves,
                parallel: false,
            },
            input: InputConfig {
                problem_file: PathBuf::from("input/problems/unstack.txt"),
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                save_plan: false,
                output_directory: PathBuf::from("output/plans"),
            },
        }
    }
}

impl SearchConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.search.max_depth == Some(0) {
            anyhow::bail!("Maximum depth must be positive");
        }

        if self.search.max_nodes == Some(0) {
            anyhow::bail!("Maximum node count must be positive");
        }

        if self.search.timeout_seconds == Some(0) {
            anyhow::bail!("Timeout must be positive");
        }

        if !self.input.problem_file.exists() {
            anyhow::bail!("Problem file does not exist: {}", self.input.problem_file.display());
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(ref problem_file) = cli_overrides.problem_file {
            self.input.problem_file = problem_file.clone();
        }
        if let Some(max_depth) = cli_overrides.max_depth {
            self.search.max_depth = Some(max_depth);
        }
        if let Some(max_nodes) = cli_overrides.max_nodes {
            self.search.max_nodes = Some(max_nodes);
        }
        if let Some(timeout) = cli_overrides.timeout_seconds {
            self.search.timeout_seconds = Some(timeout);
        }
        if let Some(pruning) = cli_overrides.pruning {
            self.search.pruning = pruning;
        }
        if cli_overrides.parallel {
            self.search.parallel = true;
        }
        if let Some(format) = cli_overrides.format {
            self.output.format = format;
        }
        if let Some(ref output_dir) = cli_overrides.output_dir {
            self.output.output_directory = output_dir.clone();
            self.output.save_plan = true;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub problem_file: Option<PathBuf>,
    pub max_depth: Option<usize>,
    pub max_nodes: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub pruning: Option<PruningStrategy>,
    pub parallel: bool,
    pub format: Option<OutputFormat>,
    pub output_dir: Option<PathBuf>,
}
