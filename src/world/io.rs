//! Loading blocks-world problems from the INIT/GOAL text format
//!
//! ```text
//! INIT
//! ON A B
//! ON B Table
//! CLEAR A
//! GOAL
//! ON A Table
//! ```
//!
//! Each line after a section header is either `ON <block> <support>` or
//! `CLEAR <block>`. Malformed lines are skipped and reported; a missing
//! header is fatal.

use super::block::{Block, Support, TABLE_TOKEN};
use super::goal::Goal;
use super::state::{State, StateError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const INIT_HEADER: &str = "INIT";
pub const GOAL_HEADER: &str = "GOAL";
const ON_KEYWORD: &str = "ON";
const CLEAR_KEYWORD: &str = "CLEAR";

/// The two sections of a problem file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    Init,
    Goal,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Init => f.write_str(INIT_HEADER),
            Section::Goal => f.write_str(GOAL_HEADER),
        }
    }
}

/// Fatal problems with an input file
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing `{0}` section header")]
    MissingSectionMarker(Section),
    #[error("invalid initial state: {0}")]
    InvalidInitialState(#[from] StateError),
}

/// A line that was ignored while loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// 1-based line number in the input
    pub line_number: usize,
    pub content: String,
    pub reason: String,
}

impl fmt::Display for SkippedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: `{}` ({})", self.line_number, self.content, self.reason)
    }
}

/// A loaded problem: the initial arrangement and the goal to reach
#[derive(Debug, Clone)]
pub struct ProblemDefinition {
    pub initial: State,
    pub goal: Goal,
    pub skipped_lines: Vec<SkippedLine>,
}

/// One well-formed fact line
enum Fact {
    On(Block, Support),
    Clear(Block),
}

/// Parse a problem from its text representation
pub fn parse_problem_from_string(content: &str) -> Result<ProblemDefinition, ParseError> {
    let mut section = None;
    let mut seen_goal = false;
    let mut skipped_lines = Vec::new();

    let mut init_on: BTreeMap<Block, Support> = BTreeMap::new();
    let mut init_clear: BTreeSet<Block> = BTreeSet::new();
    let mut known: BTreeSet<Block> = BTreeSet::new();
    let mut goal_on: BTreeMap<Block, Support> = BTreeMap::new();
    let mut goal_clear: BTreeSet<Block> = BTreeSet::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let line_number = idx + 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut skip = |reason: String| {
            warn!(line_number, content = line, %reason, "skipping malformed input line");
            skipped_lines.push(SkippedLine {
                line_number,
                content: line.to_string(),
                reason,
            });
        };

        match (section, line) {
            (None, INIT_HEADER) => section = Some(Section::Init),
            // anything before INIT is preamble
            (None, _) => {}
            (Some(Section::Init), GOAL_HEADER) => {
                section = Some(Section::Goal);
                seen_goal = true;
            }
            (Some(current), INIT_HEADER | GOAL_HEADER) => {
                skip(format!("unexpected section header inside {}", current));
            }
            (Some(current), _) => match parse_fact(line) {
                Err(reason) => skip(reason),
                Ok(Fact::On(block, support)) => {
                    if current == Section::Init {
                        known.insert(block.clone());
                        if let Some(below) = support.as_block() {
                            known.insert(below.clone());
                        }
                        insert_on(&mut init_on, block, support, current, line_number);
                    } else {
                        insert_on(&mut goal_on, block, support, current, line_number);
                    }
                }
                Ok(Fact::Clear(block)) => {
                    if current == Section::Init {
                        known.insert(block.clone());
                        init_clear.insert(block);
                    } else {
                        goal_clear.insert(block);
                    }
                }
            },
        }
    }

    if section.is_none() {
        return Err(ParseError::MissingSectionMarker(Section::Init));
    }
    if !seen_goal {
        return Err(ParseError::MissingSectionMarker(Section::Goal));
    }

    if let Some(unsupported) = known.iter().find(|block| !init_on.contains_key(*block)) {
        return Err(StateError::MissingSupport(unsupported.clone()).into());
    }

    let initial = State::new(init_on, init_clear)?;
    let goal = Goal::new(goal_on, goal_clear);

    let unknown = goal.unknown_blocks(&initial);
    if !unknown.is_empty() {
        let names: Vec<&str> = unknown.iter().map(Block::name).collect();
        warn!(blocks = %names.join(", "), "goal mentions blocks absent from the initial state");
    }

    debug!(
        blocks = initial.block_count(),
        goal_atoms = goal.num_goals(),
        skipped = skipped_lines.len(),
        "parsed problem"
    );

    Ok(ProblemDefinition {
        initial,
        goal,
        skipped_lines,
    })
}

fn parse_fact(line: &str) -> Result<Fact, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [ON_KEYWORD, block, support] => {
            let block = parse_block(block)?;
            Ok(Fact::On(block, Support::from_token(support)))
        }
        [ON_KEYWORD, ..] => Err(format!("ON expects 2 arguments, found {}", tokens.len() - 1)),
        [CLEAR_KEYWORD, block] => Ok(Fact::Clear(parse_block(block)?)),
        [CLEAR_KEYWORD, ..] => Err(format!("CLEAR expects 1 argument, found {}", tokens.len() - 1)),
        [keyword, ..] => Err(format!("unknown keyword `{}`", keyword)),
        [] => Err("empty line".to_string()),
    }
}

fn parse_block(token: &str) -> Result<Block, String> {
    if token == TABLE_TOKEN {
        Err(format!("`{}` cannot be used as a block", TABLE_TOKEN))
    } else {
        Ok(Block::new(token))
    }
}

fn insert_on(
    on: &mut BTreeMap<Block, Support>,
    block: Block,
    support: Support,
    section: Section,
    line_number: usize,
) {
    if let Some(previous) = on.get(&block) {
        if *previous != support {
            warn!(
                line_number,
                %block,
                %previous,
                %support,
                section = %section,
                "later ON line overrides an earlier one"
            );
        }
    }
    on.insert(block, support);
}

/// Load a problem from a text file
pub fn load_problem_from_file<P: AsRef<Path>>(path: P) -> Result<ProblemDefinition> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read problem file: {}", path.as_ref().display()))?;

    parse_problem_from_string(&content)
        .with_context(|| format!("Failed to parse problem file: {}", path.as_ref().display()))
}

/// Render a problem back into the INIT/GOAL text format
pub fn problem_to_string(initial: &State, goal: &Goal) -> String {
    let mut result = String::new();

    result.push_str(INIT_HEADER);
    result.push('\n');
    for (block, support) in initial.on() {
        result.push_str(&format!("{} {} {}\n", ON_KEYWORD, block, support));
    }
    for block in initial.clear() {
        result.push_str(&format!("{} {}\n", CLEAR_KEYWORD, block));
    }

    result.push_str(GOAL_HEADER);
    result.push('\n');
    for (block, support) in goal.on() {
        result.push_str(&format!("{} {} {}\n", ON_KEYWORD, block, support));
    }
    for block in goal.clear() {
        result.push_str(&format!("{} {}\n", CLEAR_KEYWORD, block));
    }

    result
}

/// Save a problem in the INIT/GOAL text format
pub fn save_problem_to_file<P: AsRef<Path>>(initial: &State, goal: &Goal, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(&path, problem_to_string(initial, goal))
        .with_context(|| format!("Failed to write problem file: {}", path.as_ref().display()))?;

    Ok(())
}

/// Write a few example problems into `output_dir`
pub fn create_example_problems<P: AsRef<Path>>(output_dir: P) -> Result<()> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    // one move: unstack A
    let unstack = "INIT\nON A B\nON B Table\nCLEAR A\nGOAL\nON A Table\n";
    std::fs::write(dir.join("unstack.txt"), unstack).context("Failed to write unstack.txt")?;

    // Sussman anomaly: C on A, goal A on B on C
    let sussman = "INIT\nON C A\nON A Table\nON B Table\nCLEAR C\nCLEAR B\n\
                   GOAL\nON A B\nON B C\n";
    std::fs::write(dir.join("sussman.txt"), sussman).context("Failed to write sussman.txt")?;

    // reverse a tower of four
    let reverse = "INIT\nON A B\nON B C\nON C D\nON D Table\nCLEAR A\n\
                   GOAL\nON D C\nON C B\nON B A\nON A Table\nCLEAR D\n";
    std::fs::write(dir.join("reverse_tower.txt"), reverse)
        .context("Failed to write reverse_tower.txt")?;

    // the goal rests A on a block that never exists
    let unsolvable = "INIT\nON A Table\nCLEAR A\nGOAL\nON A Z\n";
    std::fs::write(dir.join("unsolvable.txt"), unsolvable)
        .context("Failed to write unsolvable.txt")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn b(name: &str) -> Block {
        Block::new(name)
    }

    #[test]
    fn test_parse_problem_from_string() {
        let content = "INIT\nON A B\nON B Table\nON C Table\nCLEAR A\nCLEAR C\nGOAL\nON A Table\nCLEAR B\n";
        let problem = parse_problem_from_string(content).unwrap();

        assert_eq!(problem.initial.block_count(), 3);
        assert!(problem.initial.rests_on(&b("A"), &Support::Block(b("B"))));
        assert!(problem.initial.rests_on(&b("B"), &Support::Table));
        assert_eq!(problem.initial.clear(), &BTreeSet::from([b("A"), b("C")]));
        assert_eq!(problem.goal.num_goals(), 2);
        assert_eq!(problem.goal.on().get(&b("A")), Some(&Support::Table));
        assert!(problem.goal.clear().contains(&b("B")));
        assert!(problem.skipped_lines.is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped_and_reported() {
        let content = "INIT\nON A\nON A Table\nCLEAR A extra\nCLEAR A\nSTACK A B\nON Table A\nGOAL\nON A\nCLEAR A\n";
        let problem = parse_problem_from_string(content).unwrap();

        let skipped: Vec<usize> = problem.skipped_lines.iter().map(|s| s.line_number).collect();
        assert_eq!(skipped, vec![2, 4, 6, 7, 9]);
        assert!(problem.skipped_lines[0].reason.contains("ON expects 2 arguments"));
        assert!(problem.skipped_lines[2].reason.contains("unknown keyword"));
        assert_eq!(problem.initial.block_count(), 1);
        assert_eq!(problem.goal.num_goals(), 1);
    }

    #[test]
    fn test_preamble_comments_and_whitespace() {
        let content = "blocks world problem\n# comment\n  INIT  \n\n  ON A Table \nCLEAR A\n GOAL\nCLEAR A\n";
        let problem = parse_problem_from_string(content).unwrap();
        assert_eq!(problem.initial.block_count(), 1);
        assert_eq!(problem.goal.num_goals(), 1);
        assert!(problem.skipped_lines.is_empty());
    }

    #[test]
    fn test_missing_section_markers() {
        let no_init = parse_problem_from_string("ON A Table\nCLEAR A\nGOAL\nCLEAR A\n");
        assert!(matches!(no_init, Err(ParseError::MissingSectionMarker(Section::Init))));

        let no_goal = parse_problem_from_string("INIT\nON A Table\nCLEAR A\n");
        assert!(matches!(no_goal, Err(ParseError::MissingSectionMarker(Section::Goal))));

        let empty = parse_problem_from_string("");
        assert!(matches!(empty, Err(ParseError::MissingSectionMarker(Section::Init))));
    }

    #[test]
    fn test_duplicate_goal_lines_count_once() {
        let content = "INIT\nON A Table\nCLEAR A\nGOAL\nCLEAR A\nCLEAR A\nON A Table\nON A Table\n";
        let problem = parse_problem_from_string(content).unwrap();
        assert_eq!(problem.goal.num_goals(), 2);
    }

    #[test]
    fn test_invalid_initial_state() {
        // B is known via ON A B but has no support of its own
        let missing_support = parse_problem_from_string("INIT\nON A B\nCLEAR A\nGOAL\nON A Table\n");
        assert!(matches!(
            missing_support,
            Err(ParseError::InvalidInitialState(StateError::MissingSupport(_)))
        ));

        // B is covered but claimed clear
        let inconsistent =
            parse_problem_from_string("INIT\nON A B\nON B Table\nCLEAR A\nCLEAR B\nGOAL\nON A Table\n");
        assert!(matches!(
            inconsistent,
            Err(ParseError::InvalidInitialState(StateError::ClearButCovered(_)))
        ));
    }

    #[test]
    fn test_goal_does_not_extend_block_universe() {
        let content = "INIT\nON A Table\nCLEAR A\nGOAL\nON A Z\n";
        let problem = parse_problem_from_string(content).unwrap();
        assert_eq!(problem.initial.block_count(), 1);
        assert!(!problem.initial.is_known(&b("Z")));
        assert_eq!(problem.goal.unknown_blocks(&problem.initial), BTreeSet::from([b("Z")]));
    }

    #[test]
    fn test_problem_text_round_trip() {
        let content = "INIT\nON A B\nON B Table\nCLEAR A\nGOAL\nON B A\nCLEAR B\n";
        let problem = parse_problem_from_string(content).unwrap();
        let rendered = problem_to_string(&problem.initial, &problem.goal);
        let reparsed = parse_problem_from_string(&rendered).unwrap();

        assert_eq!(reparsed.initial, problem.initial);
        assert_eq!(reparsed.goal, problem.goal);
    }

    #[test]
    fn test_file_operations() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested/problem.txt");
        let problem = parse_problem_from_string("INIT\nON A Table\nCLEAR A\nGOAL\nCLEAR A\n").unwrap();

        save_problem_to_file(&problem.initial, &problem.goal, &path).unwrap();
        let loaded = load_problem_from_file(&path).unwrap();
        assert_eq!(loaded.initial, problem.initial);

        assert!(load_problem_from_file(temp_dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_create_example_problems() {
        let temp_dir = tempdir().unwrap();
        create_example_problems(temp_dir.path()).unwrap();

        for name in ["unstack.txt", "sussman.txt", "reverse_tower.txt", "unsolvable.txt"] {
            let problem = load_problem_from_file(temp_dir.path().join(name)).unwrap();
            assert!(problem.skipped_lines.is_empty(), "{} has skipped lines", name);
        }
    }
}
