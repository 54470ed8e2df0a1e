//! Main CLI application for the blocks-world planner

use anyhow::{Context, Result};
use blocks_world_planner::{
    config::{CliOverrides, OutputFormat, PruningStrategy, Settings},
    planner::{Plan, PlanningProblem},
    utils::{ColorOutput, PlanFormatter},
    world::{create_example_problems, load_problem_from_file},
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "blocks_world_planner")]
#[command(about = "Shortest-plan solver for the blocks world")]
#[command(version)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find a shortest plan for a problem
    Solve(SolveArgs),

    /// Create example configuration and problem files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Replay a saved JSON plan against a problem
    Validate {
        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Plan file written with `--format json`
        #[arg(long)]
        plan: PathBuf,

        /// Show the state after every move
        #[arg(long)]
        show_states: bool,
    },

    /// Summarise a problem without searching
    Analyze {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Problem file
        #[arg(short, long)]
        problem: PathBuf,
    },
}

#[derive(Args)]
struct SolveArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Problem file (overrides config)
    #[arg(short, long)]
    problem: Option<PathBuf>,

    /// Longest plan to consider (overrides config)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Node expansions before aborting (overrides config)
    #[arg(long)]
    max_nodes: Option<u64>,

    /// Seconds before aborting (overrides config)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Repeated-move pruning (overrides config)
    #[arg(long, value_enum)]
    pruning: Option<PruningStrategy>,

    /// Explore the root's children in parallel
    #[arg(long)]
    parallel: bool,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Save the plan into this directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show the state after every move
    #[arg(long)]
    show_states: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Solve(args) => solve_command(args, cli.verbose > 0),
        Commands::Setup { directory, force } => setup_command(directory, force),
        Commands::Validate { problem, plan, show_states } => {
            validate_command(problem, plan, show_states)
        }
        Commands::Analyze { config, problem } => analyze_command(config, problem),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn load_settings(config_path: &Path, announce: bool) -> Result<Settings> {
    if config_path.exists() {
        Settings::from_file(&config_path.to_path_buf())
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    } else {
        if announce {
            println!(
                "{}",
                ColorOutput::warning(&format!(
                    "Config file {} not found, using defaults",
                    config_path.display()
                ))
            );
        }
        Ok(Settings::default())
    }
}

fn solve_command(args: SolveArgs, verbose: bool) -> Result<()> {
    // JSON output keeps stdout machine-readable
    let text_mode = args.format != Some(OutputFormat::Json);
    if text_mode {
        println!("{}", ColorOutput::info("Starting blocks-world planner"));
    }

    let mut settings = load_settings(&args.config, text_mode)?;

    let cli_overrides = CliOverrides {
        problem_file: args.problem,
        max_depth: args.max_depth,
        max_nodes: args.max_nodes,
        timeout_seconds: args.timeout,
        pruning: args.pruning,
        parallel: args.parallel,
        format: args.format,
        output_dir: args.output,
    };
    settings.merge_with_cli(&cli_overrides);
    let text_mode = settings.output.format == OutputFormat::Text;

    if verbose && text_mode {
        println!("Configuration:");
        println!("  Problem file: {}", settings.input.problem_file.display());
        println!("  Max depth: {:?}", settings.search.max_depth);
        println!("  Max nodes: {:?}", settings.search.max_nodes);
        println!("  Timeout: {:?}s", settings.search.timeout_seconds);
        println!("  Pruning: {:?}", settings.search.pruning);
        println!("  Parallel: {}", settings.search.parallel);
        println!();
    }

    settings.validate().context("Configuration validation failed")?;

    let start_time = Instant::now();
    let problem = PlanningProblem::new(settings.clone()).context("Failed to create planning problem")?;

    for skipped in problem.skipped_lines() {
        debug!(%skipped, "ignored input line");
    }

    if text_mode {
        println!("Initial state:");
        print!("{}", PlanFormatter::format_state(problem.initial_state()));
        println!();
    }

    let plan = problem.solve().context("Failed to plan")?;
    let total_time = start_time.elapsed();

    match settings.output.format {
        OutputFormat::Json => {
            println!("{}", plan.to_json().context("Failed to serialize plan")?);
        }
        OutputFormat::Text => {
            let headline = format!("{} move(s) in {:.3}s", plan.length, total_time.as_secs_f64());
            if plan.is_optimal() {
                println!("{}", ColorOutput::success(&format!("Found optimal plan: {}", headline)));
            } else if plan.has_moves_to_goal() {
                println!("{}", ColorOutput::warning(&format!("Best plan before abort: {}", headline)));
            } else {
                println!("{}", ColorOutput::warning("No plan found"));
            }

            if verbose {
                println!("\n{}", PlanFormatter::format_plan(&plan));
            } else {
                print!("{}", PlanFormatter::format_moves(&plan));
            }

            if args.show_states && plan.has_moves_to_goal() {
                let replay = problem.validator().validate(&plan.moves);
                println!("\n{}", PlanFormatter::format_trajectory(&replay.trajectory));
            }
        }
    }

    if settings.output.save_plan {
        let name = plan_file_name(&settings.input.problem_file);
        let path = PlanFormatter::save_plan(&plan, &settings.output.output_directory, &name, settings.output.format)
            .context("Failed to save plan")?;
        if text_mode {
            println!("{}", ColorOutput::success(&format!("Plan saved to {}", path.display())));
        }
    }

    Ok(())
}

/// Output file stem derived from the problem file name
fn plan_file_name(problem_file: &Path) -> String {
    let stem = problem_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "problem".to_string());
    format!("{}_plan", stem)
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Setting up project structure..."));

    let config_dir = directory.join("config");
    let input_dir = directory.join("input/problems");
    let output_dir = directory.join("output/plans");

    for dir in [&config_dir, &input_dir, &output_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        Settings::default()
            .to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    create_example_problems(&input_dir).context("Failed to create example problems")?;
    println!("Created example problems in: {}", input_dir.display());

    let examples_dir = config_dir.join("examples");
    std::fs::create_dir_all(&examples_dir)?;

    let mut bounded_config = Settings::default();
    bounded_config.search.max_depth = Some(8);
    bounded_config.search.max_nodes = Some(100_000);
    bounded_config.search.timeout_seconds = Some(30);
    bounded_config.input.problem_file = PathBuf::from("input/problems/sussman.txt");
    bounded_config.to_file(&examples_dir.join("bounded.yaml"))?;

    let mut parallel_config = Settings::default();
    parallel_config.search.parallel = true;
    parallel_config.search.pruning = PruningStrategy::VisitedStates;
    parallel_config.input.problem_file = PathBuf::from("input/problems/reverse_tower.txt");
    parallel_config.output.format = OutputFormat::Json;
    parallel_config.output.save_plan = true;
    parallel_config.to_file(&examples_dir.join("parallel.yaml"))?;

    println!("Created example configurations in: {}", examples_dir.display());

    println!("\n{}", ColorOutput::success("Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit configuration files in {}", config_dir.display());
    println!("2. Add your problems to {}", input_dir.display());
    println!("3. Run: cargo run -- solve --config config/default.yaml");

    Ok(())
}

fn validate_command(problem_path: PathBuf, plan_path: PathBuf, show_states: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Validating plan..."));

    let definition = load_problem_from_file(&problem_path)?;
    let plan = Plan::load_from_file(&plan_path)
        .with_context(|| format!("Failed to load plan from {}", plan_path.display()))?;

    let problem = PlanningProblem::with_definition(Settings::default(), definition);
    let result = problem.validator().validate(&plan.moves);

    println!("{}", result);

    if show_states {
        println!("Trajectory:");
        println!("{}", PlanFormatter::format_trajectory(&result.trajectory));
    }

    if result.is_valid {
        println!("{}", ColorOutput::success("Plan is valid!"));
    } else {
        println!("{}", ColorOutput::error("Plan is invalid"));
    }

    Ok(())
}

fn analyze_command(config_path: PathBuf, problem_path: PathBuf) -> Result<()> {
    println!("{}", ColorOutput::info("Analyzing problem..."));

    let settings = load_settings(&config_path, false)?;
    let definition = load_problem_from_file(&problem_path)?;

    for skipped in &definition.skipped_lines {
        println!("{}", ColorOutput::warning(&format!("Skipped {}", skipped)));
    }

    let problem = PlanningProblem::with_definition(settings, definition);

    println!("Initial state:");
    print!("{}", PlanFormatter::format_state(problem.initial_state()));
    println!();

    println!("{}", problem.analyze());

    Ok(())
}
