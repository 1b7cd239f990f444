//! Headless tank arena runner.
//!
//! Runs the simulation without graphics, driven by a scripted autopilot.
//! Designed for soak testing, CI determinism checks and level authoring.
//!
//! # Usage
//!
//! ```bash
//! # Play one seed, JSON summary on stdout
//! cargo run -p arena_headless -- run --seed 42 --max-ticks 20000
//!
//! # Many seeds in parallel
//! cargo run -p arena_headless -- batch --count 500 --output results/batch.json
//!
//! # Same seed several times; exit code 1 on divergence
//! cargo run -p arena_headless -- verify --seed 12345 --runs 5
//!
//! # Check a level set
//! cargo run -p arena_headless -- validate --levels my_levels.ron
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arena_core::config::SimConfig;
use arena_core::level::LevelSet;
use arena_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    levels::{default_levels_path, load_config, load_level_set, validate_level_set},
    runner::{run_game, RunConfig, RunError},
};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless tank arena runner for soak testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Level set RON file (defaults to the bundled levels)
    #[arg(long, global = true)]
    levels: Option<PathBuf>,

    /// Simulation config RON file (defaults to built-in tuning)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single seeded game
    Run {
        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick budget across all levels (0 = unlimited)
        #[arg(long, default_value = "36000")]
        max_ticks: u64,

        /// First level to load
        #[arg(long, default_value = "0")]
        start_level: u32,

        /// Stop after clearing this many levels (0 = never)
        #[arg(long, default_value = "0")]
        max_levels: u32,

        /// Elapsed milliseconds fed to each tick
        #[arg(long, default_value = "16")]
        frame_ms: u64,
    },

    /// Run many seeds in parallel
    Batch {
        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Tick budget per run
        #[arg(long, default_value = "36000")]
        max_ticks: u64,

        /// Output JSON file
        #[arg(short, long, default_value = "results/batch.json")]
        output: PathBuf,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick budget per run
        #[arg(long, default_value = "7200")]
        max_ticks: u64,
    },

    /// Check a level set and report per-level diagnostics
    Validate,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    if let Err(e) = dispatch(&cli) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: &Cli) -> Result<(), RunError> {
    let config = load_config(cli.config.as_deref())?;
    let levels_path = cli.levels.clone().unwrap_or_else(default_levels_path);

    match &cli.command {
        Commands::Run {
            seed,
            max_ticks,
            start_level,
            max_levels,
            frame_ms,
        } => {
            let levels = load_level_set(&levels_path)?;
            let run = RunConfig {
                seed: *seed,
                max_ticks: *max_ticks,
                start_level: *start_level,
                max_levels: *max_levels,
                frame_ms: *frame_ms,
            };
            cmd_run(&config, &levels, &run)
        }
        Commands::Batch {
            count,
            seed,
            parallel,
            max_ticks,
            output,
        } => {
            let levels = load_level_set(&levels_path)?;
            let batch = BatchConfig {
                count: *count,
                seed_start: *seed,
                parallel: *parallel,
                run: RunConfig {
                    max_ticks: *max_ticks,
                    ..RunConfig::default()
                },
            };
            cmd_batch(&config, &levels, batch, output)
        }
        Commands::Verify {
            seed,
            runs,
            max_ticks,
        } => {
            let levels = load_level_set(&levels_path)?;
            let run = RunConfig {
                seed: *seed,
                max_ticks: *max_ticks,
                ..RunConfig::default()
            };
            cmd_verify(&config, &levels, &run, *runs)
        }
        Commands::Validate => cmd_validate(&config, &levels_path),
    }
}

/// Play one seed and print its summary.
fn cmd_run(config: &SimConfig, levels: &LevelSet, run: &RunConfig) -> Result<(), RunError> {
    let summary = run_game(config, levels, run)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Run a batch and save the results.
fn cmd_batch(
    config: &SimConfig,
    levels: &LevelSet,
    batch: BatchConfig,
    output: &Path,
) -> Result<(), RunError> {
    let results = run_batch(batch, config, levels);
    results.save(output)?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs:              {}", summary.total_runs);
    eprintln!("Base destroyed:    {}", summary.base_destroyed);
    eprintln!("Player destroyed:  {}", summary.player_destroyed);
    eprintln!("Tick limit:        {}", summary.tick_limit);
    eprintln!("Avg levels clear:  {:.2}", summary.avg_levels_cleared);
    eprintln!("Avg score:         {:.0}", summary.avg_score);
    eprintln!("Relocations:       {}", summary.relocations);
    if !results.errors.is_empty() {
        eprintln!("Errors:            {}", results.errors.len());
    }
    eprintln!("Results saved to:  {}", output.display());
    Ok(())
}

/// Replay one seed and fail on divergence.
fn cmd_verify(
    config: &SimConfig,
    levels: &LevelSet,
    run: &RunConfig,
    runs: u32,
) -> Result<(), RunError> {
    tracing::info!(seed = run.seed, runs, "Verifying determinism");
    let report = verify_determinism(config, levels, run, runs)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(())
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Print per-level diagnostics; exit 1 when any level has problems.
fn cmd_validate(config: &SimConfig, path: &Path) -> Result<(), RunError> {
    let levels = load_level_set(path)?;
    let reports = validate_level_set(&levels, config);
    println!("{}", serde_json::to_string_pretty(&reports)?);

    let bad = reports.iter().filter(|r| !r.is_clean()).count();
    if bad == 0 {
        eprintln!("PASS: {} levels valid", reports.len());
        Ok(())
    } else {
        eprintln!("FAIL: {bad} of {} levels have problems", reports.len());
        std::process::exit(1);
    }
}
