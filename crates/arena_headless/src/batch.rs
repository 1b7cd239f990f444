//! Batch runner for soak testing.
//!
//! Runs many seeds in parallel using rayon. Each run owns its own
//! simulation, so results are independent of scheduling.

use std::path::Path;
use std::time::Instant;

use arena_core::config::SimConfig;
use arena_core::level::LevelSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::{BatchSummary, RunSummary};
use crate::runner::{run_game, RunConfig, RunError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of runs
    pub count: u32,
    /// Seed of the first run; later runs count upward
    pub seed_start: u64,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel: u32,
    /// Per-run parameters; its seed is overridden
    pub run: RunConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 100,
            seed_start: 0,
            parallel: 0,
            run: RunConfig::default(),
        }
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual runs, in seed order
    pub runs: Vec<RunSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run a batch of seeds.
pub fn run_batch(config: BatchConfig, sim_config: &SimConfig, levels: &LevelSet) -> BatchResults {
    let start = Instant::now();
    info!(
        count = config.count,
        seed_start = config.seed_start,
        parallel = config.parallel,
        "Starting batch run"
    );

    let seeds: Vec<u64> = (0..u64::from(config.count))
        .map(|i| config.seed_start.wrapping_add(i))
        .collect();
    let play = |seed: u64| -> (u64, Result<RunSummary, RunError>) {
        let run = config.run.clone().with_seed(seed);
        (seed, run_game(sim_config, levels, &run))
    };

    let outcomes: Vec<(u64, Result<RunSummary, RunError>)> = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(|| seeds.par_iter().map(|&s| play(s)).collect()),
            Err(e) => {
                warn!(error = %e, "Failed to build thread pool, using global pool");
                seeds.par_iter().map(|&s| play(s)).collect()
            }
        }
    } else {
        seeds.par_iter().map(|&s| play(s)).collect()
    };

    let mut runs = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (seed, outcome) in outcomes {
        match outcome {
            Ok(summary) => runs.push(summary),
            Err(e) => {
                warn!(seed, error = %e, "Run failed");
                errors.push(BatchError {
                    seed,
                    message: e.to_string(),
                });
            }
        }
    }

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = runs.len(),
        errors = errors.len(),
        duration_secs = format!("{duration_seconds:.1}"),
        "Batch finished"
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed checked
    pub seed: u64,
    /// Final state hash of each repetition
    pub hashes: Vec<u64>,
    /// Whether every repetition matched
    pub deterministic: bool,
}

/// Run one seed `runs` times and compare final state hashes.
///
/// # Errors
///
/// Propagates the first failed run.
pub fn verify_determinism(
    sim_config: &SimConfig,
    levels: &LevelSet,
    run: &RunConfig,
    runs: u32,
) -> Result<VerifyReport, RunError> {
    let hashes = (0..runs)
        .map(|_| run_game(sim_config, levels, run).map(|s| s.state_hash))
        .collect::<Result<Vec<_>, _>>()?;
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(seed = run.seed, ?hashes, "Non-determinism detected");
    }
    Ok(VerifyReport {
        seed: run.seed,
        hashes,
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_batch() -> BatchConfig {
        BatchConfig {
            count: 4,
            seed_start: 10,
            parallel: 2,
            run: RunConfig {
                max_ticks: 300,
                ..RunConfig::default()
            },
        }
    }

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let results = run_batch(small_batch(), &SimConfig::default(), &LevelSet::builtin());
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        assert_eq!(results.summary.total_runs, 4);
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let config = SimConfig::default();
        let levels = LevelSet::builtin();
        let results = run_batch(small_batch(), &config, &levels);
        let sequential = run_game(&config, &levels, &small_batch().run.with_seed(12)).unwrap();
        assert_eq!(results.runs[2], sequential);
    }

    #[test]
    fn test_results_round_trip_through_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("batch.json");
        let results = run_batch(
            BatchConfig {
                count: 1,
                ..small_batch()
            },
            &SimConfig::default(),
            &LevelSet::builtin(),
        );
        results.save(&path).unwrap();

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.runs, results.runs);
        assert_eq!(loaded.summary, results.summary);
    }

    #[test]
    fn test_verify_reports_deterministic() {
        let run = RunConfig {
            seed: 5,
            max_ticks: 240,
            ..RunConfig::default()
        };
        let report =
            verify_determinism(&SimConfig::default(), &LevelSet::builtin(), &run, 3).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 3);
    }
}
