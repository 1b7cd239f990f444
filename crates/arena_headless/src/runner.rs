//! Headless level runner.
//!
//! Drives a [`Simulation`] with the autopilot, handling level progression:
//! a cleared level loads the next one, a game over stops the run.

use std::time::Duration;

use arena_core::config::SimConfig;
use arena_core::error::ArenaError;
use arena_core::level::LevelSet;
use arena_core::simulation::Simulation;
use arena_core::world::SimStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::autopilot::autopilot_input;
use crate::levels::LevelSetError;
use crate::metrics::{EventTally, Outcome, RunSummary};

/// Error type for headless runs.
#[derive(Error, Debug)]
pub enum RunError {
    /// Loading data files failed.
    #[error(transparent)]
    Data(#[from] LevelSetError),
    /// The simulation rejected a request.
    #[error("Simulation error: {0}")]
    Simulation(#[from] ArenaError),
    /// Writing output failed.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding output failed.
    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameters for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Simulation seed.
    pub seed: u64,
    /// Tick budget across all levels (0 = unlimited).
    pub max_ticks: u64,
    /// First level to load.
    pub start_level: u32,
    /// Stop after clearing this many levels (0 = never).
    pub max_levels: u32,
    /// Elapsed wall time fed to each tick.
    pub frame_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_ticks: 36_000, // 10 minutes at 60 tps
            start_level: 0,
            max_levels: 0,
            frame_ms: 16,
        }
    }
}

impl RunConfig {
    /// Same config with another seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Headless runner for one seeded game.
pub struct HeadlessRunner {
    sim: Simulation,
    run: RunConfig,
}

impl HeadlessRunner {
    /// Create a runner positioned at the configured start level.
    #[must_use]
    pub fn new(config: SimConfig, levels: LevelSet, run: RunConfig) -> Self {
        let mut sim = Simulation::new(config, levels, run.seed);
        if run.start_level > 0 {
            sim.load_level(run.start_level, true);
        }
        Self { sim, run }
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Play until game over, the level limit or the tick budget.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Simulation`] if level progression is refused.
    pub fn run(mut self) -> Result<RunSummary, RunError> {
        let frame = Duration::from_millis(self.run.frame_ms);
        let mut tally = EventTally::default();
        let mut levels_cleared = 0u32;
        let mut ticks = 0u64;

        tracing::info!(
            seed = self.run.seed,
            start_level = self.run.start_level,
            max_ticks = self.run.max_ticks,
            "Starting run"
        );

        let outcome = loop {
            match self.sim.status() {
                SimStatus::GameOver(cause) => break Outcome::from(cause),
                SimStatus::LevelClear => {
                    levels_cleared += 1;
                    if self.run.max_levels > 0 && levels_cleared >= self.run.max_levels {
                        break Outcome::LevelsComplete;
                    }
                    let events = self.sim.advance_level()?;
                    tally.record(&events);
                    continue;
                }
                SimStatus::Playing => {}
            }
            if self.run.max_ticks > 0 && ticks >= self.run.max_ticks {
                break Outcome::TickLimit;
            }

            let input = autopilot_input(self.sim.world());
            let events = self.sim.tick(input, frame);
            tally.record(&events);
            ticks += 1;
        };

        let world = self.sim.world();
        let summary = RunSummary {
            seed: self.run.seed,
            ticks,
            start_level: self.run.start_level,
            final_level: world.level,
            levels_cleared,
            score: world.score,
            lives: world.lives,
            outcome,
            state_hash: self.sim.state_hash(),
            events: tally,
        };
        tracing::info!(
            seed = summary.seed,
            ticks = summary.ticks,
            level = summary.final_level,
            score = summary.score,
            outcome = ?summary.outcome,
            "Run finished"
        );
        Ok(summary)
    }
}

/// Run one seeded game to completion.
///
/// # Errors
///
/// See [`HeadlessRunner::run`].
pub fn run_game(
    config: &SimConfig,
    levels: &LevelSet,
    run: &RunConfig,
) -> Result<RunSummary, RunError> {
    HeadlessRunner::new(config.clone(), levels.clone(), run.clone()).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_run(seed: u64) -> RunConfig {
        RunConfig {
            seed,
            max_ticks: 600,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_run_respects_tick_budget() {
        let summary = run_game(&SimConfig::default(), &LevelSet::builtin(), &short_run(1)).unwrap();
        assert!(summary.ticks <= 600);
        if summary.outcome == Outcome::TickLimit {
            assert_eq!(summary.ticks, 600);
        }
        assert!(summary.events.projectiles_fired > 0);
    }

    #[test]
    fn test_same_seed_same_summary() {
        let config = SimConfig::default();
        let levels = LevelSet::builtin();
        let a = run_game(&config, &levels, &short_run(77)).unwrap();
        let b = run_game(&config, &levels, &short_run(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_start_level_is_honoured() {
        let run = RunConfig {
            start_level: 3,
            max_ticks: 1,
            ..RunConfig::default()
        };
        let runner = HeadlessRunner::new(SimConfig::default(), LevelSet::builtin(), run);
        assert_eq!(runner.simulation().world().level, 3);
    }

    #[test]
    fn test_cleared_level_advances() {
        let mut runner =
            HeadlessRunner::new(SimConfig::default(), LevelSet::builtin(), short_run(4));
        runner.sim.world_mut().enemies.clear();
        runner.run.max_levels = 1;
        let summary = runner.run().unwrap();

        assert_eq!(summary.outcome, Outcome::LevelsComplete);
        assert_eq!(summary.levels_cleared, 1);
        assert_eq!(summary.score, 1000);
        assert_eq!(summary.ticks, 1);
    }
}
