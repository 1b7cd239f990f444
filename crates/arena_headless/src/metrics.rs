//! Run metrics collected from simulation events.

use arena_core::events::{GameOverCause, SimEvent, TickEvents};
use serde::{Deserialize, Serialize};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A projectile reached the base.
    BaseDestroyed,
    /// The player ran out of lives.
    PlayerDestroyed,
    /// The tick budget ran out while still playing.
    TickLimit,
    /// The last requested level was cleared.
    LevelsComplete,
}

impl From<GameOverCause> for Outcome {
    fn from(cause: GameOverCause) -> Self {
        match cause {
            GameOverCause::BaseDestroyed => Self::BaseDestroyed,
            GameOverCause::PlayerDestroyed => Self::PlayerDestroyed,
        }
    }
}

/// Event counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
    /// Projectiles fired by anyone.
    pub projectiles_fired: u32,
    /// Enemies destroyed.
    pub enemies_destroyed: u32,
    /// Destructible walls shot away.
    pub walls_destroyed: u32,
    /// Pickups dropped.
    pub pickups_spawned: u32,
    /// Pickups collected.
    pub pickups_collected: u32,
    /// Lives lost.
    pub lives_lost: u32,
    /// Forced relocations of stuck units.
    pub relocations: u32,
}

impl EventTally {
    /// Count every event in a tick's buffer.
    pub fn record(&mut self, events: &TickEvents) {
        for event in events.iter() {
            match event {
                SimEvent::ProjectileFired { .. } => self.projectiles_fired += 1,
                SimEvent::UnitDestroyed { .. } => self.enemies_destroyed += 1,
                SimEvent::WallDestroyed { .. } => self.walls_destroyed += 1,
                SimEvent::PickupSpawned { .. } => self.pickups_spawned += 1,
                SimEvent::PickupCollected { .. } => self.pickups_collected += 1,
                SimEvent::LifeLost { .. } => self.lives_lost += 1,
                SimEvent::UnitRelocated { .. } => self.relocations += 1,
                _ => {}
            }
        }
    }
}

/// Summary of one headless run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Seed the run used.
    pub seed: u64,
    /// Ticks simulated across all levels.
    pub ticks: u64,
    /// Level the run started on.
    pub start_level: u32,
    /// Level the run ended on.
    pub final_level: u32,
    /// Levels cleared.
    pub levels_cleared: u32,
    /// Final score.
    pub score: u64,
    /// Lives left.
    pub lives: u32,
    /// How the run ended.
    pub outcome: Outcome,
    /// Final state hash.
    pub state_hash: u64,
    /// Event counters.
    pub events: EventTally,
}

/// Aggregate over a batch of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs completed.
    pub total_runs: u32,
    /// Runs ending with the base destroyed.
    pub base_destroyed: u32,
    /// Runs ending with no lives left.
    pub player_destroyed: u32,
    /// Runs stopped by the tick budget.
    pub tick_limit: u32,
    /// Runs that cleared every requested level.
    pub levels_complete: u32,
    /// Mean levels cleared per run.
    pub avg_levels_cleared: f64,
    /// Mean final score.
    pub avg_score: f64,
    /// Highest final score.
    pub max_score: u64,
    /// Total forced relocations across all runs.
    pub relocations: u32,
}

impl BatchSummary {
    /// Calculate summary from a list of runs.
    #[must_use]
    pub fn from_runs(runs: &[RunSummary]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_runs: runs.len() as u32,
            ..Default::default()
        };
        let mut cleared = 0u64;
        let mut score = 0u64;

        for run in runs {
            match run.outcome {
                Outcome::BaseDestroyed => summary.base_destroyed += 1,
                Outcome::PlayerDestroyed => summary.player_destroyed += 1,
                Outcome::TickLimit => summary.tick_limit += 1,
                Outcome::LevelsComplete => summary.levels_complete += 1,
            }
            cleared += u64::from(run.levels_cleared);
            score += run.score;
            summary.max_score = summary.max_score.max(run.score);
            summary.relocations += run.events.relocations;
        }

        summary.avg_levels_cleared = cleared as f64 / runs.len() as f64;
        summary.avg_score = score as f64 / runs.len() as f64;
        summary
    }
}
