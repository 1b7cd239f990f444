//! Core simulation loop.
//!
//! A [`Simulation`] owns the configuration, the level table and the live
//! [`World`], and advances everything through one fixed-order tick per
//! frame.
//!
//! # Tick order
//!
//! 1. Player update
//! 2. Enemy updates, in list order
//! 3. Projectile flight
//! 4. Pickup ageing
//! 5. Projectile hits, then pickup collection
//! 6. Anti-embedding sweep (every `sweep_interval` ticks)
//! 7. Level-clear check
//!
//! Updates are strictly sequential: a unit moved earlier in the tick is an
//! obstacle for every unit processed after it.
//!
//! # Determinism
//!
//! - Positions, speeds and timers are fixed-point ([`Fixed`](crate::math::Fixed))
//! - Each tick draws from its own RNG stream seeded from `(seed, tick)`, so
//!   restoring a snapshot resumes the exact same sequence
//! - Same seed and inputs always produce the same [`Simulation::state_hash`]
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use arena_core::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default(), LevelSet::builtin(), 42);
//! let events = sim.tick(ControlInput::IDLE.firing(), Duration::from_millis(16));
//! assert_eq!(sim.get_tick(), 1);
//! assert!(!events.is_empty());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::ai::update_enemy;
use crate::collision::{is_embedded, recover, sweep};
use crate::combat::{advance_projectiles, resolve_projectiles};
use crate::components::{ControlInput, Unit, UnitId};
use crate::config::SimConfig;
use crate::error::{ArenaError, Result};
use crate::events::{SimEvent, TickEvents};
use crate::level::LevelSet;
use crate::pickups::{age_pickups, resolve_pickups};
use crate::player::{new_player, update_player};
use crate::spawn::{spawn_wave, SpawnPlan};
use crate::timer::TimeScale;
use crate::world::{SimStatus, World};

/// Stream selector mixed into the seed for level generation.
const LEVEL_STREAM: u64 = 0x4c45_5645_4c5f_5253;

/// Everything a unit update may touch during one tick.
pub(crate) struct TickContext<'a> {
    pub world: &'a mut World,
    pub config: &'a SimConfig,
    pub rng: &'a mut SmallRng,
    pub events: &'a mut TickEvents,
    pub scale: TimeScale,
}

/// SplitMix64 finaliser over `seed ^ salt`.
fn mix(seed: u64, salt: u64) -> u64 {
    let mut z = seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Serialized level state.
#[derive(Serialize, Deserialize)]
struct Checkpoint {
    tick: u64,
    world: World,
}

/// The deterministic arena simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    levels: LevelSet,
    seed: u64,
    tick: u64,
    world: World,
}

impl Simulation {
    /// Create a simulation and load level 0.
    #[must_use]
    pub fn new(config: SimConfig, levels: LevelSet, seed: u64) -> Self {
        let mut sim = Self {
            world: World::new(&config),
            config,
            levels,
            seed,
            tick: 0,
        };
        sim.load_level(0, true);
        sim
    }

    /// Wrap a prepared world. The built-in level table is used for any
    /// later level loads.
    #[must_use]
    pub fn with_world(config: SimConfig, world: World, seed: u64) -> Self {
        Self {
            config,
            levels: LevelSet::builtin(),
            seed,
            tick: 0,
            world,
        }
    }

    /// Replace the world with a fresh level.
    ///
    /// The new world is built completely before it is swapped in. Score and
    /// lives carry over unless `reset_score` is set.
    pub fn load_level(&mut self, index: u32, reset_score: bool) -> TickEvents {
        let mut events = TickEvents::default();
        let mut rng = SmallRng::seed_from_u64(mix(self.seed ^ LEVEL_STREAM, u64::from(index)));

        let layout = self.levels.layout_for(index, &self.config, &mut rng);
        let mut world = World::from_level(layout.decode(&self.config), &self.config);
        world.level = index;
        if !reset_score {
            world.score = self.world.score;
            world.lives = self.world.lives;
        }

        let mut player = new_player(&mut world, &self.config);
        if is_embedded(&world, &player.rect()) {
            recover(&world, &mut player, &self.config, &mut events);
        }
        world.player = Some(player);

        let plan = SpawnPlan::for_level(index, &self.config.spawn);
        spawn_wave(&mut world, &self.config, &mut rng, &plan, &mut events);

        tracing::info!(
            level = index,
            layout = %layout.name,
            enemies = world.enemies.len(),
            walls = world.walls().len(),
            "Level loaded"
        );
        self.world = world;
        events
    }

    /// Load the next level after a clear.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidState`] unless the current level is
    /// cleared.
    pub fn advance_level(&mut self) -> Result<TickEvents> {
        if self.world.status != SimStatus::LevelClear {
            return Err(ArenaError::InvalidState(format!(
                "cannot advance from {:?}",
                self.world.status
            )));
        }
        let next = self.world.level.saturating_add(1);
        Ok(self.load_level(next, false))
    }

    /// Start over from level 0 with fresh score and lives.
    pub fn restart(&mut self) -> TickEvents {
        self.tick = 0;
        self.load_level(0, true)
    }

    /// Advance by one frame of `elapsed` wall time.
    ///
    /// Elapsed time is clamped to the configured frame limit and converted
    /// into a [`TimeScale`].
    pub fn tick(&mut self, input: ControlInput, elapsed: Duration) -> TickEvents {
        let scale = TimeScale::from_elapsed(
            elapsed,
            self.config.max_frame_ms,
            self.config.target_tick_rate,
        );
        self.tick_scaled(input, scale)
    }

    /// Advance by one tick with an explicit scale.
    ///
    /// Does nothing unless the level is [`SimStatus::Playing`].
    pub fn tick_scaled(&mut self, input: ControlInput, scale: TimeScale) -> TickEvents {
        let mut events = TickEvents::default();
        if !self.world.is_playing() {
            return events;
        }

        let mut rng = SmallRng::seed_from_u64(mix(self.seed, self.tick));
        let mut ctx = TickContext {
            world: &mut self.world,
            config: &self.config,
            rng: &mut rng,
            events: &mut events,
            scale,
        };

        // 1. Player
        if let Some(mut player) = ctx.world.player.take() {
            update_player(&mut ctx, &mut player, input);
            ctx.world.player = Some(player);
        }

        // 2. Enemies, each detached while it moves
        for i in 0..ctx.world.enemies.len() {
            let mut enemy = ctx.world.enemies.remove(i);
            update_enemy(&mut ctx, &mut enemy);
            ctx.world.enemies.insert(i, enemy);
        }

        // 3-5. Projectiles and pickups
        advance_projectiles(ctx.world, scale);
        age_pickups(ctx.world, scale);
        resolve_projectiles(ctx.world, ctx.config, ctx.rng, ctx.events);
        resolve_pickups(ctx.world, ctx.config, ctx.events);

        self.tick += 1;

        // 6. Sweep
        let interval = self.config.sweep_interval;
        if interval > 0 && self.tick % interval == 0 {
            sweep(&mut self.world, &self.config, &mut events);
        }

        // 7. Level clear
        if self.world.is_playing() && self.world.enemies.is_empty() {
            self.clear_level(&mut events);
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    fn clear_level(&mut self, events: &mut TickEvents) {
        let scoring = &self.config.scoring;
        let level = self.world.level;
        let bonus = scoring
            .level_clear_base
            .saturating_add(scoring.level_clear_per_level.saturating_mul(level));
        self.world.add_score(bonus);
        self.world.status = SimStatus::LevelClear;
        events.push(SimEvent::LevelCleared { level, bonus });
        tracing::info!(level, bonus, score = self.world.score, "Level cleared");
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Seed every random stream derives from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Level table.
    #[must_use]
    pub const fn levels(&self) -> &LevelSet {
        &self.levels
    }

    /// The live world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the live world, for scenario setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Running state.
    #[must_use]
    pub const fn status(&self) -> SimStatus {
        self.world.status
    }

    /// Look up a live unit.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::UnitNotFound`] if no such unit exists.
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.world.unit(id).ok_or(ArenaError::UnitNotFound(id))
    }

    /// Hash of the tick counter and the whole world.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.world.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the tick counter and world.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Snapshot`] if encoding fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let checkpoint = Checkpoint {
            tick: self.tick,
            world: self.world.clone(),
        };
        bincode::serialize(&checkpoint)
            .map_err(|e| ArenaError::Snapshot(format!("Failed to encode checkpoint: {e}")))
    }

    /// Replace the tick counter and world from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Snapshot`] if the bytes do not decode; the
    /// current state is left untouched in that case.
    pub fn restore(&mut self, data: &[u8]) -> Result<()> {
        let checkpoint: Checkpoint = bincode::deserialize(data)
            .map_err(|e| ArenaError::Snapshot(format!("Failed to decode checkpoint: {e}")))?;
        self.tick = checkpoint.tick;
        self.world = checkpoint.world;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GameOverCause;

    fn sim(seed: u64) -> Simulation {
        Simulation::new(SimConfig::default(), LevelSet::builtin(), seed)
    }

    #[test]
    fn test_new_loads_first_level() {
        let sim = sim(1);
        assert_eq!(sim.get_tick(), 0);
        assert_eq!(sim.status(), SimStatus::Playing);
        assert!(sim.world().player.is_some());
        assert!(!sim.world().enemies.is_empty());
        assert!(sim.world().base().is_some());
        assert_eq!(sim.world().lives, 3);
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut sim = sim(1);
        sim.tick(ControlInput::IDLE, Duration::from_millis(16));
        sim.tick(ControlInput::IDLE, Duration::from_millis(16));
        assert_eq!(sim.get_tick(), 2);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let mut a = sim(7);
        let mut b = sim(7);
        for i in 0..120 {
            let input = if i % 3 == 0 {
                ControlInput::toward(crate::components::Direction::Up).firing()
            } else {
                ControlInput::IDLE
            };
            a.tick_scaled(input, TimeScale::ONE);
            b.tick_scaled(input, TimeScale::ONE);
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_empty_wave_clears_level_with_bonus() {
        let mut sim = sim(3);
        sim.world_mut().enemies.clear();
        let events = sim.tick_scaled(ControlInput::IDLE, TimeScale::ONE);

        assert_eq!(sim.status(), SimStatus::LevelClear);
        assert_eq!(sim.world().score, 1000);
        assert_eq!(
            events.count(|e| matches!(e, SimEvent::LevelCleared { level: 0, bonus: 1000 })),
            1
        );

        let tick = sim.get_tick();
        sim.tick_scaled(ControlInput::IDLE, TimeScale::ONE);
        assert_eq!(sim.get_tick(), tick);
    }

    #[test]
    fn test_advance_level_carries_score() {
        let mut sim = sim(3);
        assert!(matches!(
            sim.advance_level(),
            Err(ArenaError::InvalidState(_))
        ));

        sim.world_mut().enemies.clear();
        sim.world_mut().lives = 2;
        sim.tick_scaled(ControlInput::IDLE, TimeScale::ONE);
        sim.advance_level().unwrap();

        assert_eq!(sim.world().level, 1);
        assert_eq!(sim.world().score, 1000);
        assert_eq!(sim.world().lives, 2);
        assert_eq!(sim.status(), SimStatus::Playing);
    }

    #[test]
    fn test_game_over_stops_ticking() {
        let mut sim = sim(3);
        sim.world_mut().status = SimStatus::GameOver(GameOverCause::BaseDestroyed);
        let events = sim.tick_scaled(ControlInput::IDLE.firing(), TimeScale::ONE);
        assert!(events.is_empty());
        assert_eq!(sim.get_tick(), 0);
    }

    #[test]
    fn test_snapshot_restore_resumes_identically() {
        let mut sim = sim(11);
        for _ in 0..30 {
            sim.tick_scaled(ControlInput::IDLE.firing(), TimeScale::ONE);
        }
        let snapshot = sim.snapshot().unwrap();
        let mut other = sim.clone();

        for _ in 0..30 {
            sim.tick_scaled(ControlInput::IDLE, TimeScale::ONE);
        }
        let expected = sim.state_hash();

        for _ in 0..5 {
            other.tick_scaled(ControlInput::IDLE.firing(), TimeScale::ONE);
        }
        other.restore(&snapshot).unwrap();
        for _ in 0..30 {
            other.tick_scaled(ControlInput::IDLE, TimeScale::ONE);
        }
        assert_eq!(other.state_hash(), expected);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let mut sim = sim(1);
        let before = sim.state_hash();
        assert!(matches!(sim.restore(&[1, 2, 3]), Err(ArenaError::Snapshot(_))));
        assert_eq!(sim.state_hash(), before);
    }

    #[test]
    fn test_unit_lookup() {
        let sim = sim(1);
        let player_id = sim.world().player.as_ref().map(|p| p.id).unwrap();
        assert!(sim.unit(player_id).is_ok());
        assert!(matches!(sim.unit(9999), Err(ArenaError::UnitNotFound(9999))));
    }
}
