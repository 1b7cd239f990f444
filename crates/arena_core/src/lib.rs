//! # Arena Core
//!
//! Deterministic simulation core for a top-down tank arena.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO beyond loading data files
//! - No system randomness (every stream is seeded)
//! - No floating-point state (positions and timers are fixed-point)
//!
//! This separation enables:
//! - Headless soak runs and CI determinism checks
//! - Snapshot and restore of a running level
//! - Presentation layers that only consume [`events::TickEvents`]
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Tick loop, level flow and checkpoints
//! - [`world`] - The live aggregate every subsystem mutates
//! - [`components`] - Units, projectiles, pickups and control input
//! - [`collision`] - Axis-separated movement, unsticking and the sweep
//! - [`pathfinding`] - Occupancy grid and A* search
//! - [`recovery`] - Enclosure detection and escape heuristics
//! - [`ai`] - Enemy state machine and group coordination
//! - [`player`] - Player control, weapons and respawn
//! - [`combat`] - Projectile flight and hit resolution
//! - [`pickups`] - Power-up drops and effects
//! - [`spawn`] - Wave planning and enemy placement
//! - [`level`] - Layout decoding and the level table
//! - [`config`] - Tunable constants
//! - [`timer`] - Frame scaling and countdowns
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod collision;
pub mod combat;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod level;
pub mod math;
pub mod pathfinding;
pub mod pickups;
pub mod player;
pub mod recovery;
pub mod simulation;
pub mod spawn;
pub mod timer;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimConfig;
    pub use crate::error::{ArenaError, Result};
    pub use crate::events::{GameOverCause, SimEvent, TickEvents};
    pub use crate::level::{LevelLayout, LevelSet};
    pub use crate::math::{Fixed, Rect, Vec2Fixed};
    pub use crate::pathfinding::{OccupancyGrid, TilePos};
    pub use crate::simulation::Simulation;
    pub use crate::spawn::SpawnPlan;
    pub use crate::timer::{Countdown, TimeScale};
    pub use crate::world::{SimStatus, World};
}
