//! Simulation tuning.
//!
//! Every constant the simulation reads lives in [`SimConfig`]. The defaults
//! reproduce the stock arena; a RON file can override any subset of fields.
//! Tuning knobs are stored as plain `f32`/`u32` so that data files stay
//! readable, and are converted to [`Fixed`] at the point of use.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{ArchetypeKind, PickupKind};
use crate::error::{ArenaError, Result};
use crate::math::{Fixed, Vec2Fixed};

/// Arena geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Side of one tile in world units.
    pub tile_size: u32,
    /// Arena width in tiles.
    pub width_tiles: u32,
    /// Arena height in tiles.
    pub height_tiles: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tile_size: 40,
            width_tiles: 20,
            height_tiles: 15,
        }
    }
}

/// Per-archetype stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    /// Starting and maximum health.
    pub health: u32,
    /// Multiplier applied to the base tank speed.
    pub speed_factor: f32,
    /// Points awarded on destruction.
    pub points: u32,
    /// Ticks between shots.
    pub fire_cooldown: u32,
    /// Box side as a multiple of the standard tank size.
    pub size_factor: u32,
}

/// Stats for every enemy archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeTable {
    /// Standard enemy.
    pub normal: ArchetypeStats,
    /// Armoured enemy.
    pub tough: ArchetypeStats,
    /// Fast, quick-firing enemy.
    pub elite: ArchetypeStats,
    /// Final-level boss.
    pub boss: ArchetypeStats,
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self {
            normal: ArchetypeStats {
                health: 2,
                speed_factor: 0.85,
                points: 100,
                fire_cooldown: 20,
                size_factor: 1,
            },
            tough: ArchetypeStats {
                health: 3,
                speed_factor: 0.75,
                points: 300,
                fire_cooldown: 20,
                size_factor: 1,
            },
            elite: ArchetypeStats {
                health: 4,
                speed_factor: 0.99,
                points: 500,
                fire_cooldown: 12,
                size_factor: 1,
            },
            boss: ArchetypeStats {
                health: 30,
                speed_factor: 0.4,
                points: 5000,
                fire_cooldown: 40,
                size_factor: 2,
            },
        }
    }
}

impl ArchetypeTable {
    /// Stats for one archetype.
    #[must_use]
    pub fn get(&self, kind: ArchetypeKind) -> &ArchetypeStats {
        match kind {
            ArchetypeKind::Normal => &self.normal,
            ArchetypeKind::Tough => &self.tough,
            ArchetypeKind::Elite => &self.elite,
            ArchetypeKind::Boss => &self.boss,
        }
    }
}

/// Player tank tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Lives at the start of a fresh game.
    pub starting_lives: u32,
    /// Ticks between shots.
    pub fire_cooldown: u32,
    /// Ticks between shots with rapid fire active.
    pub rapid_fire_cooldown: u32,
    /// Grace period after a respawn.
    pub invulnerability_ticks: u32,
    /// Perpendicular offset of the two extra shotgun projectiles.
    pub shotgun_offset: f32,
    /// Spawn point in tiles from the bottom-centre: `(width/2 - x, height - y)`.
    pub spawn_offset_tiles: (u32, u32),
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            fire_cooldown: 15,
            rapid_fire_cooldown: 8,
            invulnerability_ticks: 180,
            shotgun_offset: 15.0,
            spawn_offset_tiles: (4, 1),
        }
    }
}

/// Projectile tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// World units per tick.
    pub speed: f32,
    /// Box side in world units.
    pub size: f32,
    /// Damage per hit.
    pub damage: u32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 7.0,
            size: 10.0,
            damage: 1,
        }
    }
}

/// Enemy decision-making knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Allies closer than this many tiles count as nearby.
    pub coordination_radius_tiles: f32,
    /// Health ratio below which a unit retreats.
    pub retreat_health_ratio: f32,
    /// Retreat duration in ticks.
    pub retreat_ticks: u32,
    /// Chance per decision that a strategic unit lies in ambush.
    pub ambush_probability: f32,
    /// Ambush ends once the player is within this many tiles.
    pub ambush_trigger_tiles: f32,
    /// Ambush ends after this many ticks regardless.
    pub ambush_max_ticks: u32,
    /// Chance per decision that an aggressive unit flanks.
    pub flanking_probability: f32,
    /// Flanking duration in ticks.
    pub flanking_ticks: u32,
    /// Flank point offset from the player in tiles.
    pub flank_offset_tiles: f32,
    /// Group size (self included) that allows a coordinated attack.
    pub group_attack_threshold: u32,
    /// Ticks between coordination checks.
    pub coordination_interval: u32,
    /// Chance a coordination check promotes the group.
    pub coordination_probability: f32,
    /// Coordinated attack duration in ticks.
    pub coordinated_attack_ticks: u32,
    /// Support units back off inside this many tiles.
    pub support_min_tiles: f32,
    /// Support units close in beyond this many tiles.
    pub support_max_tiles: f32,
    /// Speed multiplier for aggressive units.
    pub aggressive_speed_bonus: f32,
    /// Chance that a new unit is aggressive.
    pub aggressive_probability: f32,
    /// Chance that a non-aggressive unit is strategic rather than defensive.
    pub strategic_probability: f32,
    /// Aggressive units chase the player beyond this many tiles.
    pub pursuit_min_tiles: f32,
    /// Chance a non-aggressive unit takes an available shot.
    pub fire_probability: f32,
    /// Lower bound of the seeking decision interval in ticks.
    pub decision_min_ticks: u32,
    /// Upper bound (exclusive) of the seeking decision interval in ticks.
    pub decision_max_ticks: u32,
    /// Stuck ticks after which an enclosure check may trigger an escape.
    pub stuck_escape_threshold: u32,
    /// Stuck ticks after which the unit dodges sideways.
    pub stuck_maneuver_threshold: u32,
    /// Sideways dodge duration in ticks.
    pub maneuver_ticks: u32,
    /// Escape duration in ticks.
    pub escape_ticks: u32,
    /// Enclosure probe distance in tiles.
    pub enclosure_probe_tiles: u32,
    /// Escape-target search radius in tiles.
    pub escape_search_tiles: u32,
    /// Escape targets must be further than this many tiles away.
    pub escape_min_tiles: f32,
    /// Look-ahead for the most-open heuristic in tiles.
    pub openness_lookahead_tiles: u32,
    /// A* closed-set budget per search.
    pub max_path_expansions: usize,
    /// Per-level speed growth.
    pub difficulty_step: f32,
    /// Enemy speed ceiling as a multiple of the base tank speed.
    pub max_speed_factor: f32,
    /// Random patrol points generated per unit.
    pub patrol_points: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            coordination_radius_tiles: 5.0,
            retreat_health_ratio: 0.15,
            retreat_ticks: 300,
            ambush_probability: 0.25,
            ambush_trigger_tiles: 4.0,
            ambush_max_ticks: 300,
            flanking_probability: 0.35,
            flanking_ticks: 240,
            flank_offset_tiles: 3.0,
            group_attack_threshold: 2,
            coordination_interval: 40,
            coordination_probability: 0.5,
            coordinated_attack_ticks: 180,
            support_min_tiles: 4.0,
            support_max_tiles: 7.0,
            aggressive_speed_bonus: 1.2,
            aggressive_probability: 0.7,
            strategic_probability: 0.8,
            pursuit_min_tiles: 2.0,
            fire_probability: 0.8,
            decision_min_ticks: 30,
            decision_max_ticks: 90,
            stuck_escape_threshold: 15,
            stuck_maneuver_threshold: 30,
            maneuver_ticks: 60,
            escape_ticks: 240,
            enclosure_probe_tiles: 3,
            escape_search_tiles: 8,
            escape_min_tiles: 2.0,
            openness_lookahead_tiles: 5,
            max_path_expansions: 150,
            difficulty_step: 0.1,
            max_speed_factor: 1.5,
            patrol_points: 4,
        }
    }
}

/// Pickup duration and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupStats {
    /// Effect duration in ticks (zero for instant effects).
    pub duration: u32,
    /// Points awarded on collection.
    pub points: u32,
}

/// Pickup tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupConfig {
    /// Chance a destroyed enemy drops a pickup.
    pub spawn_chance: f32,
    /// Box side as a fraction of a tile.
    pub size_tiles: f32,
    /// Ticks before an uncollected pickup disappears.
    pub lifetime: u32,
    /// Faster reload.
    pub rapid_fire: PickupStats,
    /// Absorbs one hit.
    pub armor: PickupStats,
    /// One more life.
    pub extra_life: PickupStats,
    /// Ignore all damage.
    pub invincible: PickupStats,
    /// Three parallel shots.
    pub shotgun: PickupStats,
    /// Piercing shots.
    pub laser: PickupStats,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.15,
            size_tiles: 0.8,
            lifetime: 1200,
            rapid_fire: PickupStats {
                duration: 600,
                points: 200,
            },
            armor: PickupStats {
                duration: 900,
                points: 300,
            },
            extra_life: PickupStats {
                duration: 0,
                points: 500,
            },
            invincible: PickupStats {
                duration: 300,
                points: 1000,
            },
            shotgun: PickupStats {
                duration: 600,
                points: 400,
            },
            laser: PickupStats {
                duration: 400,
                points: 500,
            },
        }
    }
}

impl PickupConfig {
    /// Stats for one pickup kind.
    #[must_use]
    pub fn get(&self, kind: PickupKind) -> &PickupStats {
        match kind {
            PickupKind::RapidFire => &self.rapid_fire,
            PickupKind::Armor => &self.armor,
            PickupKind::ExtraLife => &self.extra_life,
            PickupKind::Invincible => &self.invincible,
            PickupKind::Shotgun => &self.shotgun,
            PickupKind::Laser => &self.laser,
        }
    }
}

/// Enemy wave tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Enemies on level 0.
    pub base_count: u32,
    /// Extra enemies per level.
    pub count_per_level: f32,
    /// Hard cap on enemies per wave.
    pub max_count: u32,
    /// Tough ratio on level 0.
    pub tough_base_ratio: f32,
    /// Tough ratio growth per level.
    pub tough_ratio_per_level: f32,
    /// Tough ratio ceiling.
    pub tough_max_ratio: f32,
    /// First level (exclusive) at which elites appear.
    pub elite_start_level: u32,
    /// Elite ratio growth per level past the start.
    pub elite_ratio_per_level: f32,
    /// Elite ratio ceiling.
    pub elite_max_ratio: f32,
    /// Placement attempts per wave.
    pub max_attempts: u32,
    /// Candidate points in tile units, cycled per attempt.
    pub spawn_points: Vec<(f32, f32)>,
    /// Level index that spawns the boss alone.
    pub boss_level: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            base_count: 4,
            count_per_level: 1.5,
            max_count: 12,
            tough_base_ratio: 0.2,
            tough_ratio_per_level: 0.15,
            tough_max_ratio: 0.7,
            elite_start_level: 2,
            elite_ratio_per_level: 0.1,
            elite_max_ratio: 0.3,
            max_attempts: 300,
            spawn_points: vec![(1.5, 1.5), (9.5, 1.5), (17.5, 1.5), (1.5, 3.5), (17.5, 3.5)],
            boss_level: 9,
        }
    }
}

/// Points table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Player destroyed a destructible wall.
    pub wall_destroyed: u32,
    /// Flat level-clear bonus.
    pub level_clear_base: u32,
    /// Level-clear bonus per level index.
    pub level_clear_per_level: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            wall_destroyed: 10,
            level_clear_base: 1000,
            level_clear_per_level: 500,
        }
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Arena geometry.
    pub arena: ArenaConfig,
    /// Standard tank box side as a fraction of a tile.
    pub tank_size_tiles: f32,
    /// Base tank speed in world units per tick.
    pub tank_speed: f32,
    /// Gap left between a blocked mover and its obstacle.
    pub collision_epsilon: f32,
    /// Ticks between global anti-embedding sweeps.
    pub sweep_interval: u64,
    /// Per-frame elapsed-time clamp in milliseconds.
    pub max_frame_ms: u32,
    /// Logical ticks per second that a scale of 1.0 represents.
    pub target_tick_rate: u32,
    /// Player tuning.
    pub player: PlayerConfig,
    /// Projectile tuning.
    pub projectile: ProjectileConfig,
    /// Enemy archetypes.
    pub archetypes: ArchetypeTable,
    /// Enemy decision-making.
    pub ai: AiConfig,
    /// Pickups.
    pub pickups: PickupConfig,
    /// Enemy waves.
    pub spawn: SpawnConfig,
    /// Points.
    pub scoring: ScoringConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            tank_size_tiles: 0.9,
            tank_speed: 2.5,
            collision_epsilon: 0.01,
            sweep_interval: 30,
            max_frame_ms: 100,
            target_tick_rate: 60,
            player: PlayerConfig::default(),
            projectile: ProjectileConfig::default(),
            archetypes: ArchetypeTable::default(),
            ai: AiConfig::default(),
            pickups: PickupConfig::default(),
            spawn: SpawnConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ArenaError::DataParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Load a configuration from a RON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ArenaError::LevelLoad(format!("{}: {e}", path.display())))?;
        ron::from_str(&text).map_err(|e| ArenaError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Set the arena size in tiles.
    #[must_use]
    pub fn with_arena_tiles(mut self, width: u32, height: u32) -> Self {
        self.arena.width_tiles = width;
        self.arena.height_tiles = height;
        self
    }

    /// Set the global sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, ticks: u64) -> Self {
        self.sweep_interval = ticks;
        self
    }

    /// Set the A* expansion budget.
    #[must_use]
    pub const fn with_path_budget(mut self, expansions: usize) -> Self {
        self.ai.max_path_expansions = expansions;
        self
    }

    /// Set the pickup drop chance.
    #[must_use]
    pub fn with_pickup_chance(mut self, chance: f32) -> Self {
        self.pickups.spawn_chance = chance;
        self
    }

    /// Tile side in world units.
    #[must_use]
    pub fn tile_size(&self) -> Fixed {
        Fixed::from_num(self.arena.tile_size)
    }

    /// Arena width in world units.
    #[must_use]
    pub fn world_width(&self) -> Fixed {
        Fixed::from_num(self.arena.tile_size * self.arena.width_tiles)
    }

    /// Arena height in world units.
    #[must_use]
    pub fn world_height(&self) -> Fixed {
        Fixed::from_num(self.arena.tile_size * self.arena.height_tiles)
    }

    /// `n` tiles in world units.
    #[must_use]
    pub fn tiles(&self, n: f32) -> Fixed {
        // Multiply before converting so that 0.9 tiles is exactly 36 units.
        Fixed::from_num(n * self.arena.tile_size as f32)
    }

    /// Standard tank box side.
    #[must_use]
    pub fn tank_size(&self) -> Fixed {
        self.tiles(self.tank_size_tiles)
    }

    /// Base tank speed.
    #[must_use]
    pub fn tank_speed(&self) -> Fixed {
        Fixed::from_num(self.tank_speed)
    }

    /// Collision snap gap.
    #[must_use]
    pub fn epsilon(&self) -> Fixed {
        Fixed::from_num(self.collision_epsilon)
    }

    /// Player spawn point.
    #[must_use]
    pub fn player_spawn(&self) -> Vec2Fixed {
        let (dx, dy) = self.player.spawn_offset_tiles;
        Vec2Fixed::new(
            self.world_width() / 2 - self.tiles(dx as f32),
            self.world_height() - self.tiles(dy as f32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let config = SimConfig::default();
        assert_eq!(config.world_width(), Fixed::from_num(800));
        assert_eq!(config.world_height(), Fixed::from_num(600));
        assert_eq!(config.tank_size(), Fixed::from_num(36));
        assert_eq!(config.player_spawn(), Vec2Fixed::from_ints(240, 560));
    }

    #[test]
    fn test_partial_ron_override_keeps_defaults() {
        let config = SimConfig::from_ron_str("(tank_speed: 3.0, ai: (retreat_ticks: 10))").unwrap();
        assert_eq!(config.tank_speed(), Fixed::from_num(3));
        assert_eq!(config.ai.retreat_ticks, 10);
        assert_eq!(config.ai.ambush_max_ticks, 300);
        assert_eq!(config.arena, ArenaConfig::default());
    }

    #[test]
    fn test_invalid_ron_is_a_parse_error() {
        let err = SimConfig::from_ron_str("(tank_speed: \"fast\")").unwrap_err();
        assert!(matches!(err, ArenaError::DataParse { .. }));
    }

    #[test]
    fn test_archetype_table_lookup() {
        let table = ArchetypeTable::default();
        assert_eq!(table.get(ArchetypeKind::Boss).health, 30);
        assert_eq!(table.get(ArchetypeKind::Boss).size_factor, 2);
        assert_eq!(table.get(ArchetypeKind::Tough).points, 300);
    }
}
