//! Test fixtures and helpers.
//!
//! Worlds are described as ASCII maps, one character per tile:
//!
//! | Char | Tile |
//! |------|------|
//! | `.`  | empty |
//! | `b`  | destructible wall |
//! | `#`  | indestructible wall |
//! | `H`  | base |
//! | `~`  | cover |
//! | `P`  | empty, player tank centred here |
//! | `E`  | empty, Normal enemy centred here |
//! | `T`  | empty, Tough enemy centred here |
//!
//! ```
//! use arena_test_utils::fixtures::MapFixture;
//!
//! let fixture = MapFixture::parse(
//!     "#####
//!      #P.E#
//!      #####",
//! );
//! assert_eq!(fixture.world.enemies.len(), 1);
//! assert!(fixture.world.player.is_some());
//! ```

use arena_core::components::{ArchetypeKind, Personality, Unit, UnitId};
use arena_core::config::SimConfig;
use arena_core::level::{
    LevelLayout, TILE_BASE, TILE_BRICK, TILE_COVER, TILE_EMPTY, TILE_STEEL,
};
use arena_core::math::Vec2Fixed;
use arena_core::player::new_player;
use arena_core::simulation::Simulation;
use arena_core::spawn::new_enemy;
use arena_core::world::World;
use fixed::types::I32F32;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Top-left position that centres a tank of the default size on a tile.
#[must_use]
pub fn tank_on_tile(config: &SimConfig, x: i32, y: i32) -> Vec2Fixed {
    let tile = config.tile_size();
    let inset = (tile - config.tank_size()) / 2;
    Vec2Fixed::new(tile * i64::from(x) + inset, tile * i64::from(y) + inset)
}

/// A world built from an ASCII map, plus the config sized to fit it.
#[derive(Debug, Clone)]
pub struct MapFixture {
    /// Config with the arena resized to the map.
    pub config: SimConfig,
    /// The populated world.
    pub world: World,
}

impl MapFixture {
    /// Parse a map using default tuning.
    ///
    /// Enemies are Defensive and move at the plain tank speed so scenario
    /// outcomes do not depend on the personality roll. Leading whitespace on
    /// each line is ignored so maps can be indented inside test bodies.
    ///
    /// # Panics
    ///
    /// Panics on an unknown map character.
    #[must_use]
    pub fn parse(map: &str) -> Self {
        Self::parse_with(map, SimConfig::default())
    }

    /// Parse a map, keeping everything in `config` except the arena size.
    ///
    /// # Panics
    ///
    /// Panics on an unknown map character.
    #[must_use]
    pub fn parse_with(map: &str, config: SimConfig) -> Self {
        let lines: Vec<&str> = map
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let height = lines.len();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let config = config.with_arena_tiles(width as u32, height as u32);

        let mut rows = Vec::with_capacity(height);
        let mut player_tile = None;
        let mut enemy_tiles = Vec::new();
        for (y, line) in lines.iter().enumerate() {
            let mut row = vec![TILE_EMPTY; width];
            for (x, ch) in line.chars().enumerate() {
                row[x] = match ch {
                    '.' => TILE_EMPTY,
                    'b' => TILE_BRICK,
                    '#' => TILE_STEEL,
                    'H' => TILE_BASE,
                    '~' => TILE_COVER,
                    'P' => {
                        player_tile = Some((x as i32, y as i32));
                        TILE_EMPTY
                    }
                    'E' => {
                        enemy_tiles.push((x as i32, y as i32, ArchetypeKind::Normal));
                        TILE_EMPTY
                    }
                    'T' => {
                        enemy_tiles.push((x as i32, y as i32, ArchetypeKind::Tough));
                        TILE_EMPTY
                    }
                    other => panic!("unknown map character {other:?} at ({x}, {y})"),
                };
            }
            rows.push(row);
        }

        let layout = LevelLayout::new("fixture", rows);
        let mut world = World::from_level(layout.decode(&config), &config);

        if let Some((x, y)) = player_tile {
            world.player_spawn = tank_on_tile(&config, x, y);
            let player = new_player(&mut world, &config);
            world.player = Some(player);
        }

        let mut rng = SmallRng::seed_from_u64(0);
        for (x, y, archetype) in enemy_tiles {
            let pos = tank_on_tile(&config, x, y);
            let mut enemy = new_enemy(&mut world, &config, &mut rng, pos, archetype);
            if let Some(brain) = enemy.brain_mut() {
                brain.personality = Personality::Defensive;
            }
            enemy.base_speed = config.tank_speed();
            enemy.speed = enemy.base_speed;
            world.enemies.push(enemy);
        }

        tracing::trace!(width, height, enemies = world.enemies.len(), "Fixture parsed");
        Self { config, world }
    }

    /// Id of the player tank.
    ///
    /// # Panics
    ///
    /// Panics if the map has no `P`.
    #[must_use]
    pub fn player_id(&self) -> UnitId {
        self.world
            .player
            .as_ref()
            .map(|p| p.id)
            .expect("fixture has no player")
    }

    /// Ids of the enemies in map order.
    #[must_use]
    pub fn enemy_ids(&self) -> Vec<UnitId> {
        self.world.enemies.iter().map(|e| e.id).collect()
    }

    /// Mutable access to an enemy by map order.
    ///
    /// # Panics
    ///
    /// Panics if there is no such enemy.
    pub fn enemy_mut(&mut self, index: usize) -> &mut Unit {
        &mut self.world.enemies[index]
    }

    /// Wrap the fixture in a simulation.
    #[must_use]
    pub fn into_simulation(self, seed: u64) -> Simulation {
        Simulation::with_world(self.config, self.world, seed)
    }
}

/// An empty `width x height` arena with indestructible walls around the rim.
#[must_use]
pub fn walled_arena(width: usize, height: usize) -> String {
    let mut map = String::new();
    for y in 0..height {
        for x in 0..width {
            let edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            map.push(if edge { '#' } else { '.' });
        }
        map.push('\n');
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::components::WallKind;
    use arena_core::math::Fixed;
    use arena_core::pathfinding::TilePos;

    #[test]
    fn test_parse_places_terrain_and_units() {
        let fixture = MapFixture::parse(
            "#b~H
             P.ET",
        );
        let world = &fixture.world;
        assert_eq!(fixture.config.arena.width_tiles, 4);
        assert_eq!(fixture.config.arena.height_tiles, 2);
        assert_eq!(
            world.walls().get(&TilePos::new(0, 0)),
            Some(&WallKind::Indestructible)
        );
        assert_eq!(
            world.walls().get(&TilePos::new(1, 0)),
            Some(&WallKind::Destructible)
        );
        assert!(world.cover().contains(&TilePos::new(2, 0)));
        assert_eq!(world.surviving_base(), Some(TilePos::new(3, 0)));
        assert_eq!(world.enemies.len(), 2);
        assert_eq!(world.enemies[1].archetype(), Some(ArchetypeKind::Tough));
    }

    #[test]
    fn test_units_are_centred_on_tiles() {
        let fixture = MapFixture::parse("P.E");
        let player = fixture.world.player.as_ref().unwrap();
        assert_eq!(player.pos, Vec2Fixed::new(fixed(2), fixed(2)));
        assert_eq!(fixture.world.enemies[0].pos.x, fixed(82));
    }

    #[test]
    fn test_walled_arena_shape() {
        let fixture = MapFixture::parse(&walled_arena(5, 4));
        assert_eq!(fixture.world.walls().len(), 14);
        assert!(!fixture.world.is_grid_blocked(TilePos::new(2, 2)));
    }

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3) + fixed_f(0.5), fixed_f(3.5));
        assert_eq!(Fixed::from_num(7), fixed(7));
    }
}
