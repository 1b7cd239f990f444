//! The live simulation aggregate.
//!
//! [`World`] owns every collection a tick touches: terrain, units,
//! projectiles and pickups, plus score and lives. Subsystems receive it by
//! reference; nothing outlives a level load.
//!
//! Terrain is private so that every mutation goes through a method that
//! rebuilds the [`OccupancyGrid`] before anything can path against it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{Base, Pickup, Projectile, Unit, UnitId, WallKind};
use crate::config::SimConfig;
use crate::events::GameOverCause;
use crate::level::DecodedLevel;
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::pathfinding::{OccupancyGrid, TilePos};

/// Whether the current level is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimStatus {
    /// Ticks advance the world.
    #[default]
    Playing,
    /// Every enemy is gone; waiting for the next level.
    LevelClear,
    /// The game ended in failure.
    GameOver(GameOverCause),
}

/// All live state for one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct World {
    #[serde(with = "crate::math::fixed_serde")]
    tile_size: Fixed,
    #[serde(with = "crate::math::fixed_serde")]
    width: Fixed,
    #[serde(with = "crate::math::fixed_serde")]
    height: Fixed,
    walls: BTreeMap<TilePos, WallKind>,
    cover: BTreeSet<TilePos>,
    base: Option<Base>,
    grid: OccupancyGrid,
    /// The player tank, absent while it is being updated.
    pub player: Option<Unit>,
    /// Enemy tanks in update order.
    pub enemies: Vec<Unit>,
    /// Projectiles in flight.
    pub projectiles: Vec<Projectile>,
    /// Pickups on the ground.
    pub pickups: Vec<Pickup>,
    /// Accumulated score.
    pub score: u64,
    /// Lives remaining.
    pub lives: u32,
    /// Level index.
    pub level: u32,
    /// Running state.
    pub status: SimStatus,
    /// Where the player (re)spawns.
    pub player_spawn: Vec2Fixed,
    next_id: UnitId,
}

impl World {
    /// Empty arena sized from `config`.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            tile_size: config.tile_size(),
            width: config.world_width(),
            height: config.world_height(),
            walls: BTreeMap::new(),
            cover: BTreeSet::new(),
            base: None,
            grid: OccupancyGrid::new(config.arena.width_tiles, config.arena.height_tiles),
            player: None,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            score: 0,
            lives: config.player.starting_lives,
            level: 0,
            status: SimStatus::Playing,
            player_spawn: config.player_spawn(),
            next_id: 1,
        }
    }

    /// Arena with decoded terrain.
    #[must_use]
    pub fn from_level(decoded: DecodedLevel, config: &SimConfig) -> Self {
        let mut world = Self::new(config);
        world.walls = decoded.walls;
        world.cover = decoded.cover;
        world.base = decoded.base.map(|tile| Base {
            tile,
            destroyed: false,
        });
        world.rebuild_grid();
        world
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Tile side in world units.
    #[must_use]
    pub const fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    /// Arena width in world units.
    #[must_use]
    pub const fn width(&self) -> Fixed {
        self.width
    }

    /// Arena height in world units.
    #[must_use]
    pub const fn height(&self) -> Fixed {
        self.height
    }

    /// True when `rect` lies entirely inside the arena.
    #[must_use]
    pub fn contains_rect(&self, rect: &Rect) -> bool {
        rect.x >= Fixed::ZERO
            && rect.y >= Fixed::ZERO
            && rect.right() <= self.width
            && rect.bottom() <= self.height
    }

    /// Tile containing a world point.
    #[must_use]
    pub fn tile_at(&self, point: Vec2Fixed) -> TilePos {
        TilePos::containing(point, self.tile_size)
    }

    /// Box covered by a tile.
    #[must_use]
    pub fn tile_rect(&self, tile: TilePos) -> Rect {
        Rect::square(tile.origin(self.tile_size), self.tile_size)
    }

    /// Tiles that `rect` could overlap, row-major.
    fn tiles_touching(&self, rect: &Rect) -> impl Iterator<Item = TilePos> {
        let min = self.tile_at(rect.origin());
        let max = self.tile_at(Vec2Fixed::new(rect.right(), rect.bottom()));
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| TilePos::new(x, y)))
    }

    // ------------------------------------------------------------------
    // Terrain
    // ------------------------------------------------------------------

    /// All walls.
    #[must_use]
    pub const fn walls(&self) -> &BTreeMap<TilePos, WallKind> {
        &self.walls
    }

    /// Decorative cover tiles.
    #[must_use]
    pub const fn cover(&self) -> &BTreeSet<TilePos> {
        &self.cover
    }

    /// The base, destroyed or not.
    #[must_use]
    pub const fn base(&self) -> Option<&Base> {
        self.base.as_ref()
    }

    /// The base tile while the base stands.
    #[must_use]
    pub fn surviving_base(&self) -> Option<TilePos> {
        self.base.filter(|b| !b.destroyed).map(|b| b.tile)
    }

    /// Box of the surviving base.
    #[must_use]
    pub fn base_rect(&self) -> Option<Rect> {
        self.surviving_base().map(|tile| self.tile_rect(tile))
    }

    /// The pathing grid.
    #[must_use]
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Grid lookup: out of bounds, wall, or surviving base.
    #[must_use]
    pub fn is_grid_blocked(&self, tile: TilePos) -> bool {
        self.grid.is_blocked(tile)
    }

    /// Grid lookup for the tile containing a point.
    #[must_use]
    pub fn is_point_blocked(&self, point: Vec2Fixed) -> bool {
        self.grid.is_blocked(self.tile_at(point))
    }

    fn rebuild_grid(&mut self) {
        self.grid.rebuild(&self.walls, self.surviving_base());
    }

    /// Place or replace a wall.
    pub fn set_wall(&mut self, tile: TilePos, kind: WallKind) {
        self.walls.insert(tile, kind);
        self.cover.remove(&tile);
        self.rebuild_grid();
    }

    /// Remove a wall. The tile is pathable as soon as this returns.
    pub fn remove_wall(&mut self, tile: TilePos) -> Option<WallKind> {
        let removed = self.walls.remove(&tile);
        if removed.is_some() {
            self.rebuild_grid();
        }
        removed
    }

    /// Mark a tile as decorative cover.
    pub fn add_cover(&mut self, tile: TilePos) {
        self.cover.insert(tile);
    }

    /// Place a fresh base.
    pub fn set_base(&mut self, tile: TilePos) {
        self.base = Some(Base {
            tile,
            destroyed: false,
        });
        self.rebuild_grid();
    }

    /// Flag the base destroyed. Returns `false` if it was already gone.
    pub fn destroy_base(&mut self) -> bool {
        match self.base.as_mut() {
            Some(base) if !base.destroyed => {
                base.destroyed = true;
                self.rebuild_grid();
                true
            }
            _ => false,
        }
    }

    /// Boxes of walls and the surviving base that overlap `rect`.
    #[must_use]
    pub fn static_colliders(&self, rect: &Rect) -> Vec<Rect> {
        let mut hits: Vec<Rect> = self
            .tiles_touching(rect)
            .filter(|tile| self.walls.contains_key(tile))
            .map(|tile| self.tile_rect(tile))
            .filter(|wall| wall.overlaps(rect))
            .collect();
        if let Some(base) = self.base_rect().filter(|b| b.overlaps(rect)) {
            hits.push(base);
        }
        hits
    }

    /// Wall tiles overlapping `rect`, row-major.
    #[must_use]
    pub fn walls_overlapping(&self, rect: &Rect) -> Vec<(TilePos, WallKind)> {
        self.tiles_touching(rect)
            .filter_map(|tile| self.walls.get(&tile).map(|kind| (tile, *kind)))
            .filter(|(tile, _)| self.tile_rect(*tile).overlaps(rect))
            .collect()
    }

    /// True when `rect` overlaps a wall or the surviving base.
    #[must_use]
    pub fn overlaps_static(&self, rect: &Rect) -> bool {
        !self.static_colliders(rect).is_empty()
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Player then enemies.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.player.iter().chain(self.enemies.iter())
    }

    /// Look up any unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units().find(|u| u.id == id)
    }

    /// Boxes of units other than `exclude` that overlap `rect`.
    #[must_use]
    pub fn unit_colliders(&self, rect: &Rect, exclude: UnitId) -> Vec<Rect> {
        self.units()
            .filter(|u| u.id != exclude)
            .map(Unit::rect)
            .filter(|r| r.overlaps(rect))
            .collect()
    }

    /// Enemy index by id.
    #[must_use]
    pub fn enemy_index(&self, id: UnitId) -> Option<usize> {
        self.enemies.iter().position(|e| e.id == id)
    }

    /// Fresh id for a unit or projectile.
    pub fn alloc_id(&mut self) -> UnitId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Score hook.
    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(u64::from(points));
    }

    /// True while ticks should advance the world.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status == SimStatus::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(&SimConfig::default())
    }

    #[test]
    fn test_wall_mutation_rebuilds_grid() {
        let mut world = world();
        let tile = TilePos::new(3, 3);
        world.set_wall(tile, WallKind::Destructible);
        assert!(world.is_grid_blocked(tile));

        assert_eq!(world.remove_wall(tile), Some(WallKind::Destructible));
        assert!(!world.is_grid_blocked(tile));
        assert_eq!(world.remove_wall(tile), None);
    }

    #[test]
    fn test_destroyed_base_unblocks_tile() {
        let mut world = world();
        let tile = TilePos::new(9, 14);
        world.set_base(tile);
        assert!(world.is_grid_blocked(tile));
        assert!(world.base_rect().is_some());

        assert!(world.destroy_base());
        assert!(!world.destroy_base());
        assert!(!world.is_grid_blocked(tile));
        assert!(world.base_rect().is_none());
    }

    #[test]
    fn test_static_colliders_respect_strict_overlap() {
        let mut world = world();
        world.set_wall(TilePos::new(1, 0), WallKind::Indestructible);

        let touching = Rect::new(
            Fixed::ZERO,
            Fixed::ZERO,
            Fixed::from_num(40),
            Fixed::from_num(40),
        );
        assert!(!world.overlaps_static(&touching));

        let crossing = touching.translated(Fixed::ONE, Fixed::ZERO);
        assert_eq!(world.static_colliders(&crossing).len(), 1);
        assert_eq!(
            world.walls_overlapping(&crossing),
            vec![(TilePos::new(1, 0), WallKind::Indestructible)]
        );
    }

    #[test]
    fn test_contains_rect() {
        let world = world();
        let size = Fixed::from_num(36);
        assert!(world.contains_rect(&Rect::square(Vec2Fixed::from_ints(764, 564), size)));
        assert!(!world.contains_rect(&Rect::square(Vec2Fixed::from_ints(765, 0), size)));
        assert!(!world.contains_rect(&Rect::square(Vec2Fixed::from_ints(0, -1), size)));
    }

    #[test]
    fn test_score_saturates() {
        let mut world = world();
        world.score = u64::MAX - 1;
        world.add_score(10);
        assert_eq!(world.score, u64::MAX);
    }
}
