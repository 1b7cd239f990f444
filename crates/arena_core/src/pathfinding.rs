//! Occupancy grid and A* pathfinding.
//!
//! The grid is a per-tile blocked map derived from walls and the base. It
//! must be rebuilt after any terrain mutation before the next search;
//! [`crate::world::World`] does this whenever a wall or the base changes.
//!
//! # Tie-breaking
//!
//! Among open nodes with equal `f = g + h`, the node pushed first is
//! expanded first (FIFO via a monotonically increasing sequence number).
//! Neighbours are generated in the fixed order +x, -x, +y, -y.
//!
//! The goal tile is exempt from the blocked check, so a search may end on a
//! blocked goal such as the base. Callers that need an open goal test it
//! first.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::components::WallKind;
use crate::math::{Fixed, Vec2Fixed};

/// Tile coordinate. May lie outside the arena; lookups treat that as blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Row. Declared first so ordering is row-major.
    pub y: i32,
    /// Column.
    pub x: i32,
}

impl TilePos {
    /// Create a tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }

    /// Tile containing a world point: `floor(p / tile_size)`.
    #[must_use]
    pub fn containing(point: Vec2Fixed, tile_size: Fixed) -> Self {
        Self::new(
            (point.x / tile_size).floor().to_num::<i32>(),
            (point.y / tile_size).floor().to_num::<i32>(),
        )
    }

    /// Neighbour offset by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance in tiles.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Top-left corner in world units.
    #[must_use]
    pub fn origin(self, tile_size: Fixed) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(self.x) * tile_size,
            Fixed::from_num(self.y) * tile_size,
        )
    }

    /// Centre in world units.
    #[must_use]
    pub fn center(self, tile_size: Fixed) -> Vec2Fixed {
        let half = tile_size / 2;
        let o = self.origin(tile_size);
        Vec2Fixed::new(o.x + half, o.y + half)
    }
}

/// Per-tile blocked map used for pathing and AI decisions.
///
/// Decorative cover never appears here. The base tile is tracked separately
/// so that destroying the base only needs a flag flip plus a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    /// Row-major wall occupancy.
    cells: Vec<bool>,
    /// Surviving base tile, if any.
    base_tile: Option<TilePos>,
}

impl OccupancyGrid {
    /// Create an all-open grid.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; (width as usize) * (height as usize)],
            base_tile: None,
        }
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a tile lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, tile: TilePos) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        self.in_bounds(tile)
            .then(|| (tile.y as usize) * (self.width as usize) + (tile.x as usize))
    }

    /// Re-derive every cell from the current walls and base.
    pub fn rebuild(&mut self, walls: &BTreeMap<TilePos, WallKind>, base_tile: Option<TilePos>) {
        self.cells.iter_mut().for_each(|c| *c = false);
        for tile in walls.keys() {
            if let Some(i) = self.index(*tile) {
                self.cells[i] = true;
            }
        }
        self.base_tile = base_tile;
    }

    /// Out of bounds, wall-occupied, or the surviving base tile.
    #[must_use]
    pub fn is_blocked(&self, tile: TilePos) -> bool {
        match self.index(tile) {
            None => true,
            Some(i) => self.cells[i] || self.base_tile == Some(tile),
        }
    }

    /// Number of blocked in-bounds tiles.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        let base = usize::from(self.base_tile.is_some_and(|t| self.in_bounds(t)));
        self.cells.iter().filter(|c| **c).count() + base
    }
}

/// Neighbour offsets in expansion order.
const NEIGHBOURS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    tile: TilePos,
    f_score: u32,
    /// Push order; lower is expanded first among equal `f`.
    sequence: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys for min-first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a 4-connected path from `start` to `goal`.
///
/// Returns the tile sequence from start to goal inclusive, or `None` when the
/// goal is out of bounds, unreachable, or not reached before more than
/// `max_expansions` nodes have been closed. The goal tile itself is exempt
/// from blocking so that a unit can path onto the base. The start tile is
/// never checked: a unit straddling a wall edge still gets a route.
#[must_use]
pub fn find_path(
    grid: &OccupancyGrid,
    start: TilePos,
    goal: TilePos,
    max_expansions: usize,
) -> Option<Vec<TilePos>> {
    if !grid.in_bounds(goal) || !grid.in_bounds(start) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut g_score: HashMap<TilePos, u32> = HashMap::new();
    let mut closed: HashSet<TilePos> = HashSet::new();
    let mut sequence = 0u64;

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        tile: start,
        f_score: start.manhattan(goal),
        sequence,
    });

    while let Some(current) = open_set.pop() {
        if current.tile == goal {
            return Some(reconstruct_path(&came_from, goal));
        }
        // Stale heap entry from a later improvement.
        if !closed.insert(current.tile) {
            continue;
        }
        if closed.len() > max_expansions {
            tracing::trace!(
                start = ?start,
                goal = ?goal,
                expanded = closed.len(),
                "A* expansion budget exhausted"
            );
            return None;
        }

        let current_g = g_score.get(&current.tile).copied().unwrap_or(u32::MAX);

        for &(dx, dy) in &NEIGHBOURS {
            let next = current.tile.offset(dx, dy);
            if closed.contains(&next) {
                continue;
            }
            if next != goal && grid.is_blocked(next) {
                continue;
            }
            if !grid.in_bounds(next) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            if tentative_g < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                came_from.insert(next, current.tile);
                g_score.insert(next, tentative_g);
                sequence += 1;
                open_set.push(AStarNode {
                    tile: next,
                    f_score: tentative_g + next.manhattan(goal),
                    sequence,
                });
            }
        }
    }

    None
}

/// Reconstruct path from the `came_from` map.
fn reconstruct_path(came_from: &HashMap<TilePos, TilePos>, goal: TilePos) -> Vec<TilePos> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}
