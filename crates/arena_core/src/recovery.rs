//! Local-recovery heuristics for enemies that cannot make progress.
//!
//! These are cheap, bounded probes used when direct pursuit or A* fails:
//! an enclosure test, a search for a nearby open tile to escape to, a
//! right-hand wall-follow rule, and a most-open-direction look-ahead.

use rand::Rng;

use crate::collision::is_position_blocked;
use crate::components::{Direction, Unit};
use crate::config::SimConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding::TilePos;
use crate::world::World;

/// Probe order for the most-open search.
const OPENNESS_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

fn step(direction: Direction, distance: Fixed) -> (Fixed, Fixed) {
    let (dx, dy) = direction.delta();
    (distance * i64::from(dx), distance * i64::from(dy))
}

/// True when at least three of the four cardinal rays from the unit's
/// centre hit a blocked tile within the probe radius.
///
/// Rays are sampled every half tile against the occupancy grid; leaving
/// the arena counts as blocked.
#[must_use]
pub fn is_trapped_in_enclosure(world: &World, unit: &Unit, config: &SimConfig) -> bool {
    let center = unit.center();
    let half = config.tile_size() / 2;
    let samples = config.ai.enclosure_probe_tiles * 2;

    let blocked = Direction::CLOCKWISE
        .iter()
        .filter(|&&dir| {
            (1..=samples).any(|i| {
                let (dx, dy) = step(dir, half * i64::from(i));
                world.is_point_blocked(Vec2Fixed::new(center.x + dx, center.y + dy))
            })
        })
        .count();

    blocked >= 3
}

/// Nearest open tile centre worth escaping to.
///
/// Candidates lie within the search radius of the unit's tile, further than
/// the minimum distance from its centre, and are open together with all
/// four neighbours. Ties go to the first tile in row-major order.
#[must_use]
pub fn find_escape_target(world: &World, unit: &Unit, config: &SimConfig) -> Option<Vec2Fixed> {
    let tile_size = config.tile_size();
    let center = unit.center();
    let origin = world.tile_at(center);
    let radius = config.ai.escape_search_tiles as i32;
    let min_dist = config.tiles(config.ai.escape_min_tiles);
    let min_dist_sq = min_dist * min_dist;

    let mut best: Option<(Fixed, Vec2Fixed)> = None;
    for y in (origin.y - radius)..=(origin.y + radius) {
        for x in (origin.x - radius)..=(origin.x + radius) {
            let tile = TilePos::new(x, y);
            let open = !world.is_grid_blocked(tile)
                && [(1, 0), (-1, 0), (0, 1), (0, -1)]
                    .iter()
                    .all(|&(dx, dy)| !world.is_grid_blocked(tile.offset(dx, dy)));
            if !open {
                continue;
            }
            let candidate = tile.center(tile_size);
            let dist_sq = candidate.distance_squared(center);
            if dist_sq <= min_dist_sq {
                continue;
            }
            if best.map_or(true, |(d, _)| dist_sq < d) {
                best = Some((dist_sq, candidate));
            }
        }
    }

    best.map(|(_, target)| target)
}

/// True when one speed step in `direction` lands on a free position.
#[must_use]
pub fn can_move_in_direction(world: &World, unit: &Unit, direction: Direction) -> bool {
    let (dx, dy) = step(direction, unit.speed);
    !is_position_blocked(world, &unit.rect().translated(dx, dy), unit.id)
}

/// Right-hand rule: the first free direction turning clockwise from the
/// current facing, ending with the facing itself.
#[must_use]
pub fn wall_follow_direction(world: &World, unit: &Unit) -> Option<Direction> {
    (1..=4)
        .map(|turns| unit.facing.rotated(turns))
        .find(|&dir| can_move_in_direction(world, unit, dir))
}

/// Number of consecutive whole-tile steps in `direction` that stay free.
#[must_use]
pub fn openness(world: &World, unit: &Unit, direction: Direction, lookahead: u32) -> u32 {
    let tile = world.tile_size();
    let rect = unit.rect();
    (1..=lookahead)
        .take_while(|&i| {
            let (dx, dy) = step(direction, tile * i64::from(i));
            !is_position_blocked(world, &rect.translated(dx, dy), unit.id)
        })
        .count() as u32
}

/// The movable direction with the longest free look-ahead.
///
/// Strictly longer wins, so ties keep the earlier of up, down, left, right.
#[must_use]
pub fn most_open_direction(world: &World, unit: &Unit, config: &SimConfig) -> Option<Direction> {
    let lookahead = config.ai.openness_lookahead_tiles;
    let mut best: Option<(u32, Direction)> = None;
    for dir in OPENNESS_ORDER {
        if !can_move_in_direction(world, unit, dir) {
            continue;
        }
        let score = openness(world, unit, dir, lookahead);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, dir));
        }
    }
    best.map(|(_, dir)| dir)
}

/// Uniform choice among the three directions other than the current facing.
pub fn random_non_reverse<R: Rng>(rng: &mut R, facing: Direction) -> Direction {
    let options: Vec<Direction> = Direction::CLOCKWISE
        .into_iter()
        .filter(|&d| d != facing)
        .collect();
    options[rng.gen_range(0..options.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{PlayerState, UnitKind, WallKind};
    use crate::timer::Countdown;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn unit_at_tile(x: i32, y: i32) -> Unit {
        Unit {
            id: 1,
            kind: UnitKind::Player(PlayerState::default()),
            pos: Vec2Fixed::from_ints(x * 40 + 2, y * 40 + 2),
            size: Fixed::from_num(36),
            facing: Direction::Up,
            health: 1,
            max_health: 1,
            base_speed: Fixed::from_num(2.5),
            speed: Fixed::from_num(2.5),
            fire_cooldown: Countdown::ZERO,
        }
    }

    /// Pocket at (5, 5): steel left, right and above, one open tile below,
    /// then steel.
    fn pocket_world(config: &SimConfig) -> World {
        let mut world = World::new(config);
        for tile in [
            TilePos::new(4, 5),
            TilePos::new(6, 5),
            TilePos::new(5, 4),
            TilePos::new(4, 6),
            TilePos::new(6, 6),
            TilePos::new(5, 7),
        ] {
            world.set_wall(tile, WallKind::Indestructible);
        }
        world
    }

    #[test]
    fn test_open_field_is_not_an_enclosure() {
        let config = SimConfig::default();
        let world = World::new(&config);
        assert!(!is_trapped_in_enclosure(&world, &unit_at_tile(10, 7), &config));
    }

    #[test]
    fn test_pocket_is_an_enclosure() {
        let config = SimConfig::default();
        let world = pocket_world(&config);
        assert!(is_trapped_in_enclosure(&world, &unit_at_tile(5, 5), &config));
    }

    #[test]
    fn test_escape_target_lies_outside_pocket() {
        let config = SimConfig::default();
        let world = pocket_world(&config);
        let unit = unit_at_tile(5, 5);

        let target = find_escape_target(&world, &unit, &config).unwrap();
        let tile = world.tile_at(target);
        assert_ne!(tile, TilePos::new(5, 5));
        assert_ne!(tile, TilePos::new(5, 6));
        assert!(target.distance(unit.center()) > config.tiles(2.0));
        assert!(!world.is_grid_blocked(tile));
    }

    #[test]
    fn test_wall_follow_turns_clockwise() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        // Wall directly to the right of the unit.
        world.set_wall(TilePos::new(6, 5), WallKind::Indestructible);
        let mut unit = unit_at_tile(5, 5);
        unit.pos.x = Fixed::from_num(240 - 36);

        unit.facing = Direction::Up;
        assert_eq!(wall_follow_direction(&world, &unit), Some(Direction::Down));
        unit.facing = Direction::Left;
        assert_eq!(wall_follow_direction(&world, &unit), Some(Direction::Up));
    }

    #[test]
    fn test_most_open_prefers_longest_run() {
        let config = SimConfig::default();
        // Unit in the top-left corner: up and left are blocked by the edge,
        // down has 14 rows of room but look-ahead caps it, right likewise.
        let world = World::new(&config);
        let unit = unit_at_tile(0, 0);
        assert_eq!(most_open_direction(&world, &unit, &config), Some(Direction::Down));

        let mut walled = World::new(&config);
        walled.set_wall(TilePos::new(0, 2), WallKind::Indestructible);
        assert_eq!(most_open_direction(&walled, &unit, &config), Some(Direction::Right));
    }

    #[test]
    fn test_random_non_reverse_never_repeats_facing() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_ne!(random_non_reverse(&mut rng, Direction::Left), Direction::Left);
        }
    }
}
