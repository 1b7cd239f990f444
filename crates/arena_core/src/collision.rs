//! Collision resolution and anti-embedding recovery.
//!
//! Movement is resolved one axis at a time so that a tank pressed against a
//! wall still slides along it. A blocked axis snaps flush to the obstacle's
//! near edge plus a small gap instead of discarding the whole step.
//!
//! Embedding (a box overlapping a wall, the base, or the arena edge) should
//! never persist. Units check themselves at the start of each update, and
//! [`sweep`] runs periodically as a backstop: anything still embedded after
//! [`unstick`] fails is force-relocated.

use crate::components::{AiState, Unit, UnitId};
use crate::config::SimConfig;
use crate::events::{SimEvent, TickEvents};
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::pathfinding::TilePos;
use crate::world::World;

/// `cos`/`sin` of the eight spiral probe angles, 45 degrees apart.
const SPIRAL_ANGLES: [(f64, f64); 8] = [
    (1.0, 0.0),
    (0.707_106_78, 0.707_106_78),
    (0.0, 1.0),
    (-0.707_106_78, 0.707_106_78),
    (-1.0, 0.0),
    (-0.707_106_78, -0.707_106_78),
    (0.0, -1.0),
    (0.707_106_78, -0.707_106_78),
];

/// True when `rect` leaves the arena or overlaps a wall or the surviving base.
#[must_use]
pub fn is_embedded(world: &World, rect: &Rect) -> bool {
    !world.contains_rect(rect) || world.overlaps_static(rect)
}

/// [`is_embedded`], or overlapping a unit other than `exclude`.
#[must_use]
pub fn is_position_blocked(world: &World, rect: &Rect, exclude: UnitId) -> bool {
    is_embedded(world, rect) || !world.unit_colliders(rect, exclude).is_empty()
}

/// Resolve one axis of a move. Returns the new coordinate on that axis.
fn resolve_axis(
    world: &World,
    unit: &Unit,
    start: Rect,
    delta: Fixed,
    horizontal: bool,
    epsilon: Fixed,
) -> Fixed {
    let (origin, limit) = if horizontal {
        (start.x, world.width() - start.w)
    } else {
        (start.y, world.height() - start.h)
    };
    let target = (origin + delta).clamp(Fixed::ZERO, limit.max(Fixed::ZERO));
    let candidate = if horizontal {
        Rect::new(target, start.y, start.w, start.h)
    } else {
        Rect::new(start.x, target, start.w, start.h)
    };

    // Units the mover already overlaps are ignored so the two can separate.
    let mut blockers = world.static_colliders(&candidate);
    blockers.extend(
        world
            .unit_colliders(&candidate, unit.id)
            .into_iter()
            .filter(|r| !r.overlaps(&start)),
    );
    if blockers.is_empty() {
        return target;
    }

    let size = if horizontal { start.w } else { start.h };
    if delta > Fixed::ZERO {
        let near = blockers
            .iter()
            .map(|r| if horizontal { r.x } else { r.y })
            .min()
            .unwrap_or(target + size);
        (near - size - epsilon).max(origin)
    } else {
        let near = blockers
            .iter()
            .map(|r| if horizontal { r.right() } else { r.bottom() })
            .max()
            .unwrap_or(target);
        (near + epsilon).min(origin)
    }
}

/// Where a unit ends up after trying to move by `(dx, dy)`.
#[must_use]
pub fn resolve_move(world: &World, unit: &Unit, dx: Fixed, dy: Fixed, epsilon: Fixed) -> Vec2Fixed {
    let mut rect = unit.rect();
    if dx != Fixed::ZERO {
        rect.x = resolve_axis(world, unit, rect, dx, true, epsilon);
    }
    if dy != Fixed::ZERO {
        rect.y = resolve_axis(world, unit, rect, dy, false, epsilon);
    }
    rect.origin()
}

/// Move a detached unit. Returns `true` when it was displaced at all.
pub fn move_unit(world: &World, unit: &mut Unit, dx: Fixed, dy: Fixed, epsilon: Fixed) -> bool {
    let next = resolve_move(world, unit, dx, dy, epsilon);
    let moved = next != unit.pos;
    unit.pos = next;
    moved
}

/// Nearest free position for an embedded unit.
///
/// Returns the current position when the unit is not embedded. Otherwise
/// probes a spiral of growing radius around it, then a fixed list of
/// known-safe spots. `None` when every candidate is blocked.
#[must_use]
pub fn find_unstuck_position(world: &World, unit: &Unit, config: &SimConfig) -> Option<Vec2Fixed> {
    if !is_embedded(world, &unit.rect()) {
        return Some(unit.pos);
    }

    let free = |pos: Vec2Fixed| !is_position_blocked(world, &Rect::square(pos, unit.size), unit.id);

    let step = config.tank_speed();
    let max_radius = config.tile_size();
    if step > Fixed::ZERO {
        let mut radius = step;
        while radius <= max_radius {
            for &(cos, sin) in &SPIRAL_ANGLES {
                let pos = Vec2Fixed::new(
                    unit.pos.x + Fixed::from_num(cos) * radius,
                    unit.pos.y + Fixed::from_num(sin) * radius,
                );
                if free(pos) {
                    return Some(pos);
                }
            }
            radius += step;
        }
    }

    let t = config.tile_size();
    let (w, h) = (world.width(), world.height());
    let safe = [
        Vec2Fixed::new(t * 2, t * 2),
        Vec2Fixed::new(w - t * 3, t * 2),
        Vec2Fixed::new(t * 2, h - t * 3),
        Vec2Fixed::new(w - t * 3, h - t * 3),
        Vec2Fixed::new(w / 2, t * 2),
        Vec2Fixed::new(w / 2, h - t * 3),
    ];
    safe.into_iter().find(|&pos| free(pos))
}

/// Unstick a detached unit in place. Returns `false` if it is still embedded.
pub fn unstick(world: &World, unit: &mut Unit, config: &SimConfig) -> bool {
    match find_unstuck_position(world, unit, config) {
        Some(pos) => {
            if pos != unit.pos {
                tracing::debug!(unit = unit.id, x = ?pos.x, y = ?pos.y, "Unstuck unit");
            }
            unit.pos = pos;
            true
        }
        None => {
            tracing::warn!(unit = unit.id, x = ?unit.pos.x, y = ?unit.pos.y, "Failed to unstick unit");
            false
        }
    }
}

/// Last-resort placement that ignores how far the unit has to jump.
///
/// Tries a handful of fixed spots, then scans every tile for a centred
/// placement, preferring spots no other unit occupies. Only walls, the base
/// and the arena edge disqualify a spot.
#[must_use]
pub fn find_relocation(world: &World, unit: &Unit, config: &SimConfig) -> Option<Vec2Fixed> {
    let t = config.tile_size();
    let (w, h) = (world.width(), world.height());
    let embedded = |pos: Vec2Fixed| is_embedded(world, &Rect::square(pos, unit.size));

    let fixed_spots = [
        Vec2Fixed::new(t * 2, t * 2),
        Vec2Fixed::new(w - t * 3, t * 2),
        Vec2Fixed::new(t * 2, t * 4),
        Vec2Fixed::new(w - t * 3, t * 4),
        Vec2Fixed::new(w / 2, t * 2),
    ];
    if let Some(pos) = fixed_spots.into_iter().find(|&pos| !embedded(pos)) {
        return Some(pos);
    }

    let grid = world.grid();
    let inset = (t - unit.size) / 2;
    let mut fallback = None;
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let origin = TilePos::new(x, y).origin(t);
            let pos = Vec2Fixed::new(origin.x + inset, origin.y + inset);
            if embedded(pos) {
                continue;
            }
            if world
                .unit_colliders(&Rect::square(pos, unit.size), unit.id)
                .is_empty()
            {
                return Some(pos);
            }
            fallback.get_or_insert(pos);
        }
    }
    fallback
}

/// Force a unit to a safe spot and reset its decision state.
pub fn force_relocate(world: &World, unit: &mut Unit, config: &SimConfig) -> bool {
    let Some(pos) = find_relocation(world, unit, config) else {
        tracing::error!(unit = unit.id, "No safe position found for relocation");
        return false;
    };
    tracing::warn!(unit = unit.id, x = ?pos.x, y = ?pos.y, "Force-relocated unit");
    unit.pos = pos;
    if let Some(brain) = unit.brain_mut() {
        brain.state = AiState::Seeking;
        brain.stuck_ticks = 0;
    }
    true
}

/// Unstick, falling back to relocation. Emits [`SimEvent::UnitRelocated`]
/// when the fallback was needed.
pub fn recover(world: &World, unit: &mut Unit, config: &SimConfig, events: &mut TickEvents) {
    if unstick(world, unit, config) {
        return;
    }
    if force_relocate(world, unit, config) {
        events.push(SimEvent::UnitRelocated { unit: unit.id });
    }
}

/// Periodic anti-embedding pass over every live unit.
pub fn sweep(world: &mut World, config: &SimConfig, events: &mut TickEvents) {
    if let Some(mut player) = world.player.take() {
        if is_embedded(world, &player.rect()) {
            tracing::warn!(unit = player.id, "Sweep found embedded player");
            recover(world, &mut player, config, events);
        }
        world.player = Some(player);
    }

    for i in 0..world.enemies.len() {
        if !is_embedded(world, &world.enemies[i].rect()) {
            continue;
        }
        let mut enemy = world.enemies.remove(i);
        tracing::warn!(unit = enemy.id, "Sweep found embedded enemy");
        recover(world, &mut enemy, config, events);
        world.enemies.insert(i, enemy);
    }

    #[cfg(feature = "debug-validation")]
    for unit in world.units() {
        if is_embedded(world, &unit.rect()) {
            tracing::error!(unit = unit.id, "Unit still embedded after sweep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Direction, PlayerState, UnitKind, WallKind};
    use crate::timer::Countdown;

    fn tank(id: UnitId, x: i32, y: i32) -> Unit {
        Unit {
            id,
            kind: UnitKind::Player(PlayerState::default()),
            pos: Vec2Fixed::from_ints(x, y),
            size: Fixed::from_num(36),
            facing: Direction::Up,
            health: 1,
            max_health: 1,
            base_speed: Fixed::from_num(2.5),
            speed: Fixed::from_num(2.5),
            fire_cooldown: Countdown::ZERO,
        }
    }

    fn eps() -> Fixed {
        SimConfig::default().epsilon()
    }

    #[test]
    fn test_free_move_displaces() {
        let world = World::new(&SimConfig::default());
        let mut unit = tank(1, 100, 100);
        assert!(move_unit(&world, &mut unit, Fixed::from_num(3), Fixed::ZERO, eps()));
        assert_eq!(unit.pos, Vec2Fixed::from_ints(103, 100));
    }

    #[test]
    fn test_move_snaps_flush_to_wall() {
        let mut world = World::new(&SimConfig::default());
        world.set_wall(TilePos::new(2, 0), WallKind::Indestructible);
        let mut unit = tank(1, 42, 0);

        assert!(move_unit(&world, &mut unit, Fixed::from_num(5), Fixed::ZERO, eps()));
        assert_eq!(unit.pos.x, Fixed::from_num(80) - Fixed::from_num(36) - eps());
        assert!(!is_embedded(&world, &unit.rect()));

        // Already flush: no further displacement.
        assert!(!move_unit(&world, &mut unit, Fixed::from_num(5), Fixed::ZERO, eps()));
    }

    #[test]
    fn test_axis_separation_slides_along_wall() {
        let mut world = World::new(&SimConfig::default());
        world.set_wall(TilePos::new(2, 1), WallKind::Indestructible);
        let mut unit = tank(1, 42, 42);

        assert!(move_unit(&world, &mut unit, Fixed::from_num(5), Fixed::from_num(3), eps()));
        assert!(unit.pos.x < Fixed::from_num(44));
        assert_eq!(unit.pos.y, Fixed::from_num(45));
    }

    #[test]
    fn test_move_clamps_to_bounds() {
        let world = World::new(&SimConfig::default());
        let mut unit = tank(1, 1, 1);
        move_unit(&world, &mut unit, Fixed::from_num(-5), Fixed::from_num(-5), eps());
        assert_eq!(unit.pos, Vec2Fixed::ZERO);
        assert!(!move_unit(&world, &mut unit, Fixed::from_num(-5), Fixed::ZERO, eps()));
    }

    #[test]
    fn test_move_is_blocked_by_other_units() {
        let mut world = World::new(&SimConfig::default());
        world.enemies.push(tank(2, 140, 100));
        let mut unit = tank(1, 100, 100);

        move_unit(&world, &mut unit, Fixed::from_num(6), Fixed::ZERO, eps());
        assert_eq!(unit.pos.x, Fixed::from_num(104) - eps());
    }

    #[test]
    fn test_unstick_leaves_free_unit_alone() {
        let world = World::new(&SimConfig::default());
        let mut unit = tank(1, 100, 100);
        assert!(unstick(&world, &mut unit, &SimConfig::default()));
        assert_eq!(unit.pos, Vec2Fixed::from_ints(100, 100));
    }

    #[test]
    fn test_unstick_frees_embedded_unit() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        world.set_wall(TilePos::new(3, 3), WallKind::Indestructible);
        let mut unit = tank(1, 150, 150);
        assert!(is_embedded(&world, &unit.rect()));

        assert!(unstick(&world, &mut unit, &config));
        assert!(!is_embedded(&world, &unit.rect()));
    }

    #[test]
    fn test_unstick_out_of_bounds_unit() {
        let config = SimConfig::default();
        let world = World::new(&config);
        let mut unit = tank(1, -1, 100);
        assert!(unstick(&world, &mut unit, &config));
        assert!(world.contains_rect(&unit.rect()));
    }

    #[test]
    fn test_sweep_frees_deeply_buried_enemy() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        for y in 0..6 {
            for x in 0..6 {
                world.set_wall(TilePos::new(x, y), WallKind::Indestructible);
            }
        }
        let mut enemy = tank(7, 100, 100);
        enemy.kind = UnitKind::Enemy {
            archetype: crate::components::ArchetypeKind::Normal,
            brain: crate::components::EnemyBrain::new(
                crate::components::Personality::Defensive,
                0,
                crate::components::FlankSide::Near,
            ),
        };
        world.enemies.push(enemy);

        let mut events = TickEvents::default();
        sweep(&mut world, &config, &mut events);

        assert!(!is_embedded(&world, &world.enemies[0].rect()));
        assert_eq!(
            world.enemies[0].brain().map(|b| b.state),
            Some(AiState::Seeking)
        );
    }
}
