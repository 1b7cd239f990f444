//! Enemy decision making.
//!
//! Every enemy runs one step of its behaviour state machine per tick, in
//! list order. Before the state handler runs, the per-tick overrides apply:
//!
//! 1. speed is rescaled for the current level
//! 2. an embedded unit is unstuck or relocated
//! 3. low health forces [`AiState::Retreating`]
//! 4. a periodic coordination check may pull nearby seeking allies into
//!    [`AiState::CoordinatedAttack`]
//!
//! After the handler, the unit fires if its target is lined up and visible.
//!
//! Steering toward a target tries the straight line first, then the next A*
//! step, then the local-recovery heuristics in [`crate::recovery`].

use rand::Rng;

use crate::collision::{is_embedded, move_unit, recover};
use crate::combat::fire_projectile;
use crate::components::{AiState, Direction, EnemyBrain, Personality, TargetRef, TeamRole, Unit};
use crate::config::SimConfig;
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::pathfinding::find_path;
use crate::recovery::{
    find_escape_target, is_trapped_in_enclosure, most_open_direction, random_non_reverse,
    wall_follow_direction,
};
use crate::simulation::TickContext;
use crate::timer::Countdown;
use crate::world::World;

/// Advance one detached enemy by a tick.
pub(crate) fn update_enemy(ctx: &mut TickContext<'_>, unit: &mut Unit) {
    unit.fire_cooldown.tick(ctx.scale);
    apply_difficulty(ctx.config, ctx.world.level, unit);

    if is_embedded(ctx.world, &unit.rect()) {
        tracing::warn!(unit = unit.id, x = ?unit.pos.x, y = ?unit.pos.y, "Enemy embedded");
        recover(ctx.world, unit, ctx.config, ctx.events);
    }

    let Some(mut brain) = unit.brain().cloned() else {
        return;
    };
    let before = brain.state;

    check_retreat(ctx.config, unit, &mut brain);
    coordinate(ctx, unit, &mut brain);

    match brain.state {
        AiState::Seeking => seek(ctx, unit, &mut brain),
        AiState::Maneuvering { .. } => maneuver(ctx, unit, &mut brain),
        AiState::Retreating { .. } => retreat(ctx, unit, &mut brain),
        AiState::Ambushing { .. } => ambush(ctx, unit, &mut brain),
        AiState::Flanking { .. } => flank(ctx, unit, &mut brain),
        AiState::CoordinatedAttack { .. } => coordinated_attack(ctx, unit, &mut brain),
        AiState::Escaping { .. } => escape(ctx, unit, &mut brain),
    }

    let retreating = matches!(brain.state, AiState::Retreating { .. });
    if !retreating && can_see_target(ctx.world, unit, brain.target) {
        let eager = brain.personality == Personality::Aggressive;
        if eager || ctx.rng.gen::<f32>() < ctx.config.ai.fire_probability {
            try_fire(ctx, unit);
        }
    }

    if brain.personality == Personality::Aggressive && brain.state == AiState::Seeking {
        pursue(ctx.world, ctx.config, unit);
    }

    if std::mem::discriminant(&before) != std::mem::discriminant(&brain.state) {
        tracing::debug!(
            unit = unit.id,
            from = before.label(),
            to = brain.state.label(),
            "Enemy state change"
        );
    }

    if let Some(slot) = unit.brain_mut() {
        *slot = brain;
    }
}

/// Recompute speed from the base speed and the level index.
fn apply_difficulty(config: &SimConfig, level: u32, unit: &mut Unit) {
    let factor = Fixed::from_num(1.0 + config.ai.difficulty_step * level as f32);
    let ceiling = config.tank_speed() * Fixed::from_num(config.ai.max_speed_factor);
    unit.speed = (unit.base_speed * factor).min(ceiling);
}

fn check_retreat(config: &SimConfig, unit: &Unit, brain: &mut EnemyBrain) {
    if matches!(brain.state, AiState::Retreating { .. }) {
        return;
    }
    let ratio = unit.health as f32 / unit.max_health.max(1) as f32;
    if ratio < config.ai.retreat_health_ratio {
        brain.state = AiState::Retreating {
            timer: Countdown::from_ticks(config.ai.retreat_ticks),
        };
    }
}

/// Indices of enemies whose centre lies within the coordination radius.
///
/// The unit being updated is detached from the list, so it never counts
/// itself.
fn nearby_allies(world: &World, config: &SimConfig, unit: &Unit) -> Vec<usize> {
    let radius = config.tiles(config.ai.coordination_radius_tiles);
    let radius_sq = radius * radius;
    let center = unit.center();
    world
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.center().distance_squared(center) < radius_sq)
        .map(|(i, _)| i)
        .collect()
}

fn coordinate(ctx: &mut TickContext<'_>, unit: &Unit, brain: &mut EnemyBrain) {
    let ai = &ctx.config.ai;
    brain.coordination_timer.tick(ctx.scale);
    if brain.coordination_timer.is_active() {
        return;
    }
    brain.coordination_timer.set(ai.coordination_interval);
    if brain.state != AiState::Seeking {
        return;
    }

    let allies = nearby_allies(ctx.world, ctx.config, unit);
    if (allies.len() as u32).saturating_add(1) < ai.group_attack_threshold {
        return;
    }
    if ctx.rng.gen::<f32>() >= ai.coordination_probability {
        return;
    }

    let attack = AiState::CoordinatedAttack {
        timer: Countdown::from_ticks(ai.coordinated_attack_ticks),
    };
    brain.state = attack;
    let mut joined = 0;
    for i in allies {
        if let Some(ally) = ctx.world.enemies[i].brain_mut() {
            if ally.state == AiState::Seeking {
                ally.state = attack;
                joined += 1;
            }
        }
    }
    tracing::debug!(unit = unit.id, joined, "Coordinated attack started");
}

/// One speed step along the current facing.
fn advance(ctx: &TickContext<'_>, unit: &mut Unit) -> bool {
    let (dx, dy) = unit.facing.delta();
    let step = unit.speed * ctx.scale.get();
    move_unit(
        ctx.world,
        unit,
        step * i64::from(dx),
        step * i64::from(dy),
        ctx.config.epsilon(),
    )
}

/// Box of whatever `target` refers to, if it still exists.
fn target_rect(world: &World, target: Option<TargetRef>) -> Option<Rect> {
    match target? {
        TargetRef::Player => world.player.as_ref().map(Unit::rect),
        TargetRef::Base => world.base_rect(),
        TargetRef::Point(p) => Some(Rect::square(p, Fixed::ZERO)),
    }
}

/// Strategic units go for a standing base, everyone else for the player.
/// With neither available the unit walks its patrol route.
fn choose_target(world: &World, unit: &Unit, brain: &mut EnemyBrain) -> Option<TargetRef> {
    if brain.personality == Personality::Strategic && world.surviving_base().is_some() {
        return Some(TargetRef::Base);
    }
    if world.player.is_some() {
        return Some(TargetRef::Player);
    }
    if world.surviving_base().is_some() {
        return Some(TargetRef::Base);
    }

    let count = brain.patrol_points.len();
    if count == 0 {
        return None;
    }
    let mut point = brain.patrol_points[brain.patrol_index % count];
    if point.distance(unit.center()) < world.tile_size() {
        brain.patrol_index = (brain.patrol_index + 1) % count;
        point = brain.patrol_points[brain.patrol_index];
    }
    Some(TargetRef::Point(point))
}

fn seek(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    brain.decision_timer.tick(ctx.scale);
    if brain.decision_timer.is_expired() {
        make_decision(ctx, unit, brain);
    }
    if brain.state != AiState::Seeking {
        return;
    }

    if advance(ctx, unit) {
        brain.stuck_ticks = 0;
        return;
    }
    brain.stuck_ticks = brain.stuck_ticks.saturating_add(1);

    let ai = &ctx.config.ai;
    if brain.stuck_ticks > ai.stuck_escape_threshold
        && is_trapped_in_enclosure(ctx.world, unit, ctx.config)
    {
        start_escape(ctx, unit, brain);
    } else if brain.stuck_ticks > ai.stuck_maneuver_threshold {
        start_maneuver(ctx, unit, brain);
    }
}

/// The seeking decision cycle: pick a target, then a tactic or a heading.
fn make_decision(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let config = ctx.config;
    let ai = &config.ai;
    let upper = ai.decision_max_ticks.max(ai.decision_min_ticks + 1);
    brain
        .decision_timer
        .set(ctx.rng.gen_range(ai.decision_min_ticks..upper));
    brain.target = choose_target(ctx.world, unit, brain);

    if is_trapped_in_enclosure(ctx.world, unit, config) {
        start_escape(ctx, unit, brain);
        return;
    }

    let has_player = ctx.world.player.is_some();
    match brain.personality {
        Personality::Aggressive if has_player && ctx.rng.gen::<f32>() < ai.flanking_probability => {
            brain.state = AiState::Flanking {
                timer: Countdown::from_ticks(ai.flanking_ticks),
            };
            return;
        }
        Personality::Strategic if has_player && ctx.rng.gen::<f32>() < ai.ambush_probability => {
            brain.state = AiState::Ambushing {
                waited: Fixed::ZERO,
            };
            return;
        }
        _ => {}
    }

    let Some(goal) = target_rect(ctx.world, brain.target) else {
        return;
    };
    let from = unit.center();
    let aim = goal.center();
    let (dx, dy) = (aim.x - from.x, aim.y - from.y);
    if is_line_blocked(ctx.world, from, dx, dy) {
        steer_around(ctx, unit, brain, goal.origin());
    } else {
        unit.facing = Direction::toward(dx, dy);
    }
}

/// Coarse three-sample check of the straight line toward a target.
///
/// Samples sit at the quarter points. The target's own tile is skipped
/// because the base tile is always blocked on the grid.
fn is_line_blocked(world: &World, from: Vec2Fixed, dx: Fixed, dy: Fixed) -> bool {
    let goal_tile = world.tile_at(Vec2Fixed::new(from.x + dx, from.y + dy));
    (1..=3i64).any(|i| {
        let tile = world.tile_at(Vec2Fixed::new(from.x + dx * i / 4, from.y + dy * i / 4));
        tile != goal_tile && world.is_grid_blocked(tile)
    })
}

/// Heading when the straight line is blocked: escape, A*, then the local
/// heuristics.
fn steer_around(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain, goal: Vec2Fixed) {
    if is_trapped_in_enclosure(ctx.world, unit, ctx.config) {
        start_escape(ctx, unit, brain);
        return;
    }
    if let Some(dir) = path_direction(ctx.world, ctx.config, unit, goal) {
        unit.facing = dir;
        return;
    }
    tracing::debug!(unit = unit.id, "No path to target, falling back to local search");
    unit.facing = fallback_direction(ctx, unit);
}

/// First step of an A* route from the unit's tile to the goal's tile.
fn path_direction(world: &World, config: &SimConfig, unit: &Unit, goal: Vec2Fixed) -> Option<Direction> {
    let start = world.tile_at(unit.pos);
    let end = world.tile_at(goal);
    let path = find_path(world.grid(), start, end, config.ai.max_path_expansions)?;
    let next = path.get(1)?;
    let (dx, dy) = (next.x - start.x, next.y - start.y);
    Some(if dx > 0 {
        Direction::Right
    } else if dx < 0 {
        Direction::Left
    } else if dy > 0 {
        Direction::Down
    } else {
        Direction::Up
    })
}

/// Wall-follow, then most-open, then a random turn.
fn fallback_direction(ctx: &mut TickContext<'_>, unit: &Unit) -> Direction {
    wall_follow_direction(ctx.world, unit)
        .or_else(|| most_open_direction(ctx.world, unit, ctx.config))
        .unwrap_or_else(|| random_non_reverse(ctx.rng, unit.facing))
}

fn start_escape(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let target = find_escape_target(ctx.world, unit, ctx.config);
    if target.is_none() {
        unit.facing = fallback_direction(ctx, unit);
    }
    brain.state = AiState::Escaping {
        timer: Countdown::from_ticks(ctx.config.ai.escape_ticks),
        target,
    };
    brain.stuck_ticks = 0;
    tracing::debug!(
        unit = unit.id,
        has_target = target.is_some(),
        "Enemy escaping enclosure"
    );
}

/// Sidestep perpendicular to the current facing.
fn start_maneuver(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    brain.state = AiState::Maneuvering {
        timer: Countdown::from_ticks(ctx.config.ai.maneuver_ticks),
    };
    brain.stuck_ticks = 0;
    let flip = ctx.rng.gen_bool(0.5);
    unit.facing = match (unit.facing.is_vertical(), flip) {
        (true, true) => Direction::Left,
        (true, false) => Direction::Right,
        (false, true) => Direction::Up,
        (false, false) => Direction::Down,
    };
}

fn maneuver(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let AiState::Maneuvering { mut timer } = brain.state else {
        return;
    };
    timer.tick(ctx.scale);
    advance(ctx, unit);
    if timer.is_expired() {
        brain.state = AiState::Seeking;
        brain.decision_timer.clear();
    } else {
        brain.state = AiState::Maneuvering { timer };
    }
}

fn retreat(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let AiState::Retreating { mut timer } = brain.state else {
        return;
    };
    timer.tick(ctx.scale);
    if timer.is_expired() {
        brain.state = AiState::Seeking;
        return;
    }
    brain.state = AiState::Retreating { timer };

    if let Some(player) = ctx.world.player.as_ref() {
        unit.facing = Direction::toward(unit.pos.x - player.pos.x, unit.pos.y - player.pos.y);
    }
    advance(ctx, unit);
}

fn ambush(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let AiState::Ambushing { waited } = brain.state else {
        return;
    };
    let waited = waited + ctx.scale.get();
    let ai = &ctx.config.ai;
    let close = ctx.world.player.as_ref().is_some_and(|player| {
        player.pos.distance(unit.pos) < ctx.config.tiles(ai.ambush_trigger_tiles)
    });

    if close || waited > Fixed::from_num(ai.ambush_max_ticks) {
        brain.state = AiState::Seeking;
        make_decision(ctx, unit, brain);
    } else {
        brain.state = AiState::Ambushing { waited };
    }
}

/// Point beside the player, across its facing axis.
fn flank_point(config: &SimConfig, brain: &EnemyBrain, player: &Unit) -> Vec2Fixed {
    let offset = config.tiles(config.ai.flank_offset_tiles) * i64::from(brain.flank_side.sign());
    if player.facing.is_vertical() {
        Vec2Fixed::new(player.pos.x + offset, player.pos.y)
    } else {
        Vec2Fixed::new(player.pos.x, player.pos.y + offset)
    }
}

/// Face toward `point` (top-left to top-left) and step.
fn head_for(ctx: &TickContext<'_>, unit: &mut Unit, point: Vec2Fixed) {
    unit.facing = Direction::toward(point.x - unit.pos.x, point.y - unit.pos.y);
    advance(ctx, unit);
}

fn flank(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let AiState::Flanking { mut timer } = brain.state else {
        return;
    };
    timer.tick(ctx.scale);
    if timer.is_expired() {
        brain.state = AiState::Seeking;
        return;
    }
    brain.state = AiState::Flanking { timer };

    if let Some(point) = ctx
        .world
        .player
        .as_ref()
        .map(|player| flank_point(ctx.config, brain, player))
    {
        unit.facing = Direction::toward(point.x - unit.pos.x, point.y - unit.pos.y);
    }
    advance(ctx, unit);
}

fn coordinated_attack(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let AiState::CoordinatedAttack { mut timer } = brain.state else {
        return;
    };
    timer.tick(ctx.scale);
    if timer.is_expired() {
        brain.state = AiState::Seeking;
        return;
    }
    if nearby_allies(ctx.world, ctx.config, unit).is_empty() {
        brain.state = AiState::Seeking;
        return;
    }
    brain.state = AiState::CoordinatedAttack { timer };

    let Some(player) = ctx.world.player.as_ref() else {
        return;
    };
    let player_pos = player.pos;
    let flank = flank_point(ctx.config, brain, player);

    match brain.role {
        TeamRole::Leader => {
            brain.target = Some(TargetRef::Player);
            head_for(ctx, unit, player_pos);
        }
        TeamRole::Support => {
            brain.target = Some(TargetRef::Player);
            let ai = &ctx.config.ai;
            let distance = player_pos.distance(unit.pos);
            if distance < ctx.config.tiles(ai.support_min_tiles) {
                let away = Vec2Fixed::new(
                    unit.pos.x * 2 - player_pos.x,
                    unit.pos.y * 2 - player_pos.y,
                );
                head_for(ctx, unit, away);
            } else if distance > ctx.config.tiles(ai.support_max_tiles) {
                head_for(ctx, unit, player_pos);
            } else {
                unit.facing = Direction::toward(player_pos.x - unit.pos.x, player_pos.y - unit.pos.y);
            }
        }
        TeamRole::Scout => head_for(ctx, unit, flank),
    }
}

fn escape(ctx: &mut TickContext<'_>, unit: &mut Unit, brain: &mut EnemyBrain) {
    let AiState::Escaping { mut timer, target } = brain.state else {
        return;
    };
    timer.tick(ctx.scale);
    if timer.is_expired() {
        brain.state = AiState::Seeking;
        tracing::debug!(unit = unit.id, "Escape timed out");
        return;
    }

    match target {
        Some(point) => {
            let center = unit.center();
            if point.distance(center) < ctx.config.tile_size() {
                brain.state = AiState::Seeking;
                tracing::debug!(unit = unit.id, "Reached escape target");
                return;
            }
            unit.facing = Direction::toward(point.x - center.x, point.y - center.y);
        }
        None => {
            if let Some(dir) = most_open_direction(ctx.world, unit, ctx.config) {
                unit.facing = dir;
            }
        }
    }
    brain.state = AiState::Escaping { timer, target };
    advance(ctx, unit);
}

/// Aggressive seekers keep turning toward a distant player.
fn pursue(world: &World, config: &SimConfig, unit: &mut Unit) {
    let Some(player) = world.player.as_ref() else {
        return;
    };
    let (dx, dy) = (player.pos.x - unit.pos.x, player.pos.y - unit.pos.y);
    if player.pos.distance(unit.pos) > config.tiles(config.ai.pursuit_min_tiles) {
        unit.facing = Direction::toward(dx, dy);
    }
}

/// True when the target is ahead along the firing axis and no wall lies on
/// the line between the two centres.
///
/// The line is sampled every quarter tile; a sample counts as blocked when
/// the tile containing it holds a wall.
#[must_use]
pub fn can_see_target(world: &World, unit: &Unit, target: Option<TargetRef>) -> bool {
    let Some(goal) = target_rect(world, target) else {
        return false;
    };
    let from = unit.center();
    let to = goal.center();
    let (dx, dy) = (to.x - from.x, to.y - from.y);

    let aligned = match unit.facing {
        Direction::Up => to.y < from.y && dx.abs() < unit.size,
        Direction::Down => to.y > from.y && dx.abs() < unit.size,
        Direction::Left => to.x < from.x && dy.abs() < unit.size,
        Direction::Right => to.x > from.x && dy.abs() < unit.size,
    };
    if !aligned {
        return false;
    }

    let step = world.tile_size() / 4;
    let steps = (from.distance(to) / step).to_num::<i64>();
    if steps < 2 {
        return true;
    }
    (1..steps).all(|i| {
        let sample = Vec2Fixed::new(from.x + dx * i / steps, from.y + dy * i / steps);
        !world.walls().contains_key(&world.tile_at(sample))
    })
}

fn try_fire(ctx: &mut TickContext<'_>, unit: &mut Unit) {
    if unit.fire_cooldown.is_active() {
        return;
    }
    let Some(archetype) = unit.archetype() else {
        return;
    };
    fire_projectile(ctx.world, ctx.config, unit, Fixed::ZERO, false, ctx.events);
    unit.fire_cooldown
        .set(ctx.config.archetypes.get(archetype).fire_cooldown);
}
