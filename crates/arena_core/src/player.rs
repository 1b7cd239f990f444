//! The player tank: control input, weapons and respawn.

use crate::collision::{force_relocate, is_embedded, move_unit, unstick};
use crate::combat::fire_projectile;
use crate::components::{ControlInput, Direction, PlayerState, Unit, UnitKind, Weapon};
use crate::config::SimConfig;
use crate::events::{SimEvent, TickEvents};
use crate::math::{Fixed, Vec2Fixed};
use crate::simulation::TickContext;
use crate::timer::{Countdown, TimeScale};
use crate::world::World;

/// A fresh player tank at the world's spawn point, facing up.
pub fn new_player(world: &mut World, config: &SimConfig) -> Unit {
    let speed = config.tank_speed();
    Unit {
        id: world.alloc_id(),
        kind: UnitKind::Player(PlayerState::default()),
        pos: world.player_spawn,
        size: config.tank_size(),
        facing: Direction::Up,
        health: 1,
        max_health: 1,
        base_speed: speed,
        speed,
        fire_cooldown: Countdown::ZERO,
    }
}

fn tick_effects(state: &mut PlayerState, scale: TimeScale) {
    state.grace.tick(scale);
    state.star.tick(scale);
    state.armor.tick(scale);
    state.rapid_fire.tick(scale);
    if state.weapon_timer.tick(scale) {
        tracing::debug!(weapon = ?state.weapon, "Weapon expired");
        state.weapon = Weapon::Normal;
    }
}

/// Advance the detached player by one tick of input.
pub(crate) fn update_player(ctx: &mut TickContext<'_>, unit: &mut Unit, input: ControlInput) {
    unit.fire_cooldown.tick(ctx.scale);
    if let Some(state) = unit.player_state_mut() {
        tick_effects(state, ctx.scale);
    }

    if is_embedded(ctx.world, &unit.rect()) {
        unstick(ctx.world, unit, ctx.config);
    }

    let dx = i32::from(input.right) - i32::from(input.left);
    let dy = i32::from(input.down) - i32::from(input.up);
    if dx != 0 || dy != 0 {
        let dir = Vec2Fixed::from_ints(dx, dy).normalize();
        unit.facing = Direction::toward(dir.x, dir.y);
        let step = unit.speed * ctx.scale.get();
        move_unit(
            ctx.world,
            unit,
            dir.x * step,
            dir.y * step,
            ctx.config.epsilon(),
        );
    }

    if input.fire {
        fire(ctx, unit);
    }
}

/// Fire the current weapon if the reload has elapsed.
fn fire(ctx: &mut TickContext<'_>, unit: &mut Unit) {
    if unit.fire_cooldown.is_active() {
        return;
    }
    let Some(state) = unit.player_state() else {
        return;
    };
    let weapon = state.weapon;
    let rapid = state.rapid_fire.is_active();
    let player = &ctx.config.player;

    match weapon {
        Weapon::Normal => {
            fire_projectile(ctx.world, ctx.config, unit, Fixed::ZERO, false, ctx.events);
        }
        Weapon::Shotgun => {
            let offset = Fixed::from_num(player.shotgun_offset);
            for lateral in [Fixed::ZERO, offset, -offset] {
                fire_projectile(ctx.world, ctx.config, unit, lateral, false, ctx.events);
            }
        }
        Weapon::Laser => {
            fire_projectile(ctx.world, ctx.config, unit, Fixed::ZERO, true, ctx.events);
        }
    }

    let cooldown = if rapid {
        player.rapid_fire_cooldown
    } else {
        player.fire_cooldown
    };
    unit.fire_cooldown.set(cooldown);
}

/// Put the player back at its spawn point with a grace period.
///
/// An embedded spawn point falls back through the neighbouring tiles and two
/// spots along the bottom edge before forcing a relocation.
pub fn respawn(world: &World, unit: &mut Unit, config: &SimConfig, events: &mut TickEvents) {
    let spawn = world.player_spawn;
    unit.pos = spawn;
    unit.facing = Direction::Up;
    if let Some(state) = unit.player_state_mut() {
        state.grace.set(config.player.invulnerability_ticks);
    }
    if unstick(world, unit, config) {
        return;
    }

    tracing::warn!(x = ?spawn.x, y = ?spawn.y, "Player spawn point blocked");
    let t = config.tile_size();
    let h = world.height();
    let fallbacks = [
        Vec2Fixed::new(spawn.x, spawn.y + t),
        Vec2Fixed::new(spawn.x, spawn.y - t),
        Vec2Fixed::new(spawn.x + t, spawn.y),
        Vec2Fixed::new(spawn.x - t, spawn.y),
        Vec2Fixed::new(t * 2, h - t * 3),
        Vec2Fixed::new(t * 4, h - t * 3),
    ];
    for pos in fallbacks {
        unit.pos = pos;
        if unstick(world, unit, config) {
            return;
        }
    }

    if force_relocate(world, unit, config) {
        events.push(SimEvent::UnitRelocated { unit: unit.id });
    }
}
