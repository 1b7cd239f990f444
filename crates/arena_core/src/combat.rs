//! Projectile firing, flight and hit resolution.
//!
//! Each projectile is resolved once per tick in a fixed order:
//! 1. fully outside the arena: removed
//! 2. touching the surviving base: base destroyed, game over
//! 3. touching walls: the first wall in row-major order is struck; a
//!    destructible one is removed (grid rebuilt), steel absorbs
//! 4. player fire against enemies, honouring the piercing hit-list
//! 5. enemy fire against the player: invulnerability, armor, then a life

use rand::Rng;

use crate::components::{ArchetypeKind, Direction, OwnerKind, Projectile, Unit, WallKind};
use crate::config::SimConfig;
use crate::events::{GameOverCause, SimEvent, TickEvents};
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::pickups::maybe_drop_pickup;
use crate::player::respawn;
use crate::timer::TimeScale;
use crate::world::{SimStatus, World};

/// What happens to a projectile after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Flying,
    Consumed,
}

/// Top-left corner of a projectile leaving `unit`'s muzzle.
#[must_use]
pub fn muzzle_position(unit: &Unit, projectile_size: Fixed) -> Vec2Fixed {
    let center = unit.center();
    let half = projectile_size / 2;
    match unit.facing {
        Direction::Up => Vec2Fixed::new(center.x - half, unit.pos.y - projectile_size),
        Direction::Down => Vec2Fixed::new(center.x - half, unit.pos.y + unit.size),
        Direction::Left => Vec2Fixed::new(unit.pos.x - projectile_size, center.y - half),
        Direction::Right => Vec2Fixed::new(unit.pos.x + unit.size, center.y - half),
    }
}

/// Spawn one projectile from `shooter`'s muzzle, shifted sideways by
/// `lateral` perpendicular to its facing.
pub fn fire_projectile(
    world: &mut World,
    config: &SimConfig,
    shooter: &Unit,
    lateral: Fixed,
    piercing: bool,
    events: &mut TickEvents,
) {
    let size = Fixed::from_num(config.projectile.size);
    let muzzle = muzzle_position(shooter, size);
    let pos = if shooter.facing.is_vertical() {
        Vec2Fixed::new(muzzle.x + lateral, muzzle.y)
    } else {
        Vec2Fixed::new(muzzle.x, muzzle.y + lateral)
    };

    let id = world.alloc_id();
    world.projectiles.push(Projectile {
        id,
        pos,
        direction: shooter.facing,
        owner: shooter.owner(),
        shooter: shooter.id,
        piercing,
        hit_list: Vec::new(),
        size,
        speed: Fixed::from_num(config.projectile.speed),
        damage: config.projectile.damage,
    });
    events.push(SimEvent::ProjectileFired {
        shooter: shooter.id,
        owner: shooter.owner(),
        direction: shooter.facing,
    });
}

/// Move every projectile along its direction.
pub fn advance_projectiles(world: &mut World, scale: TimeScale) {
    for projectile in &mut world.projectiles {
        let (dx, dy) = projectile.direction.delta();
        let distance = projectile.speed * scale.get();
        projectile.pos.x += distance * i64::from(dx);
        projectile.pos.y += distance * i64::from(dy);
    }
}

/// End the level in failure. Only the first call has any effect.
pub fn end_game(world: &mut World, cause: GameOverCause, events: &mut TickEvents) {
    if world.status != SimStatus::Playing {
        return;
    }
    world.status = SimStatus::GameOver(cause);
    events.push(SimEvent::GameOver { cause });
    tracing::info!(cause = ?cause, score = world.score, level = world.level, "Game over");
}

fn fully_outside(world: &World, rect: &Rect) -> bool {
    rect.right() <= Fixed::ZERO
        || rect.bottom() <= Fixed::ZERO
        || rect.x >= world.width()
        || rect.y >= world.height()
}

/// Resolve every projectile against the arena. Runs once per tick after
/// all movement.
pub fn resolve_projectiles<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    events: &mut TickEvents,
) {
    let projectiles = std::mem::take(&mut world.projectiles);
    let mut flying = Vec::with_capacity(projectiles.len());

    for mut projectile in projectiles {
        // Once the game has ended nothing else is resolved this tick.
        if !world.is_playing() {
            flying.push(projectile);
            continue;
        }
        if resolve_one(world, config, rng, &mut projectile, events) == Fate::Flying {
            flying.push(projectile);
        }
    }

    world.projectiles = flying;
}

fn resolve_one<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    projectile: &mut Projectile,
    events: &mut TickEvents,
) -> Fate {
    let rect = projectile.rect();

    if fully_outside(world, &rect) {
        return Fate::Consumed;
    }

    if world.base_rect().is_some_and(|base| base.overlaps(&rect)) {
        world.destroy_base();
        events.push(SimEvent::BaseDestroyed);
        end_game(world, GameOverCause::BaseDestroyed, events);
        return Fate::Consumed;
    }

    // One wall per hit: the first overlapped tile in row-major order.
    if let Some(&(tile, kind)) = world.walls_overlapping(&rect).first() {
        match kind {
            WallKind::Destructible => {
                world.remove_wall(tile);
                events.push(SimEvent::WallDestroyed { tile });
                if projectile.owner == OwnerKind::Player {
                    world.add_score(config.scoring.wall_destroyed);
                }
                if !projectile.piercing {
                    return Fate::Consumed;
                }
            }
            WallKind::Indestructible => return Fate::Consumed,
        }
    }

    match projectile.owner {
        OwnerKind::Player => hit_enemies(world, config, rng, projectile, &rect, events),
        OwnerKind::Enemy => hit_player(world, config, &rect, events),
    }
}

fn hit_enemies<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    projectile: &mut Projectile,
    rect: &Rect,
    events: &mut TickEvents,
) -> Fate {
    let mut i = 0;
    while i < world.enemies.len() {
        let enemy = &mut world.enemies[i];
        if projectile.hit_list.contains(&enemy.id) || !enemy.rect().overlaps(rect) {
            i += 1;
            continue;
        }

        enemy.health = enemy.health.saturating_sub(projectile.damage);
        if projectile.piercing {
            projectile.hit_list.push(enemy.id);
        }

        if enemy.health == 0 {
            let dead = world.enemies.remove(i);
            let archetype = dead.archetype().unwrap_or(ArchetypeKind::Normal);
            let points = config.archetypes.get(archetype).points;
            world.add_score(points);
            events.push(SimEvent::UnitDestroyed {
                unit: dead.id,
                archetype,
                pos: dead.pos,
                points,
            });
            tracing::debug!(unit = dead.id, archetype = ?archetype, points, "Enemy destroyed");
            maybe_drop_pickup(world, config, rng, dead.pos, events);
        } else {
            events.push(SimEvent::UnitDamaged {
                unit: enemy.id,
                remaining: enemy.health,
            });
            i += 1;
        }

        if !projectile.piercing {
            return Fate::Consumed;
        }
    }
    Fate::Flying
}

fn hit_player(world: &mut World, config: &SimConfig, rect: &Rect, events: &mut TickEvents) -> Fate {
    let Some(player) = world.player.as_mut() else {
        return Fate::Flying;
    };
    if !player.rect().overlaps(rect) {
        return Fate::Flying;
    }
    let Some(state) = player.player_state_mut() else {
        return Fate::Flying;
    };
    if state.is_invulnerable() {
        return Fate::Flying;
    }
    if state.armor.is_active() {
        state.armor.clear();
        events.push(SimEvent::ArmorAbsorbed);
        return Fate::Consumed;
    }

    world.lives = world.lives.saturating_sub(1);
    events.push(SimEvent::LifeLost {
        remaining: world.lives,
    });
    tracing::info!(lives = world.lives, "Player hit");

    if world.lives > 0 {
        if let Some(mut player) = world.player.take() {
            respawn(world, &mut player, config, events);
            world.player = Some(player);
        }
    } else {
        end_game(world, GameOverCause::PlayerDestroyed, events);
    }
    Fate::Consumed
}
