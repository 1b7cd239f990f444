//! Pickups dropped by destroyed enemies.

use rand::Rng;

use crate::components::{Pickup, PickupKind, PlayerState, Weapon};
use crate::config::SimConfig;
use crate::events::{SimEvent, TickEvents};
use crate::math::{Rect, Vec2Fixed};
use crate::timer::{Countdown, TimeScale};
use crate::world::World;

/// Roll for a drop where an enemy died.
///
/// The pickup is centred in the tile-sized box anchored at `unit_pos` and is
/// discarded if it would overlap a wall.
pub fn maybe_drop_pickup<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    unit_pos: Vec2Fixed,
    events: &mut TickEvents,
) {
    if rng.gen::<f32>() >= config.pickups.spawn_chance {
        return;
    }
    let kind = PickupKind::ALL[rng.gen_range(0..PickupKind::ALL.len())];

    let size = config.tiles(config.pickups.size_tiles);
    let inset = (config.tile_size() - size) / 2;
    let pos = Vec2Fixed::new(unit_pos.x + inset, unit_pos.y + inset);
    if !world.walls_overlapping(&Rect::square(pos, size)).is_empty() {
        tracing::debug!(kind = ?kind, "Pickup drop blocked by wall");
        return;
    }

    world.pickups.push(Pickup {
        kind,
        pos,
        size,
        lifetime: Countdown::from_ticks(config.pickups.lifetime),
    });
    events.push(SimEvent::PickupSpawned { kind });
}

/// Apply a collected pickup's effect.
pub fn apply_pickup(world_lives: &mut u32, state: &mut PlayerState, kind: PickupKind, config: &SimConfig) {
    let duration = config.pickups.get(kind).duration;
    match kind {
        PickupKind::RapidFire => state.rapid_fire.set(duration),
        PickupKind::Armor => state.armor.set(duration),
        PickupKind::ExtraLife => *world_lives = world_lives.saturating_add(1),
        PickupKind::Invincible => state.star.set(duration),
        PickupKind::Shotgun => {
            state.weapon = Weapon::Shotgun;
            state.weapon_timer.set(duration);
        }
        PickupKind::Laser => {
            state.weapon = Weapon::Laser;
            state.weapon_timer.set(duration);
        }
    }
}

/// Age every pickup by one scaled tick.
pub fn age_pickups(world: &mut World, scale: TimeScale) {
    for pickup in &mut world.pickups {
        pickup.lifetime.tick(scale);
    }
}

/// Collect pickups under the player and drop expired ones.
pub fn resolve_pickups(world: &mut World, config: &SimConfig, events: &mut TickEvents) {
    let pickups = std::mem::take(&mut world.pickups);
    let mut kept = Vec::with_capacity(pickups.len());

    for pickup in pickups {
        let collected = match world.player.as_mut() {
            Some(player) if player.rect().overlaps(&pickup.rect()) => {
                if let Some(state) = player.player_state_mut() {
                    apply_pickup(&mut world.lives, state, pickup.kind, config);
                }
                true
            }
            _ => false,
        };

        if collected {
            world.add_score(config.pickups.get(pickup.kind).points);
            events.push(SimEvent::PickupCollected { kind: pickup.kind });
            tracing::debug!(kind = ?pickup.kind, "Pickup collected");
        } else if pickup.lifetime.is_active() {
            kept.push(pickup);
        }
    }

    world.pickups = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Direction, Unit, UnitKind, WallKind};
    use crate::math::Fixed;
    use crate::pathfinding::TilePos;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn player_at(x: i32, y: i32) -> Unit {
        Unit {
            id: 1,
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

    #[test]
    fn test_guaranteed_drop_is_centred() {
        let config = SimConfig::default().with_pickup_chance(1.0);
        let mut world = World::new(&config);
        let mut events = TickEvents::default();
        let mut rng = SmallRng::seed_from_u64(1);

        maybe_drop_pickup(&mut world, &config, &mut rng, Vec2Fixed::from_ints(200, 200), &mut events);

        assert_eq!(world.pickups.len(), 1);
        let pickup = &world.pickups[0];
        assert_eq!(pickup.size, Fixed::from_num(32));
        assert_eq!(pickup.pos, Vec2Fixed::from_ints(204, 204));
        assert_eq!(events.events.len(), 1);
    }

    #[test]
    fn test_drop_onto_wall_is_discarded() {
        let config = SimConfig::default().with_pickup_chance(1.0);
        let mut world = World::new(&config);
        world.set_wall(TilePos::new(5, 5), WallKind::Destructible);
        let mut events = TickEvents::default();

        maybe_drop_pickup(
            &mut world,
            &config,
            &mut SmallRng::seed_from_u64(1),
            Vec2Fixed::from_ints(200, 200),
            &mut events,
        );
        assert!(world.pickups.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_zero_chance_never_drops() {
        let config = SimConfig::default().with_pickup_chance(0.0);
        let mut world = World::new(&config);
        let mut events = TickEvents::default();
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            maybe_drop_pickup(&mut world, &config, &mut rng, Vec2Fixed::ZERO, &mut events);
        }
        assert!(world.pickups.is_empty());
    }

    #[test]
    fn test_collect_applies_effect_and_scores() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        world.player = Some(player_at(100, 100));
        world.pickups.push(Pickup {
            kind: PickupKind::ExtraLife,
            pos: Vec2Fixed::from_ints(110, 110),
            size: Fixed::from_num(32),
            lifetime: Countdown::from_ticks(10),
        });
        let mut events = TickEvents::default();

        resolve_pickups(&mut world, &config, &mut events);

        assert!(world.pickups.is_empty());
        assert_eq!(world.lives, config.player.starting_lives + 1);
        assert_eq!(world.score, 500);
        assert_eq!(
            events.events,
            vec![SimEvent::PickupCollected {
                kind: PickupKind::ExtraLife
            }]
        );
    }

    #[test]
    fn test_weapon_pickups_set_weapon_and_timer() {
        let config = SimConfig::default();
        let mut lives = 3;
        let mut state = PlayerState::default();
        apply_pickup(&mut lives, &mut state, PickupKind::Laser, &config);
        assert_eq!(state.weapon, Weapon::Laser);
        assert_eq!(state.weapon_timer, Countdown::from_ticks(400));
        assert_eq!(lives, 3);
    }

    #[test]
    fn test_expired_pickups_are_removed() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        world.pickups.push(Pickup {
            kind: PickupKind::Armor,
            pos: Vec2Fixed::from_ints(400, 100),
            size: Fixed::from_num(32),
            lifetime: Countdown::from_ticks(1),
        });

        age_pickups(&mut world, TimeScale::ONE);
        resolve_pickups(&mut world, &config, &mut TickEvents::default());
        assert!(world.pickups.is_empty());
    }
}
