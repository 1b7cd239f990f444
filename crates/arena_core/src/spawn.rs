//! Enemy construction and wave placement.
//!
//! A wave is placed by cycling through a short list of candidate points,
//! one per attempt, with a little jitter. Every candidate is validated
//! against walls, the base, the arena edge and other units before the enemy
//! is accepted. If the whole budget fails, a single emergency enemy is
//! placed regardless so that no level starts empty.

use rand::Rng;

use crate::collision::{is_embedded, is_position_blocked, recover};
use crate::components::{
    ArchetypeKind, Direction, EnemyBrain, FlankSide, Personality, Unit, UnitId, UnitKind,
};
use crate::config::{SimConfig, SpawnConfig};
use crate::events::TickEvents;
use crate::math::{Fixed, Rect, Vec2Fixed};
use crate::timer::Countdown;
use crate::world::World;

/// Enemy count and archetype mix for one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlan {
    /// Enemies to place.
    pub count: u32,
    /// Share of tough enemies.
    pub tough_ratio: f32,
    /// Share of elite enemies.
    pub elite_ratio: f32,
    /// Spawn the boss alone instead of a regular wave.
    pub boss: bool,
}

impl SpawnPlan {
    /// Plan derived from the level index.
    #[must_use]
    pub fn for_level(level: u32, config: &SpawnConfig) -> Self {
        let extra = (level as f32 * config.count_per_level).floor() as u32;
        let count = config.base_count.saturating_add(extra).min(config.max_count);
        let tough_ratio =
            (config.tough_base_ratio + config.tough_ratio_per_level * level as f32)
                .min(config.tough_max_ratio);
        let elite_ratio = ((level as f32 - config.elite_start_level as f32)
            * config.elite_ratio_per_level)
            .clamp(0.0, config.elite_max_ratio);

        Self {
            count,
            tough_ratio,
            elite_ratio,
            boss: level == config.boss_level,
        }
    }

    /// Archetype for a uniform roll in `[0, 1)`: elite, then tough, then normal.
    #[must_use]
    pub fn pick_archetype(&self, roll: f32) -> ArchetypeKind {
        if roll < self.elite_ratio {
            ArchetypeKind::Elite
        } else if roll < self.elite_ratio + self.tough_ratio {
            ArchetypeKind::Tough
        } else {
            ArchetypeKind::Normal
        }
    }
}

fn roll_personality<R: Rng>(config: &SimConfig, rng: &mut R) -> Personality {
    if rng.gen::<f32>() < config.ai.aggressive_probability {
        Personality::Aggressive
    } else if rng.gen::<f32>() < config.ai.strategic_probability {
        Personality::Strategic
    } else {
        Personality::Defensive
    }
}

fn patrol_points<R: Rng>(config: &SimConfig, rng: &mut R) -> Vec<Vec2Fixed> {
    let tank = config.tank_size().to_num::<f32>();
    let width = config.world_width().to_num::<f32>() - tank;
    let height = config.world_height().to_num::<f32>() - tank;
    (0..config.ai.patrol_points)
        .map(|_| {
            Vec2Fixed::new(
                Fixed::from_num(rng.gen::<f32>() * width + tank / 2.0),
                Fixed::from_num(rng.gen::<f32>() * height + tank / 2.0),
            )
        })
        .collect()
}

/// Build an enemy at `pos` without placing it.
pub fn new_enemy<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    pos: Vec2Fixed,
    archetype: ArchetypeKind,
) -> Unit {
    let stats = config.archetypes.get(archetype);
    let personality = roll_personality(config, rng);
    let group_id = rng.gen_range(0..3u8);
    let flank_side = if rng.gen_bool(0.5) {
        FlankSide::Near
    } else {
        FlankSide::Far
    };

    let mut brain = EnemyBrain::new(personality, group_id, flank_side);
    brain.patrol_points = patrol_points(config, rng);

    let mut base_speed = config.tank_speed() * Fixed::from_num(stats.speed_factor);
    if personality == Personality::Aggressive {
        base_speed *= Fixed::from_num(config.ai.aggressive_speed_bonus);
    }

    Unit {
        id: world.alloc_id(),
        kind: UnitKind::Enemy { archetype, brain },
        pos,
        size: config.tank_size() * i64::from(stats.size_factor),
        facing: Direction::Down,
        health: stats.health,
        max_health: stats.health,
        base_speed,
        speed: base_speed,
        fire_cooldown: Countdown::ZERO,
    }
}

/// Place an enemy if the spot is free.
///
/// The position is clamped into the arena first. Returns `None` when the
/// enemy would overlap a wall, the base or another unit.
pub fn spawn_enemy<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    pos: Vec2Fixed,
    archetype: ArchetypeKind,
) -> Option<UnitId> {
    let size = config.tank_size() * i64::from(config.archetypes.get(archetype).size_factor);
    let pos = Vec2Fixed::new(
        pos.x.clamp(Fixed::ZERO, (world.width() - size).max(Fixed::ZERO)),
        pos.y.clamp(Fixed::ZERO, (world.height() - size).max(Fixed::ZERO)),
    );
    // Nothing uses id 0, so every unit counts as an obstacle here.
    if is_position_blocked(world, &Rect::square(pos, size), 0) {
        return None;
    }

    let unit = new_enemy(world, config, rng, pos, archetype);
    let id = unit.id;
    world.enemies.push(unit);
    Some(id)
}

/// Place a whole wave. Returns how many enemies were placed.
pub fn spawn_wave<R: Rng>(
    world: &mut World,
    config: &SimConfig,
    rng: &mut R,
    plan: &SpawnPlan,
    events: &mut TickEvents,
) -> usize {
    let tile = config.tile_size();
    let before = world.enemies.len();

    if plan.boss {
        let pos = Vec2Fixed::new(world.width() / 2 - tile, tile * 2);
        if spawn_enemy(world, config, rng, pos, ArchetypeKind::Boss).is_some() {
            tracing::info!(level = world.level, "Boss spawned");
        }
    } else {
        let points = &config.spawn.spawn_points;
        let mut attempts = 0u32;
        let mut failures = 0u32;
        while !points.is_empty()
            && ((world.enemies.len() - before) as u32) < plan.count
            && attempts < config.spawn.max_attempts
        {
            let (px, py) = points[attempts as usize % points.len()];
            let t = tile.to_num::<f32>();
            let jitter = t / 4.0;
            let x = px * t + (rng.gen::<f32>() - 0.5) * jitter;
            let y = py * t + (rng.gen::<f32>() - 0.5) * jitter;
            let archetype = plan.pick_archetype(rng.gen());
            let pos = Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y));
            if spawn_enemy(world, config, rng, pos, archetype).is_none() {
                failures += 1;
            }
            attempts += 1;
        }
        if failures > 0 {
            tracing::debug!(failures, attempts, "Spawn candidates rejected");
        }
    }

    if world.enemies.len() == before {
        tracing::warn!(level = world.level, "No enemy placed, using emergency spawn");
        let pos = Vec2Fixed::new(tile * 2, tile * 2);
        let mut unit = new_enemy(world, config, rng, pos, ArchetypeKind::Normal);
        if is_embedded(world, &unit.rect()) {
            recover(world, &mut unit, config, events);
        }
        world.enemies.push(unit);
    }

    let placed = world.enemies.len() - before;
    tracing::info!(
        level = world.level,
        placed,
        planned = plan.count,
        tough_ratio = plan.tough_ratio,
        elite_ratio = plan.elite_ratio,
        "Wave spawned"
    );
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::WallKind;
    use crate::level::LevelLayout;
    use crate::pathfinding::TilePos;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_plan_scales_with_level() {
        let config = SpawnConfig::default();
        let first = SpawnPlan::for_level(0, &config);
        assert_eq!(first.count, 4);
        assert_eq!(first.elite_ratio, 0.0);
        assert!(!first.boss);

        let later = SpawnPlan::for_level(5, &config);
        assert_eq!(later.count, 11);
        assert!((later.tough_ratio - 0.7).abs() < 1e-6);
        assert!((later.elite_ratio - 0.3).abs() < 1e-6);

        assert_eq!(SpawnPlan::for_level(8, &config).count, 12);
        assert!(SpawnPlan::for_level(9, &config).boss);
    }

    #[test]
    fn test_pick_archetype_bands() {
        let plan = SpawnPlan {
            count: 1,
            tough_ratio: 0.5,
            elite_ratio: 0.2,
            boss: false,
        };
        assert_eq!(plan.pick_archetype(0.1), ArchetypeKind::Elite);
        assert_eq!(plan.pick_archetype(0.5), ArchetypeKind::Tough);
        assert_eq!(plan.pick_archetype(0.9), ArchetypeKind::Normal);
    }

    #[test]
    fn test_spawn_enemy_rejects_walls_and_units() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        world.set_wall(TilePos::new(2, 2), WallKind::Indestructible);
        let mut rng = SmallRng::seed_from_u64(1);

        let on_wall = Vec2Fixed::from_ints(85, 85);
        assert!(spawn_enemy(&mut world, &config, &mut rng, on_wall, ArchetypeKind::Normal).is_none());

        let open = Vec2Fixed::from_ints(400, 200);
        assert!(spawn_enemy(&mut world, &config, &mut rng, open, ArchetypeKind::Normal).is_some());
        assert!(spawn_enemy(&mut world, &config, &mut rng, open, ArchetypeKind::Tough).is_none());
        assert_eq!(world.enemies.len(), 1);
    }

    #[test]
    fn test_new_enemy_uses_archetype_stats() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        let mut rng = SmallRng::seed_from_u64(4);
        let boss = new_enemy(&mut world, &config, &mut rng, Vec2Fixed::ZERO, ArchetypeKind::Boss);

        assert_eq!(boss.size, Fixed::from_num(72));
        assert_eq!(boss.health, 30);
        assert_eq!(boss.facing, Direction::Down);
        let brain = boss.brain().unwrap();
        assert_eq!(brain.patrol_points.len(), 4);
        assert!(brain.group_id < 3);
    }

    #[test]
    fn test_wave_on_default_layout_places_enemies_clear_of_walls() {
        let config = SimConfig::default();
        let mut world = World::from_level(LevelLayout::default().decode(&config), &config);
        let mut rng = SmallRng::seed_from_u64(11);
        let plan = SpawnPlan::for_level(0, &config.spawn);

        let placed = spawn_wave(&mut world, &config, &mut rng, &plan, &mut TickEvents::default());

        assert!(placed >= 1);
        assert!(placed as u32 <= plan.count);
        for enemy in &world.enemies {
            assert!(!is_embedded(&world, &enemy.rect()));
        }
    }

    #[test]
    fn test_boss_level_spawns_single_boss() {
        let config = SimConfig::default();
        let mut world = World::new(&config);
        let plan = SpawnPlan::for_level(9, &config.spawn);
        let placed = spawn_wave(
            &mut world,
            &config,
            &mut SmallRng::seed_from_u64(2),
            &plan,
            &mut TickEvents::default(),
        );
        assert_eq!(placed, 1);
        assert_eq!(world.enemies[0].archetype(), Some(ArchetypeKind::Boss));
    }

    #[test]
    fn test_blocked_arena_still_gets_emergency_enemy() {
        let mut config = SimConfig::default();
        config.spawn.max_attempts = 10;
        let mut world = World::new(&config);
        for y in 0..5 {
            for x in 0..20 {
                world.set_wall(TilePos::new(x, y), WallKind::Indestructible);
            }
        }
        let plan = SpawnPlan::for_level(0, &config.spawn);
        let placed = spawn_wave(
            &mut world,
            &config,
            &mut SmallRng::seed_from_u64(3),
            &plan,
            &mut TickEvents::default(),
        );

        assert_eq!(placed, 1);
        assert!(!is_embedded(&world, &world.enemies[0].rect()));
    }
}
