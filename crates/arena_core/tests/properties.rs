//! Property tests for pathfinding, movement, timers and replay.

use std::collections::BTreeMap;

use arena_core::collision::{is_embedded, move_unit};
use arena_core::components::WallKind;
use arena_core::config::SimConfig;
use arena_core::level::LevelSet;
use arena_core::math::Fixed;
use arena_core::pathfinding::{find_path, OccupancyGrid, TilePos};
use arena_core::player::new_player;
use arena_core::simulation::Simulation;
use arena_core::timer::{Countdown, TimeScale};
use arena_core::world::World;
use arena_test_utils::fixtures::tank_on_tile;
use arena_test_utils::strategies::{arb_input_script, arb_seed, arb_tile, arb_tile_set};
use proptest::prelude::*;

const W: u32 = 12;
const H: u32 = 9;

fn grid_with(walls: &std::collections::BTreeSet<TilePos>) -> OccupancyGrid {
    let map: BTreeMap<TilePos, WallKind> = walls
        .iter()
        .map(|&t| (t, WallKind::Indestructible))
        .collect();
    let mut grid = OccupancyGrid::new(W, H);
    grid.rebuild(&map, None);
    grid
}

proptest! {
    #[test]
    fn test_paths_are_connected_and_avoid_walls(
        walls in arb_tile_set(W, H, 40),
        start in arb_tile(W, H),
        goal in arb_tile(W, H),
    ) {
        let grid = grid_with(&walls);
        if let Some(path) = find_path(&grid, start, goal, 1_000) {
            prop_assert_eq!(path[0], start);
            prop_assert_eq!(*path.last().unwrap(), goal);
            prop_assert!(path.len() as u32 > start.manhattan(goal));
            for pair in path.windows(2) {
                prop_assert_eq!(pair[0].manhattan(pair[1]), 1);
            }
            for tile in &path[1..path.len() - 1] {
                prop_assert!(!grid.is_blocked(*tile));
            }
        }
    }

    #[test]
    fn test_open_grid_always_has_shortest_path(
        start in arb_tile(W, H),
        goal in arb_tile(W, H),
    ) {
        let grid = OccupancyGrid::new(W, H);
        let path = find_path(&grid, start, goal, 1_000);
        prop_assert!(path.is_some());
        prop_assert_eq!(path.map(|p| p.len() as u32), Some(start.manhattan(goal) + 1));
    }

    #[test]
    fn test_moves_never_embed(
        walls in arb_tile_set(W, H, 30),
        start in arb_tile(W, H),
        dx in -20i32..=20,
        dy in -20i32..=20,
    ) {
        let config = SimConfig::default().with_arena_tiles(W, H);
        let mut world = World::new(&config);
        for tile in &walls {
            world.set_wall(*tile, WallKind::Destructible);
        }
        let mut unit = new_player(&mut world, &config);
        unit.pos = tank_on_tile(&config, start.x, start.y);
        prop_assume!(!is_embedded(&world, &unit.rect()));

        move_unit(
            &world,
            &mut unit,
            Fixed::from_num(dx),
            Fixed::from_num(dy),
            config.epsilon(),
        );
        prop_assert!(!is_embedded(&world, &unit.rect()));
    }

    #[test]
    fn test_countdown_clamps_and_expires_once(
        ticks in 0u32..120,
        scales in prop::collection::vec(0.0f64..2.5, 1..200),
    ) {
        let mut timer = Countdown::from_ticks(ticks);
        let mut expirations = 0;
        for s in scales {
            if timer.tick(TimeScale::from_fixed(Fixed::from_num(s))) {
                expirations += 1;
            }
            prop_assert!(timer.remaining() >= Fixed::ZERO);
        }
        prop_assert!(expirations <= 1);
        if ticks == 0 {
            prop_assert_eq!(expirations, 0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn test_replay_is_bit_identical(seed in arb_seed(), script in arb_input_script(90)) {
        let run = || {
            let mut sim = Simulation::new(SimConfig::default(), LevelSet::builtin(), seed);
            for input in &script {
                sim.tick_scaled(*input, TimeScale::ONE);
            }
            sim.state_hash()
        };
        prop_assert_eq!(run(), run());
    }
}
