//! Simulation benchmarks for arena_core.
//!
//! Run with: `cargo bench -p arena_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::collections::BTreeMap;

use arena_core::components::{ControlInput, WallKind};
use arena_core::config::SimConfig;
use arena_core::level::LevelSet;
use arena_core::pathfinding::{find_path, OccupancyGrid, TilePos};
use arena_core::simulation::Simulation;
use arena_core::timer::TimeScale;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// A 20x15 grid with staggered vertical walls that force long detours.
fn maze_grid() -> OccupancyGrid {
    let mut walls = BTreeMap::new();
    for x in (2..20).step_by(3) {
        let gap = if (x / 3) % 2 == 0 { 14 } else { 0 };
        for y in 0..15 {
            if y != gap {
                walls.insert(TilePos::new(x, y), WallKind::Indestructible);
            }
        }
    }
    let mut grid = OccupancyGrid::new(20, 15);
    grid.rebuild(&walls, None);
    grid
}

pub fn pathfinding_benchmark(c: &mut Criterion) {
    let open = OccupancyGrid::new(20, 15);
    let maze = maze_grid();

    c.bench_function("find_path_open", |b| {
        b.iter(|| {
            find_path(
                black_box(&open),
                TilePos::new(0, 0),
                TilePos::new(19, 14),
                150,
            )
        })
    });

    c.bench_function("find_path_maze_budget", |b| {
        b.iter(|| {
            find_path(
                black_box(&maze),
                TilePos::new(0, 7),
                TilePos::new(19, 7),
                150,
            )
        })
    });
}

pub fn tick_benchmark(c: &mut Criterion) {
    c.bench_function("tick_level_0", |b| {
        let mut sim = Simulation::new(SimConfig::default(), LevelSet::builtin(), 42);
        b.iter(|| {
            if !sim.world().is_playing() {
                sim.restart();
            }
            black_box(sim.tick_scaled(ControlInput::IDLE.firing(), TimeScale::ONE))
        })
    });

    c.bench_function("tick_boss_level", |b| {
        let mut sim = Simulation::new(SimConfig::default(), LevelSet::builtin(), 42);
        sim.load_level(9, true);
        b.iter(|| {
            if !sim.world().is_playing() {
                sim.load_level(9, true);
            }
            black_box(sim.tick_scaled(ControlInput::IDLE, TimeScale::ONE))
        })
    });
}

criterion_group!(benches, pathfinding_benchmark, tick_benchmark);
criterion_main!(benches);
