//! Soak the bundled level set with the autopilot.

use arena_core::collision::is_embedded;
use arena_core::config::SimConfig;
use arena_headless::levels::{default_levels_path, load_level_set};
use arena_headless::runner::{HeadlessRunner, RunConfig};

#[test]
fn test_every_bundled_level_spawns_a_clean_wave() {
    let config = SimConfig::default();
    let levels = load_level_set(&default_levels_path()).unwrap();

    for index in 0..levels.len() as u32 {
        let run = RunConfig {
            seed: u64::from(index),
            start_level: index,
            ..RunConfig::default()
        };
        let runner = HeadlessRunner::new(config.clone(), levels.clone(), run);
        let world = runner.simulation().world();

        assert_eq!(world.level, index);
        assert!(!world.enemies.is_empty(), "level {index} has no enemies");
        assert!(world.base().is_some(), "level {index} has no base");
        for unit in world.units() {
            assert!(
                !is_embedded(world, &unit.rect()),
                "unit {} embedded on level {index}",
                unit.id
            );
        }
    }
}

#[test]
fn test_bundled_levels_survive_a_soak() {
    let levels = load_level_set(&default_levels_path()).unwrap();
    for seed in [1, 2] {
        let run = RunConfig {
            seed,
            max_ticks: 3_000,
            ..RunConfig::default()
        };
        let summary = HeadlessRunner::new(SimConfig::default(), levels.clone(), run)
            .run()
            .unwrap();
        assert!(summary.ticks > 0);
        assert!(summary.ticks <= 3_000);
    }
}
