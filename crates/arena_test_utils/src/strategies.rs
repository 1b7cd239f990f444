//! Proptest strategies for simulation inputs.
//!
//! These generate random but reproducible terrain, inputs and seeds for
//! property-based tests.

use std::collections::BTreeSet;

use arena_core::components::ControlInput;
use arena_core::level::{
    LevelLayout, TILE_BASE, TILE_BRICK, TILE_COVER, TILE_EMPTY, TILE_STEEL,
};
use arena_core::pathfinding::TilePos;
use proptest::prelude::*;

/// A tile inside a `width x height` grid.
pub fn arb_tile(width: u32, height: u32) -> impl Strategy<Value = TilePos> {
    (0..width as i32, 0..height as i32).prop_map(|(x, y)| TilePos::new(x, y))
}

/// Up to `max` distinct tiles inside a `width x height` grid.
pub fn arb_tile_set(
    width: u32,
    height: u32,
    max: usize,
) -> impl Strategy<Value = BTreeSet<TilePos>> {
    prop::collection::btree_set(arb_tile(width, height), 0..=max)
}

/// Any combination of pressed buttons.
pub fn arb_control_input() -> impl Strategy<Value = ControlInput> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(up, down, left, right, fire)| ControlInput {
            up,
            down,
            left,
            right,
            fire,
        },
    )
}

/// A short input script.
pub fn arb_input_script(max_len: usize) -> impl Strategy<Value = Vec<ControlInput>> {
    prop::collection::vec(arb_control_input(), 1..=max_len)
}

/// A simulation seed.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// A terrain tile code, weighted toward open ground.
pub fn arb_tile_code() -> impl Strategy<Value = u8> {
    prop_oneof![
        6 => Just(TILE_EMPTY),
        2 => Just(TILE_BRICK),
        1 => Just(TILE_STEEL),
        1 => Just(TILE_COVER),
    ]
}

/// A random `width x height` layout with the base at the bottom centre and
/// the two rows above the base kept open.
pub fn arb_layout(width: u32, height: u32) -> impl Strategy<Value = LevelLayout> {
    let w = width as usize;
    let h = height as usize;
    prop::collection::vec(prop::collection::vec(arb_tile_code(), w), h).prop_map(move |mut rows| {
        for row in rows.iter_mut().skip(h.saturating_sub(3)) {
            row.fill(TILE_EMPTY);
        }
        if let Some(last) = rows.last_mut() {
            last[w / 2] = TILE_BASE;
        }
        LevelLayout::new("generated", rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_arb_layout_has_one_base() {
        let mut runner = TestRunner::deterministic();
        let layout = arb_layout(8, 6)
            .new_tree(&mut runner)
            .unwrap()
            .current();
        let bases = layout
            .rows
            .iter()
            .flatten()
            .filter(|&&c| c == TILE_BASE)
            .count();
        assert_eq!(layout.rows.len(), 6);
        assert_eq!(bases, 1);
        assert_eq!(layout.rows[5][4], TILE_BASE);
    }

    proptest! {
        #[test]
        fn test_arb_tile_in_bounds(tile in arb_tile(7, 5)) {
            prop_assert!(tile.x >= 0 && tile.x < 7);
            prop_assert!(tile.y >= 0 && tile.y < 5);
        }
    }
}
