//! Scripted player for headless soak runs.
//!
//! The autopilot lines up with the nearest enemy along the dominant axis
//! and shoots once aligned. It is deliberately simple: the point is to keep
//! projectiles, deaths and level clears flowing through the core, not to
//! play well.

use arena_core::components::{ControlInput, Direction, Unit};
use arena_core::math::Fixed;
use arena_core::world::World;

/// Choose this tick's input for the player in `world`.
#[must_use]
pub fn autopilot_input(world: &World) -> ControlInput {
    let Some(player) = world.player.as_ref() else {
        return ControlInput::IDLE;
    };
    let Some(target) = nearest_enemy(world, player) else {
        return ControlInput::IDLE;
    };

    let from = player.center();
    let to = target.center();
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let facing = Direction::toward(dx, dy);

    // Offset on the axis the shot does not travel along.
    let (offset, align_dir) = if facing.is_vertical() {
        (dx, Direction::toward(dx, Fixed::ZERO))
    } else {
        (dy, Direction::toward(Fixed::ZERO, dy))
    };
    let tolerance = player.size / 4;

    if offset.abs() <= tolerance {
        if player.facing == facing {
            ControlInput::toward(facing).firing()
        } else {
            ControlInput::toward(facing)
        }
    } else {
        ControlInput::toward(align_dir)
    }
}

fn nearest_enemy<'a>(world: &'a World, player: &Unit) -> Option<&'a Unit> {
    let center = player.center();
    world
        .enemies
        .iter()
        .min_by_key(|e| (e.center().distance_squared(center), e.id))
}
