//! Presentation events emitted by a tick.
//!
//! The core never renders or plays sounds. It records what happened in a
//! [`TickEvents`] buffer that the caller drains after each tick.

use serde::{Deserialize, Serialize};

use crate::components::{ArchetypeKind, Direction, OwnerKind, PickupKind, UnitId};
use crate::math::Vec2Fixed;
use crate::pathfinding::TilePos;

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverCause {
    /// A projectile reached the base.
    BaseDestroyed,
    /// The player ran out of lives.
    PlayerDestroyed,
}

/// A discrete thing that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A projectile left a muzzle.
    ProjectileFired {
        /// Firing unit.
        shooter: UnitId,
        /// Player or enemy fire.
        owner: OwnerKind,
        /// Travel direction.
        direction: Direction,
    },
    /// An enemy took damage and survived.
    UnitDamaged {
        /// Damaged unit.
        unit: UnitId,
        /// Health left.
        remaining: u32,
    },
    /// An enemy was destroyed.
    UnitDestroyed {
        /// Destroyed unit.
        unit: UnitId,
        /// Its archetype.
        archetype: ArchetypeKind,
        /// Where it stood.
        pos: Vec2Fixed,
        /// Points awarded.
        points: u32,
    },
    /// A destructible wall was shot away.
    WallDestroyed {
        /// Tile that is now open.
        tile: TilePos,
    },
    /// A destroyed enemy dropped a pickup.
    PickupSpawned {
        /// Pickup kind.
        kind: PickupKind,
    },
    /// The player collected a pickup.
    PickupCollected {
        /// Pickup kind.
        kind: PickupKind,
    },
    /// Armor absorbed an enemy hit.
    ArmorAbsorbed,
    /// The player lost a life.
    LifeLost {
        /// Lives left.
        remaining: u32,
    },
    /// The base was hit.
    BaseDestroyed,
    /// Every enemy on the level is gone.
    LevelCleared {
        /// Level index.
        level: u32,
        /// Bonus awarded.
        bonus: u32,
    },
    /// The simulation ended in failure.
    GameOver {
        /// What ended it.
        cause: GameOverCause,
    },
    /// A unit could not be unstuck and was moved to a safe spot.
    UnitRelocated {
        /// Relocated unit.
        unit: UnitId,
    },
}

/// Events generated during a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Events in the order they happened.
    pub events: Vec<SimEvent>,
}

impl TickEvents {
    /// Record an event.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// True when nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over recorded events.
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    /// Number of events matching a predicate.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Move all events from `other` into this buffer.
    pub fn append(&mut self, other: &mut Self) {
        self.events.append(&mut other.events);
    }
}
