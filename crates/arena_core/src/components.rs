//! Arena data model.
//!
//! Player and enemy tanks share one [`Unit`] struct; the differences live in
//! the [`UnitKind`] tag. Ownership of projectiles and archetype identity are
//! plain enum tags compared by value.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Rect, Vec2Fixed};
use crate::pathfinding::TilePos;
use crate::timer::Countdown;

/// Unique identifier for units and projectiles within one level.
pub type UnitId = u32;

/// One of the four cardinal facings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Towards negative y.
    #[default]
    Up,
    /// Towards positive x.
    Right,
    /// Towards positive y.
    Down,
    /// Towards negative x.
    Left,
}

impl Direction {
    /// Clockwise order, starting at [`Direction::Up`].
    pub const CLOCKWISE: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Unit step as `(dx, dy)`.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    /// The reverse facing.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }

    /// True for [`Direction::Up`] and [`Direction::Down`].
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Position in [`Direction::CLOCKWISE`].
    #[must_use]
    pub const fn clockwise_index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// Facing after `steps` quarter turns clockwise.
    #[must_use]
    pub const fn rotated(self, steps: usize) -> Self {
        Self::CLOCKWISE[(self.clockwise_index() + steps) % 4]
    }

    /// Facing along the dominant axis of `(dx, dy)`.
    ///
    /// Horizontal wins only when strictly larger; ties face vertically.
    #[must_use]
    pub fn toward(dx: Fixed, dy: Fixed) -> Self {
        if dx.abs() > dy.abs() {
            if dx > Fixed::ZERO {
                Self::Right
            } else {
                Self::Left
            }
        } else if dy > Fixed::ZERO {
            Self::Down
        } else {
            Self::Up
        }
    }
}

/// Who fired a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    /// The player tank.
    Player,
    /// Any enemy tank.
    Enemy,
}

/// Enemy archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchetypeKind {
    /// Standard enemy.
    Normal,
    /// More health, slower.
    Tough,
    /// Fast and quick-firing.
    Elite,
    /// Oversized final-level enemy.
    Boss,
}

/// Enemy temperament, rolled once at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    /// Chases the player, flanks, always takes the shot.
    Aggressive,
    /// Goes for the base, lays ambushes.
    Strategic,
    /// Plain seeker.
    Defensive,
}

/// Role inside a coordinated attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamRole {
    /// Charges the player.
    Leader,
    /// Keeps a distance band and fires.
    Support,
    /// Swings around the player's side.
    Scout,
}

impl TeamRole {
    /// Role derived from a group id.
    #[must_use]
    pub const fn from_group(group_id: u8) -> Self {
        match group_id % 3 {
            0 => Self::Leader,
            1 => Self::Support,
            _ => Self::Scout,
        }
    }
}

/// Which side of the player a flanker aims for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlankSide {
    /// Towards negative coordinates.
    Near,
    /// Towards positive coordinates.
    Far,
}

impl FlankSide {
    /// `-1` or `1`.
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Near => -1,
            Self::Far => 1,
        }
    }
}

/// What an enemy is currently steering for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    /// The player tank.
    Player,
    /// The base.
    Base,
    /// A fixed point (patrol fallback).
    Point(Vec2Fixed),
}

/// Behavioural state of an enemy. Exactly one is active at a time, and
/// each variant carries its own timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    /// Default decision cycle.
    Seeking,
    /// Perpendicular dodge after being stuck.
    Maneuvering {
        /// Ticks left.
        timer: Countdown,
    },
    /// Fleeing from the player on low health.
    Retreating {
        /// Ticks left.
        timer: Countdown,
    },
    /// Holding position until the player closes in.
    Ambushing {
        /// Ticks spent waiting.
        #[serde(with = "fixed_serde")]
        waited: Fixed,
    },
    /// Heading for a point beside the player.
    Flanking {
        /// Ticks left.
        timer: Countdown,
    },
    /// Group attack; behaviour depends on [`TeamRole`].
    CoordinatedAttack {
        /// Ticks left.
        timer: Countdown,
    },
    /// Breaking out of an enclosure.
    Escaping {
        /// Ticks left.
        timer: Countdown,
        /// Open spot being steered for, if one was found.
        target: Option<Vec2Fixed>,
    },
}

impl AiState {
    /// Short name for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Seeking => "seeking",
            Self::Maneuvering { .. } => "maneuvering",
            Self::Retreating { .. } => "retreating",
            Self::Ambushing { .. } => "ambushing",
            Self::Flanking { .. } => "flanking",
            Self::CoordinatedAttack { .. } => "coordinated_attack",
            Self::Escaping { .. } => "escaping",
        }
    }
}

/// Enemy-only decision state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyBrain {
    /// Active behaviour.
    pub state: AiState,
    /// Temperament.
    pub personality: Personality,
    /// Role in group attacks.
    pub role: TeamRole,
    /// Group id the role was derived from.
    pub group_id: u8,
    /// Preferred flank side.
    pub flank_side: FlankSide,
    /// Ticks until the next seeking decision.
    pub decision_timer: Countdown,
    /// Ticks until the next coordination check.
    pub coordination_timer: Countdown,
    /// Consecutive ticks without displacement.
    pub stuck_ticks: u32,
    /// Current target.
    pub target: Option<TargetRef>,
    /// Fallback waypoints.
    pub patrol_points: Vec<Vec2Fixed>,
    /// Next patrol waypoint.
    pub patrol_index: usize,
}

impl EnemyBrain {
    /// Fresh brain in the seeking state with an immediate first decision.
    #[must_use]
    pub fn new(personality: Personality, group_id: u8, flank_side: FlankSide) -> Self {
        Self {
            state: AiState::Seeking,
            personality,
            role: TeamRole::from_group(group_id),
            group_id,
            flank_side,
            decision_timer: Countdown::ZERO,
            coordination_timer: Countdown::ZERO,
            stuck_ticks: 0,
            target: None,
            patrol_points: Vec::new(),
            patrol_index: 0,
        }
    }
}

/// Player weapon mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weapon {
    /// One projectile.
    #[default]
    Normal,
    /// Three parallel projectiles.
    Shotgun,
    /// One piercing projectile.
    Laser,
}

/// Player-only state: timed effects and weapon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerState {
    /// Respawn grace period.
    pub grace: Countdown,
    /// Star pickup invulnerability.
    pub star: Countdown,
    /// Armor; absorbs one hit while active.
    pub armor: Countdown,
    /// Faster reload while active.
    pub rapid_fire: Countdown,
    /// Current weapon.
    pub weapon: Weapon,
    /// Ticks until the weapon reverts to normal.
    pub weapon_timer: Countdown,
}

impl PlayerState {
    /// True while damage is ignored entirely.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.grace.is_active() || self.star.is_active()
    }
}

/// Tagged unit variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// The player tank.
    Player(PlayerState),
    /// An AI tank.
    Enemy {
        /// Archetype.
        archetype: ArchetypeKind,
        /// Decision state.
        brain: EnemyBrain,
    },
}

/// A tank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Player or enemy.
    pub kind: UnitKind,
    /// Top-left corner.
    pub pos: Vec2Fixed,
    /// Box side.
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
    /// Facing.
    pub facing: Direction,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Speed before difficulty scaling.
    #[serde(with = "fixed_serde")]
    pub base_speed: Fixed,
    /// Current speed in world units per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Ticks until the next shot is allowed.
    pub fire_cooldown: Countdown,
}

impl Unit {
    /// Bounding box.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, self.size)
    }

    /// Centre of the bounding box.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        self.rect().center()
    }

    /// Owner tag for projectiles this unit fires.
    #[must_use]
    pub const fn owner(&self) -> OwnerKind {
        match self.kind {
            UnitKind::Player(_) => OwnerKind::Player,
            UnitKind::Enemy { .. } => OwnerKind::Enemy,
        }
    }

    /// Archetype, for enemies.
    #[must_use]
    pub const fn archetype(&self) -> Option<ArchetypeKind> {
        match self.kind {
            UnitKind::Enemy { archetype, .. } => Some(archetype),
            UnitKind::Player(_) => None,
        }
    }

    /// Decision state, for enemies.
    #[must_use]
    pub const fn brain(&self) -> Option<&EnemyBrain> {
        match &self.kind {
            UnitKind::Enemy { brain, .. } => Some(brain),
            UnitKind::Player(_) => None,
        }
    }

    /// Mutable decision state, for enemies.
    pub fn brain_mut(&mut self) -> Option<&mut EnemyBrain> {
        match &mut self.kind {
            UnitKind::Enemy { brain, .. } => Some(brain),
            UnitKind::Player(_) => None,
        }
    }

    /// Player state, for the player.
    #[must_use]
    pub const fn player_state(&self) -> Option<&PlayerState> {
        match &self.kind {
            UnitKind::Player(state) => Some(state),
            UnitKind::Enemy { .. } => None,
        }
    }

    /// Mutable player state, for the player.
    pub fn player_state_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            UnitKind::Player(state) => Some(state),
            UnitKind::Enemy { .. } => None,
        }
    }
}

/// Wall material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallKind {
    /// Removed by any projectile hit.
    Destructible,
    /// Absorbs projectiles forever.
    Indestructible,
}

/// The structure the player defends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Base {
    /// Tile it occupies.
    pub tile: TilePos,
    /// Set once hit.
    pub destroyed: bool,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Identifier.
    pub id: UnitId,
    /// Top-left corner.
    pub pos: Vec2Fixed,
    /// Travel direction.
    pub direction: Direction,
    /// Player or enemy fire.
    pub owner: OwnerKind,
    /// Unit that fired it.
    pub shooter: UnitId,
    /// Keeps flying after hitting a unit.
    pub piercing: bool,
    /// Units already damaged by this projectile.
    pub hit_list: Vec<UnitId>,
    /// Box side.
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
    /// World units per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage per hit.
    pub damage: u32,
}

impl Projectile {
    /// Bounding box.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, self.size)
    }
}

/// Pickup kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    /// Faster reload.
    RapidFire,
    /// One-hit shield.
    Armor,
    /// One more life.
    ExtraLife,
    /// Temporary invulnerability.
    Invincible,
    /// Three-way fire.
    Shotgun,
    /// Piercing fire.
    Laser,
}

impl PickupKind {
    /// All kinds, in drop-table order.
    pub const ALL: [Self; 6] = [
        Self::RapidFire,
        Self::Armor,
        Self::ExtraLife,
        Self::Invincible,
        Self::Shotgun,
        Self::Laser,
    ];
}

/// A pickup lying in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pickup {
    /// Kind.
    pub kind: PickupKind,
    /// Top-left corner.
    pub pos: Vec2Fixed,
    /// Box side.
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
    /// Ticks until it disappears.
    pub lifetime: Countdown,
}

impl Pickup {
    /// Bounding box.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, self.size)
    }
}

/// One tick of control input: a pressed flag per logical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ControlInput {
    /// Move up.
    pub up: bool,
    /// Move down.
    pub down: bool,
    /// Move left.
    pub left: bool,
    /// Move right.
    pub right: bool,
    /// Fire.
    pub fire: bool,
}

impl ControlInput {
    /// No buttons pressed.
    pub const IDLE: Self = Self {
        up: false,
        down: false,
        left: false,
        right: false,
        fire: false,
    };

    /// Press the button for one direction.
    #[must_use]
    pub const fn toward(direction: Direction) -> Self {
        let mut input = Self::IDLE;
        match direction {
            Direction::Up => input.up = true,
            Direction::Right => input.right = true,
            Direction::Down => input.down = true,
            Direction::Left => input.left = true,
        }
        input
    }

    /// Same input with fire pressed.
    #[must_use]
    pub const fn firing(mut self) -> Self {
        self.fire = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_toward_prefers_vertical_on_ties() {
        let f = Fixed::from_num;
        assert_eq!(Direction::toward(f(5), f(2)), Direction::Right);
        assert_eq!(Direction::toward(f(-5), f(2)), Direction::Left);
        assert_eq!(Direction::toward(f(3), f(3)), Direction::Down);
        assert_eq!(Direction::toward(f(3), f(-3)), Direction::Up);
        assert_eq!(Direction::toward(Fixed::ZERO, Fixed::ZERO), Direction::Up);
    }

    #[test]
    fn test_direction_rotation() {
        assert_eq!(Direction::Up.rotated(1), Direction::Right);
        assert_eq!(Direction::Left.rotated(1), Direction::Up);
        assert_eq!(Direction::Down.rotated(4), Direction::Down);
        assert_eq!(Direction::Right.opposite(), Direction::Left);
    }

    #[test]
    fn test_team_role_from_group() {
        assert_eq!(TeamRole::from_group(0), TeamRole::Leader);
        assert_eq!(TeamRole::from_group(1), TeamRole::Support);
        assert_eq!(TeamRole::from_group(2), TeamRole::Scout);
        assert_eq!(TeamRole::from_group(5), TeamRole::Scout);
    }

    #[test]
    fn test_player_invulnerability_sources() {
        let mut state = PlayerState::default();
        assert!(!state.is_invulnerable());
        state.star.set(10);
        assert!(state.is_invulnerable());
        state.star.clear();
        state.grace.set(1);
        assert!(state.is_invulnerable());
        // Armor alone does not make the player invulnerable.
        state.grace.clear();
        state.armor.set(100);
        assert!(!state.is_invulnerable());
    }
}
