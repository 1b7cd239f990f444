//! Level layouts.
//!
//! A layout is a grid of tile codes supplied from outside the core:
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | empty |
//! | 1, 3 | destructible wall |
//! | 2 | indestructible wall |
//! | 4 | base |
//! | 5 | decorative cover (passable) |
//!
//! Layouts are decoded once at level load. Anything malformed degrades
//! instead of failing: long rows are truncated, short rows padded, unknown
//! codes read as empty, and an empty level set falls back to a built-in
//! layout.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::WallKind;
use crate::config::SimConfig;
use crate::error::{ArenaError, Result};
use crate::pathfinding::TilePos;

/// Empty tile.
pub const TILE_EMPTY: u8 = 0;
/// Destructible wall.
pub const TILE_BRICK: u8 = 1;
/// Indestructible wall.
pub const TILE_STEEL: u8 = 2;
/// Destructible wall (alternate code used around the base).
pub const TILE_BRICK_ALT: u8 = 3;
/// Base.
pub const TILE_BASE: u8 = 4;
/// Decorative cover.
pub const TILE_COVER: u8 = 5;

/// Built-in fallback layout (20x15).
const DEFAULT_ROWS: [[u8; 20]; 15] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 0],
    [0, 0, 0, 1, 1, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 1, 0, 2, 2, 0, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 2, 2, 0, 0, 0, 1, 1, 0, 0, 0, 0],
    [1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 0, 0, 1, 2, 2, 0, 0, 2, 2, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0],
    [0, 0, 1, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0],
    [1, 1, 1, 0, 1, 1, 1, 0, 0, 3, 3, 3, 3, 0, 0, 1, 1, 1, 0, 1],
    [2, 2, 1, 0, 0, 0, 0, 3, 1, 1, 1, 1, 3, 0, 0, 0, 0, 1, 2, 2],
    [0, 0, 0, 0, 0, 0, 0, 3, 1, 4, 1, 3, 3, 0, 0, 0, 0, 0, 0, 0],
];

/// One level's tile-code grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Rows of tile codes, top to bottom.
    pub rows: Vec<Vec<u8>>,
}

impl Default for LevelLayout {
    fn default() -> Self {
        Self {
            name: "Default".into(),
            rows: DEFAULT_ROWS.iter().map(|row| row.to_vec()).collect(),
        }
    }
}

/// Problems found by [`LevelLayout::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutIssue {
    /// Row count differs from the arena height.
    RowCount {
        /// Rows present.
        found: usize,
        /// Rows expected.
        expected: usize,
    },
    /// A row is longer or shorter than the arena width.
    RowLength {
        /// Row index.
        row: usize,
        /// Columns present.
        found: usize,
        /// Columns expected.
        expected: usize,
    },
    /// A tile code outside 0..=5.
    UnknownCode {
        /// Offending tile.
        tile: TilePos,
        /// Code found.
        code: u8,
    },
    /// No base tile.
    MissingBase,
    /// More than one base tile; only the first is used.
    ExtraBase(TilePos),
}

impl std::fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowCount { found, expected } => {
                write!(f, "{found} rows, expected {expected}")
            }
            Self::RowLength {
                row,
                found,
                expected,
            } => write!(f, "row {row} has {found} columns, expected {expected}"),
            Self::UnknownCode { tile, code } => {
                write!(f, "unknown tile code {code} at ({}, {})", tile.x, tile.y)
            }
            Self::MissingBase => write!(f, "no base tile"),
            Self::ExtraBase(tile) => write!(f, "extra base at ({}, {}) ignored", tile.x, tile.y),
        }
    }
}

/// Walls, cover and base decoded from a layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedLevel {
    /// Solid tiles.
    pub walls: BTreeMap<TilePos, WallKind>,
    /// Passable cover tiles.
    pub cover: BTreeSet<TilePos>,
    /// Base tile.
    pub base: Option<TilePos>,
}

impl LevelLayout {
    /// Wrap a grid of codes.
    #[must_use]
    pub fn new(name: impl Into<String>, rows: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Code at a tile, reading missing cells as empty.
    #[must_use]
    pub fn code_at(&self, x: usize, y: usize) -> u8 {
        self.rows
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(TILE_EMPTY)
    }

    /// Decode the layout into arena terrain, reading only the arena's
    /// `width x height` window.
    #[must_use]
    pub fn decode(&self, config: &SimConfig) -> DecodedLevel {
        let width = config.arena.width_tiles as usize;
        let height = config.arena.height_tiles as usize;
        let mut decoded = DecodedLevel::default();

        for y in 0..height {
            for x in 0..width {
                let tile = TilePos::new(x as i32, y as i32);
                match self.code_at(x, y) {
                    TILE_EMPTY => {}
                    TILE_BRICK | TILE_BRICK_ALT => {
                        decoded.walls.insert(tile, WallKind::Destructible);
                    }
                    TILE_STEEL => {
                        decoded.walls.insert(tile, WallKind::Indestructible);
                    }
                    TILE_BASE => {
                        if decoded.base.is_none() {
                            decoded.base = Some(tile);
                        }
                    }
                    TILE_COVER => {
                        decoded.cover.insert(tile);
                    }
                    code => {
                        tracing::warn!(x, y, code, "Unknown tile code treated as empty");
                    }
                }
            }
        }

        decoded
    }

    /// Report shape and content problems.
    #[must_use]
    pub fn validate(&self, config: &SimConfig) -> Vec<LayoutIssue> {
        let width = config.arena.width_tiles as usize;
        let height = config.arena.height_tiles as usize;
        let mut issues = Vec::new();

        if self.rows.len() != height {
            issues.push(LayoutIssue::RowCount {
                found: self.rows.len(),
                expected: height,
            });
        }

        let mut base_seen = false;
        for (y, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                issues.push(LayoutIssue::RowLength {
                    row: y,
                    found: row.len(),
                    expected: width,
                });
            }
            for (x, &code) in row.iter().enumerate() {
                let tile = TilePos::new(x as i32, y as i32);
                if code > TILE_COVER {
                    issues.push(LayoutIssue::UnknownCode { tile, code });
                } else if code == TILE_BASE {
                    if base_seen {
                        issues.push(LayoutIssue::ExtraBase(tile));
                    }
                    base_seen = true;
                }
            }
        }

        if !base_seen {
            issues.push(LayoutIssue::MissingBase);
        }
        issues
    }

    /// Randomised copy of this layout for levels beyond the authored table.
    ///
    /// Interior empty tiles sprout obstacles with a probability that grows
    /// with `factor`; a few destructible walls and cover tiles are cleared.
    /// The bottom rows around the base are left untouched.
    #[must_use]
    pub fn variation<R: Rng>(&self, factor: u32, config: &SimConfig, rng: &mut R) -> Self {
        let width = config.arena.width_tiles as usize;
        let height = config.arena.height_tiles as usize;
        let add_chance = 0.1 * (factor as f32 * 0.2).min(0.4);

        let mut rows: Vec<Vec<u8>> = (0..height)
            .map(|y| (0..width).map(|x| self.code_at(x, y)).collect())
            .collect();

        for row in rows.iter_mut().take(height.saturating_sub(3)).skip(1) {
            for code in row.iter_mut().take(width.saturating_sub(1)).skip(1) {
                if *code == TILE_EMPTY && rng.gen::<f32>() < add_chance {
                    *code = if rng.gen::<f32>() < 0.7 {
                        TILE_BRICK
                    } else if rng.gen::<f32>() < 0.5 {
                        TILE_STEEL
                    } else {
                        TILE_COVER
                    };
                } else if (*code == TILE_BRICK || *code == TILE_COVER) && rng.gen::<f32>() < 0.05 {
                    *code = TILE_EMPTY;
                }
            }
        }

        Self {
            name: format!("{} (variation {factor})", self.name),
            rows,
        }
    }
}

/// Ordered table of authored layouts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelSet {
    /// Layouts, level 0 first.
    pub levels: Vec<LevelLayout>,
}

impl LevelSet {
    /// Set containing only the built-in layout.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            levels: vec![LevelLayout::default()],
        }
    }

    /// Parse a level set from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ArenaError::DataParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Load a level set from a RON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ArenaError::LevelLoad(format!("{}: {e}", path.display())))?;
        ron::from_str(&text).map_err(|e| ArenaError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load a level set, falling back to the built-in layout on any error.
    #[must_use]
    pub fn load_or_builtin(path: &Path) -> Self {
        match Self::load(path) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(error = %e, "Level set unavailable, using built-in layout");
                Self::builtin()
            }
        }
    }

    /// Number of authored layouts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True when no layouts are authored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Layout for a level index.
    ///
    /// Indices past the table derive a variation of an authored layout. An
    /// empty table yields the built-in layout.
    #[must_use]
    pub fn layout_for<R: Rng>(&self, index: u32, config: &SimConfig, rng: &mut R) -> LevelLayout {
        let len = self.levels.len();
        if len == 0 {
            tracing::warn!(level = index, "Empty level set, using built-in layout");
            return LevelLayout::default();
        }

        let index = index as usize;
        if let Some(layout) = self.levels.get(index) {
            return layout.clone();
        }

        let past = index - len;
        let factor = (past + 1) as u32;
        self.levels[past % len].variation(factor, config, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_layout_decodes_base_and_walls() {
        let config = SimConfig::default();
        let decoded = LevelLayout::default().decode(&config);

        assert_eq!(decoded.base, Some(TilePos::new(9, 14)));
        assert_eq!(
            decoded.walls.get(&TilePos::new(9, 3)),
            Some(&WallKind::Indestructible)
        );
        assert_eq!(
            decoded.walls.get(&TilePos::new(9, 12)),
            Some(&WallKind::Destructible)
        );
        assert!(decoded.cover.is_empty());
        assert!(!decoded.walls.contains_key(&TilePos::new(9, 14)));
    }

    #[test]
    fn test_long_rows_are_truncated_and_short_rows_padded() {
        let config = SimConfig::default().with_arena_tiles(3, 2);
        let layout = LevelLayout::new("odd", vec![vec![2, 5, 0, 1, 1], vec![4]]);
        let decoded = layout.decode(&config);

        assert_eq!(decoded.walls.len(), 1);
        assert!(decoded.cover.contains(&TilePos::new(1, 0)));
        assert_eq!(decoded.base, Some(TilePos::new(0, 1)));
    }

    #[test]
    fn test_unknown_codes_decode_as_empty() {
        let config = SimConfig::default().with_arena_tiles(2, 1);
        let decoded = LevelLayout::new("bad", vec![vec![9, 2]]).decode(&config);
        assert_eq!(decoded.walls.len(), 1);
        assert!(decoded.walls.contains_key(&TilePos::new(1, 0)));
    }

    #[test]
    fn test_validate_reports_issues() {
        let config = SimConfig::default().with_arena_tiles(3, 2);
        let layout = LevelLayout::new("bad", vec![vec![0, 7, 0, 0], vec![4, 4, 0]]);
        let issues = layout.validate(&config);

        assert!(issues.contains(&LayoutIssue::RowLength {
            row: 0,
            found: 4,
            expected: 3
        }));
        assert!(issues.contains(&LayoutIssue::UnknownCode {
            tile: TilePos::new(1, 0),
            code: 7
        }));
        assert!(issues.contains(&LayoutIssue::ExtraBase(TilePos::new(1, 1))));
        assert!(LevelLayout::default().validate(&SimConfig::default()).is_empty());
    }

    #[test]
    fn test_layout_for_past_table_is_seeded_variation() {
        let config = SimConfig::default();
        let set = LevelSet::builtin();

        let a = set.layout_for(3, &config, &mut SmallRng::seed_from_u64(7));
        let b = set.layout_for(3, &config, &mut SmallRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.rows.len(), 15);
        // Bottom rows around the base are never mutated.
        assert_eq!(a.rows[14], LevelLayout::default().rows[14]);
        assert_eq!(a.decode(&config).base, Some(TilePos::new(9, 14)));
    }

    #[test]
    fn test_empty_set_falls_back_to_builtin() {
        let config = SimConfig::default();
        let set = LevelSet::default();
        let layout = set.layout_for(0, &config, &mut SmallRng::seed_from_u64(1));
        assert_eq!(layout, LevelLayout::default());
    }

    #[test]
    fn test_level_set_from_ron() {
        let set = LevelSet::from_ron_str(
            "(levels: [(name: \"tiny\", rows: [[0, 2], [4, 0]])])",
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.levels[0].code_at(1, 0), TILE_STEEL);
        assert!(LevelSet::from_ron_str("(levels: 3)").is_err());
    }
}
