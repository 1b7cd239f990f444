//! Level-set and configuration loading for headless runs.
//!
//! Level sets and simulation configs are RON files. The runner refuses to
//! start on a file that is missing or malformed; only the core's own
//! in-game fallback ([`LevelSet::load_or_builtin`]) swallows errors.

use std::path::{Path, PathBuf};

use arena_core::config::SimConfig;
use arena_core::level::{LayoutIssue, LevelSet};
use serde::Serialize;
use thiserror::Error;

/// Error type for loading data files.
#[derive(Error, Debug)]
pub enum LevelSetError {
    /// File not found.
    #[error("Data file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read data file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse data file: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The file parsed but holds no layouts.
    #[error("Level set {0} contains no layouts")]
    Empty(String),
}

/// Directory holding the bundled data files.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Path of the bundled level set.
#[must_use]
pub fn default_levels_path() -> PathBuf {
    default_data_dir().join("levels.ron")
}

/// Load a level set from a RON file.
pub fn load_level_set(path: &Path) -> Result<LevelSet, LevelSetError> {
    if !path.exists() {
        return Err(LevelSetError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let set: LevelSet = ron::from_str(&content)?;
    if set.is_empty() {
        return Err(LevelSetError::Empty(path.display().to_string()));
    }
    tracing::info!(path = %path.display(), levels = set.len(), "Loaded level set");
    Ok(set)
}

/// Load a simulation config from a RON file, or defaults when `path` is
/// `None`.
pub fn load_config(path: Option<&Path>) -> Result<SimConfig, LevelSetError> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    if !path.exists() {
        return Err(LevelSetError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let config: SimConfig = ron::from_str(&content)?;
    tracing::info!(path = %path.display(), "Loaded simulation config");
    Ok(config)
}

/// Diagnostics for one layout.
#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    /// Level index.
    pub index: usize,
    /// Layout name.
    pub name: String,
    /// Walls after decoding.
    pub walls: usize,
    /// Cover tiles after decoding.
    pub cover: usize,
    /// Whether a base was decoded.
    pub has_base: bool,
    /// Problems found.
    pub issues: Vec<String>,
}

impl LevelReport {
    /// True when no problems were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check every layout in `set` against the arena in `config`.
#[must_use]
pub fn validate_level_set(set: &LevelSet, config: &SimConfig) -> Vec<LevelReport> {
    set.levels
        .iter()
        .enumerate()
        .map(|(index, layout)| {
            let decoded = layout.decode(config);
            let issues: Vec<String> = layout
                .validate(config)
                .iter()
                .map(LayoutIssue::to_string)
                .collect();
            if !issues.is_empty() {
                tracing::warn!(index, name = %layout.name, issues = issues.len(), "Layout has issues");
            }
            LevelReport {
                index,
                name: layout.name.clone(),
                walls: decoded.walls.len(),
                cover: decoded.cover.len(),
                has_base: decoded.base.is_some(),
                issues,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bundled_levels_load_and_validate() {
        let set = load_level_set(&default_levels_path()).unwrap();
        assert_eq!(set.len(), 10);

        let reports = validate_level_set(&set, &SimConfig::default());
        for report in &reports {
            assert!(report.is_clean(), "{}: {:?}", report.name, report.issues);
            assert!(report.has_base);
        }
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = load_level_set(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, LevelSetError::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(levels: [ (rows: [[0, 1], oops]) ])").unwrap();
        let err = load_level_set(file.path()).unwrap_err();
        assert!(matches!(err, LevelSetError::ParseError(_)));
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(levels: [])").unwrap();
        let err = load_level_set(file.path()).unwrap_err();
        assert!(matches!(err, LevelSetError::Empty(_)));
    }

    #[test]
    fn test_validate_reports_shape_problems() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(levels: [ (name: \"tiny\", rows: [[0, 9], [4]]) ])").unwrap();
        let set = load_level_set(file.path()).unwrap();
        let reports = validate_level_set(&set, &SimConfig::default());

        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_clean());
        assert!(reports[0].has_base);
        assert!(reports[0].issues.iter().any(|i| i.contains("unknown tile code 9")));
    }

    #[test]
    fn test_config_defaults_and_partial_override() {
        assert_eq!(load_config(None).unwrap(), SimConfig::default());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(sweep_interval: 15)").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.sweep_interval, 15);
        assert_eq!(config.tank_speed, 2.5);
    }
}
