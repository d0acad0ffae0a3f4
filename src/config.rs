//! Board configuration.
//!
//! The engine is reused across board variants whose status taxonomies and
//! priority scales differ, so neither is a hardcoded enum: columns, the
//! vocabulary and the priority scale all arrive through configuration, with
//! a built-in default variant matching the main sales board.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vocab::{StatusVocabulary, UiStatus};

/// Errors raised while loading a board configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config declares no columns")]
    NoColumns,
}

/// Declaration of one board column.
///
/// A column's identity is its UI status value; everything else is display
/// metadata. The WIP limit is advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub status: UiStatus,
    pub title: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub wip_limit: Option<usize>,
}

impl ColumnSpec {
    pub fn new(status: impl Into<UiStatus>, title: impl Into<String>) -> Self {
        ColumnSpec {
            status: status.into(),
            title: title.into(),
            color: String::new(),
            icon: String::new(),
            wip_limit: None,
        }
    }

    pub fn with_wip_limit(mut self, limit: usize) -> Self {
        self.wip_limit = Some(limit);
        self
    }
}

/// An ordered, opaque priority scale, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityScale {
    levels: Vec<String>,
}

impl PriorityScale {
    pub fn new(levels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PriorityScale {
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    /// Rank of a level within the scale, 0 = highest. Unknown levels rank
    /// below everything so they sort last.
    pub fn rank(&self, level: &str) -> usize {
        self.levels
            .iter()
            .position(|l| l == level)
            .unwrap_or(self.levels.len())
    }

    pub fn contains(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }

    /// The scale's mid-point, used when a record carries no priority.
    pub fn default_level(&self) -> &str {
        self.levels
            .get(self.levels.len() / 2)
            .map(String::as_str)
            .unwrap_or("medium")
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }
}

/// Complete configuration for one board variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub columns: Vec<ColumnSpec>,
    pub vocabulary: StatusVocabulary,
    pub priorities: PriorityScale,
}

impl BoardConfig {
    /// Load a variant from a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: BoardConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        if config.columns.is_empty() {
            return Err(ConfigError::NoColumns);
        }
        Ok(config)
    }

    /// The built-in sales board variant.
    pub fn default_board() -> Self {
        BoardConfig {
            columns: vec![
                ColumnSpec::new("backlog", "Backlog"),
                ColumnSpec::new("thisWeek", "This Week"),
                ColumnSpec::new("inProgress", "In Progress").with_wip_limit(5),
                ColumnSpec::new("onHold", "On Hold"),
                ColumnSpec::new("review", "Review").with_wip_limit(3),
                ColumnSpec::new("done", "Done"),
            ],
            vocabulary: StatusVocabulary::default_board(),
            priorities: PriorityScale::new(["highest", "high", "medium", "low", "lowest"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_board_columns_are_all_in_the_vocabulary() {
        let config = BoardConfig::default_board();
        for column in &config.columns {
            assert!(
                config.vocabulary.contains_ui(&column.status),
                "column {} missing from vocabulary",
                column.status
            );
        }
    }

    #[test]
    fn priority_scale_ranks_highest_first_and_unknown_last() {
        let scale = PriorityScale::new(["critical", "high", "medium", "low"]);
        assert_eq!(scale.rank("critical"), 0);
        assert_eq!(scale.rank("low"), 3);
        assert_eq!(scale.rank("nonsense"), 4);
        assert_eq!(scale.default_level(), "medium");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = BoardConfig::default_board();
        let text = serde_json::to_string(&config).unwrap();
        let reread: BoardConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(reread, config);
    }
}
