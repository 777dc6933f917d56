//! Core domain model for backlog: owned games, store details and recommendations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "backlog-core";

/// Numeric catalog identifier; the sole join key between owned games and details.
pub type GameId = i64;

/// Manually maintained status flags. Contradictory combinations are accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFlags {
    pub completed: bool,
    pub broken: bool,
    pub endless: bool,
    pub selected: bool,
}

impl StatusFlags {
    /// Candidate for recommendation: carries none of the four flags.
    pub fn is_uncompleted(&self) -> bool {
        !self.completed && !self.broken && !self.endless && !self.selected
    }

    /// Finished for real; broken and endless titles never count as completed.
    pub fn is_completed(&self) -> bool {
        self.completed && !self.broken && !self.endless
    }
}

/// A library entry as the catalog reports it, before status flags are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGame {
    pub game_id: GameId,
    pub name: String,
    pub playtime_2weeks: i64,
    pub playtime_forever: i64,
    pub icon_url: Option<String>,
}

impl CatalogGame {
    pub fn with_status(self, status: StatusFlags) -> OwnedGame {
        OwnedGame {
            game_id: self.game_id,
            name: self.name,
            playtime_2weeks: self.playtime_2weeks,
            playtime_forever: self.playtime_forever,
            icon_url: self.icon_url,
            status,
        }
    }
}

/// Persisted owned-game row. Playtimes are minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedGame {
    pub game_id: GameId,
    pub name: String,
    pub playtime_2weeks: i64,
    pub playtime_forever: i64,
    pub icon_url: Option<String>,
    pub status: StatusFlags,
}

impl OwnedGame {
    pub fn field_value(&self, field: OwnedGameField) -> FieldValue {
        match field {
            OwnedGameField::Name => FieldValue::Text(self.name.clone()),
            OwnedGameField::Playtime2Weeks => FieldValue::Minutes(self.playtime_2weeks),
            OwnedGameField::PlaytimeForever => FieldValue::Minutes(self.playtime_forever),
            OwnedGameField::Completed => FieldValue::Flag(self.status.completed),
            OwnedGameField::Broken => FieldValue::Flag(self.status.broken),
            OwnedGameField::Endless => FieldValue::Flag(self.status.endless),
            OwnedGameField::Selected => FieldValue::Flag(self.status.selected),
        }
    }
}

/// Fields the reconciler compares and updates one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnedGameField {
    Name,
    Playtime2Weeks,
    PlaytimeForever,
    Completed,
    Broken,
    Endless,
    Selected,
}

impl OwnedGameField {
    pub const TRACKED: [OwnedGameField; 7] = [
        OwnedGameField::Name,
        OwnedGameField::Playtime2Weeks,
        OwnedGameField::PlaytimeForever,
        OwnedGameField::Completed,
        OwnedGameField::Broken,
        OwnedGameField::Endless,
        OwnedGameField::Selected,
    ];

    /// Column name in the `owned_games` table.
    pub fn column(self) -> &'static str {
        match self {
            OwnedGameField::Name => "name",
            OwnedGameField::Playtime2Weeks => "playtime_2weeks",
            OwnedGameField::PlaytimeForever => "playtime_forever",
            OwnedGameField::Completed => "completed",
            OwnedGameField::Broken => "broken",
            OwnedGameField::Endless => "endless",
            OwnedGameField::Selected => "selected",
        }
    }
}

impl fmt::Display for OwnedGameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Minutes(i64),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(v) => write!(f, "{v:?}"),
            FieldValue::Minutes(v) => write!(f, "{v}"),
            FieldValue::Flag(v) => write!(f, "{v}"),
        }
    }
}

/// A single-field write: set `field` to `value` on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: OwnedGameField,
    pub value: FieldValue,
}

/// Store metadata for one title. Created once, never updated.
///
/// Every optional attribute is `None` when the upstream payload omits it;
/// an empty genre list is also `None`, never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameDetail {
    pub game_id: GameId,
    pub name: Option<String>,
    /// Comma-joined genre labels, e.g. `"Action, Indie"`.
    pub genres: Option<String>,
    pub controller_support: Option<String>,
    pub is_free: Option<bool>,
    pub release_date: Option<String>,
    pub windows: Option<bool>,
    pub mac: Option<bool>,
    pub linux: Option<bool>,
    pub metacritic_score: Option<i64>,
    pub metacritic_url: Option<String>,
    pub reviews: Option<String>,
    pub short_description: Option<String>,
    pub about_the_game: Option<String>,
    /// Raw store markup; cleaned before vectorizing.
    pub detailed_description: Option<String>,
    pub header_image: Option<String>,
    pub capsule_image: Option<String>,
    pub capsule_imagev5: Option<String>,
    pub website: Option<String>,
}

impl GameDetail {
    pub fn empty(game_id: GameId) -> Self {
        Self {
            game_id,
            ..Default::default()
        }
    }
}

/// Ephemeral ranking entry; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub game_id: GameId,
    /// Up to five reference titles, most similar first.
    pub recommendations: Vec<GameId>,
    /// Mean similarity over the kept reference subset, in `[0, 1]`; never NaN.
    pub mean_similarity: f64,
}

/// Single-title pick for a library with nothing played recently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeverPlayedPick {
    pub game: OwnedGame,
    pub detail: Option<GameDetail>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

pub fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional variable, falling back to `default` when unset.
pub fn parse_env_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(flags: StatusFlags) -> OwnedGame {
        CatalogGame {
            game_id: 10,
            name: "Counter-Strike".into(),
            playtime_2weeks: 5,
            playtime_forever: 120,
            icon_url: None,
        }
        .with_status(flags)
    }

    #[test]
    fn uncompleted_requires_every_flag_clear() {
        assert!(StatusFlags::default().is_uncompleted());
        let selected = StatusFlags {
            selected: true,
            ..Default::default()
        };
        assert!(!selected.is_uncompleted());
    }

    #[test]
    fn completed_excludes_broken_and_endless() {
        let done = StatusFlags {
            completed: true,
            ..Default::default()
        };
        let done_but_broken = StatusFlags {
            completed: true,
            broken: true,
            ..Default::default()
        };
        assert!(done.is_completed());
        assert!(!done_but_broken.is_completed());
    }

    #[test]
    fn field_value_reads_each_tracked_field() {
        let g = game(StatusFlags {
            endless: true,
            ..Default::default()
        });
        assert_eq!(
            g.field_value(OwnedGameField::Name),
            FieldValue::Text("Counter-Strike".into())
        );
        assert_eq!(
            g.field_value(OwnedGameField::PlaytimeForever),
            FieldValue::Minutes(120)
        );
        assert_eq!(g.field_value(OwnedGameField::Endless), FieldValue::Flag(true));
        assert_eq!(g.field_value(OwnedGameField::Broken), FieldValue::Flag(false));
    }

    #[test]
    fn columns_are_unique() {
        let mut columns = OwnedGameField::TRACKED.map(|f| f.column()).to_vec();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), OwnedGameField::TRACKED.len());
    }
}
