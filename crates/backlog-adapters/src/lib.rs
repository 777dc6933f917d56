//! Catalog client contract, the Steam Web API implementation, and typed extraction
//! of store detail payloads.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use backlog_core::{
    env_or, parse_env_or, required_env, CatalogGame, ConfigError, GameDetail, GameId,
};
use backlog_storage::{FetchError, HttpClientConfig, HttpFetcher};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CRATE_NAME: &str = "backlog-adapters";

pub const DEFAULT_API_BASE_URL: &str = "http://api.steampowered.com";
pub const DEFAULT_STORE_BASE_URL: &str = "https://store.steampowered.com";
pub const DEFAULT_ICON_BASE_URL: &str =
    "http://media.steampowered.com/steamcommunity/public/images/apps";

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub api_key: String,
    pub user_id: String,
    pub api_base_url: String,
    pub store_base_url: String,
    pub icon_base_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl CatalogConfig {
    pub fn new(api_key: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            user_id: user_id.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            store_base_url: DEFAULT_STORE_BASE_URL.to_string(),
            icon_base_url: DEFAULT_ICON_BASE_URL.to_string(),
            http_timeout_secs: 20,
            user_agent: "backlog/0.1".to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required_env("STEAM_API_KEY")?,
            user_id: required_env("STEAM_USER_ID")?,
            api_base_url: env_or("STEAM_API_BASE_URL", DEFAULT_API_BASE_URL),
            store_base_url: env_or("STEAM_STORE_BASE_URL", DEFAULT_STORE_BASE_URL),
            icon_base_url: env_or("STEAM_ICON_BASE_URL", DEFAULT_ICON_BASE_URL),
            http_timeout_secs: parse_env_or("BACKLOG_HTTP_TIMEOUT_SECS", 20)?,
            user_agent: env_or("BACKLOG_USER_AGENT", "backlog/0.1"),
        })
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] FetchError),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("no games found in the library")]
    EmptyLibrary,
}

/// The two upstream calls everything else depends on, plus the recent-activity view.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Every game the configured user owns. An empty library is an error.
    async fn fetch_owned_games(&self) -> Result<Vec<CatalogGame>, CatalogError>;

    /// Games with playtime in the last two weeks; may be empty.
    async fn fetch_recently_played(&self) -> Result<Vec<CatalogGame>, CatalogError>;

    /// Raw store payload for one title, keyed by the id as a string.
    async fn fetch_app_details(&self, game_id: GameId) -> Result<JsonValue, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct GamesEnvelope {
    #[serde(default)]
    response: Option<GamesBody>,
}

#[derive(Debug, Deserialize)]
struct GamesBody {
    #[serde(default)]
    games: Option<Vec<GameEntry>>,
}

#[derive(Debug, Deserialize)]
struct GameEntry {
    appid: GameId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    playtime_2weeks: Option<i64>,
    #[serde(default)]
    playtime_forever: Option<i64>,
    #[serde(default)]
    img_icon_url: Option<String>,
}

impl GameEntry {
    fn into_catalog_game(self, icon_base_url: &str) -> CatalogGame {
        let icon_url = self
            .img_icon_url
            .filter(|hash| !hash.trim().is_empty())
            .map(|hash| format!("{}/{}/{hash}.jpg", icon_base_url.trim_end_matches('/'), self.appid));
        CatalogGame {
            game_id: self.appid,
            name: self.name.unwrap_or_else(|| "N/A".to_string()),
            playtime_2weeks: self.playtime_2weeks.unwrap_or(0),
            playtime_forever: self.playtime_forever.unwrap_or(0),
            icon_url,
        }
    }
}

/// Decode a `GetOwnedGames`/`GetRecentlyPlayedGames` body.
///
/// `Ok(None)` means the body was well-formed but carried no `response.games`.
pub fn parse_games_response(
    body: &[u8],
    icon_base_url: &str,
) -> Result<Option<Vec<CatalogGame>>, CatalogError> {
    let envelope: GamesEnvelope = serde_json::from_slice(body)
        .map_err(|e| CatalogError::MalformedPayload(format!("games list: {e}")))?;
    Ok(envelope.response.and_then(|r| r.games).map(|games| {
        games
            .into_iter()
            .map(|g| g.into_catalog_game(icon_base_url))
            .collect()
    }))
}

#[derive(Debug, Clone)]
pub struct SteamCatalogClient {
    config: CatalogConfig,
    http: HttpFetcher,
}

impl SteamCatalogClient {
    pub fn new(config: CatalogConfig) -> anyhow::Result<Self> {
        let http = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
        })?;
        Ok(Self { config, http })
    }

    fn owned_games_url(&self) -> String {
        format!(
            "{}/IPlayerService/GetOwnedGames/v0001/?key={}&steamid={}&include_appinfo=1&include_played_free_games=1&format=json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.api_key,
            self.config.user_id
        )
    }

    fn recently_played_url(&self) -> String {
        format!(
            "{}/IPlayerService/GetRecentlyPlayedGames/v0001/?key={}&steamid={}&format=json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.api_key,
            self.config.user_id
        )
    }

    fn app_details_url(&self, game_id: GameId) -> String {
        format!(
            "{}/api/appdetails/?appids={game_id}&key={}",
            self.config.store_base_url.trim_end_matches('/'),
            self.config.api_key
        )
    }
}

#[async_trait]
impl CatalogClient for SteamCatalogClient {
    async fn fetch_owned_games(&self) -> Result<Vec<CatalogGame>, CatalogError> {
        let body = self.http.fetch_bytes(&self.owned_games_url()).await?;
        let games = parse_games_response(&body, &self.config.icon_base_url)?
            .filter(|games| !games.is_empty())
            .ok_or(CatalogError::EmptyLibrary)?;
        info!(games = games.len(), "owned games fetched");
        Ok(games)
    }

    async fn fetch_recently_played(&self) -> Result<Vec<CatalogGame>, CatalogError> {
        let body = self.http.fetch_bytes(&self.recently_played_url()).await?;
        let games = parse_games_response(&body, &self.config.icon_base_url)?.unwrap_or_default();
        info!(games = games.len(), "recently played games fetched");
        Ok(games)
    }

    async fn fetch_app_details(&self, game_id: GameId) -> Result<JsonValue, CatalogError> {
        let body = self.http.fetch_bytes(&self.app_details_url(game_id)).await?;
        serde_json::from_slice(&body)
            .map_err(|e| CatalogError::MalformedPayload(format!("app {game_id} details: {e}")))
    }
}

/// Catalog backed by captured payloads instead of the live API.
///
/// Directory layout for [`FixtureCatalogClient::load_dir`]:
/// `owned_games.json` (a `GetOwnedGames` body), optional `recently_played.json`,
/// and `appdetails/<id>.json` per title. Ids without a payload answer with a 404.
#[derive(Debug, Default)]
pub struct FixtureCatalogClient {
    owned: Vec<CatalogGame>,
    recent: Vec<CatalogGame>,
    details: HashMap<GameId, JsonValue>,
    detail_requests: Mutex<Vec<GameId>>,
}

impl FixtureCatalogClient {
    pub fn new(owned: Vec<CatalogGame>) -> Self {
        Self {
            owned,
            ..Default::default()
        }
    }

    pub fn with_recent(mut self, recent: Vec<CatalogGame>) -> Self {
        self.recent = recent;
        self
    }

    pub fn with_detail(mut self, game_id: GameId, payload: JsonValue) -> Self {
        self.details.insert(game_id, payload);
        self
    }

    pub fn load_dir(dir: impl AsRef<Path>, icon_base_url: &str) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let owned_path = dir.join("owned_games.json");
        let owned = parse_games_response(&read_bytes(&owned_path)?, icon_base_url)
            .with_context(|| format!("parsing {}", owned_path.display()))?
            .unwrap_or_default();

        let recent_path = dir.join("recently_played.json");
        let recent = if recent_path.exists() {
            parse_games_response(&read_bytes(&recent_path)?, icon_base_url)
                .with_context(|| format!("parsing {}", recent_path.display()))?
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut details = HashMap::new();
        let details_dir = dir.join("appdetails");
        if details_dir.is_dir() {
            for entry in fs::read_dir(&details_dir)
                .with_context(|| format!("reading {}", details_dir.display()))?
            {
                let path = entry?.path();
                let Some(game_id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<GameId>().ok())
                else {
                    continue;
                };
                let payload = serde_json::from_slice(&read_bytes(&path)?)
                    .with_context(|| format!("parsing {}", path.display()))?;
                details.insert(game_id, payload);
            }
        }

        info!(
            dir = %dir.display(),
            owned = owned.len(),
            details = details.len(),
            "fixture catalog loaded"
        );
        Ok(Self {
            owned,
            recent,
            details,
            detail_requests: Mutex::new(Vec::new()),
        })
    }

    /// Ids passed to `fetch_app_details`, in call order.
    pub fn detail_requests(&self) -> Vec<GameId> {
        self.detail_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

#[async_trait]
impl CatalogClient for FixtureCatalogClient {
    async fn fetch_owned_games(&self) -> Result<Vec<CatalogGame>, CatalogError> {
        if self.owned.is_empty() {
            return Err(CatalogError::EmptyLibrary);
        }
        Ok(self.owned.clone())
    }

    async fn fetch_recently_played(&self) -> Result<Vec<CatalogGame>, CatalogError> {
        Ok(self.recent.clone())
    }

    async fn fetch_app_details(&self, game_id: GameId) -> Result<JsonValue, CatalogError> {
        if let Ok(mut requests) = self.detail_requests.lock() {
            requests.push(game_id);
        }
        self.details.get(&game_id).cloned().ok_or_else(|| {
            CatalogError::UpstreamUnavailable(FetchError::HttpStatus {
                status: 404,
                url: format!("fixture://appdetails/{game_id}"),
            })
        })
    }
}

/// Outcome of turning one detail payload into a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailExtraction {
    Extracted(GameDetail),
    Failed(ExtractionFailure),
}

impl DetailExtraction {
    pub fn into_result(self) -> Result<GameDetail, ExtractionFailure> {
        match self {
            DetailExtraction::Extracted(detail) => Ok(detail),
            DetailExtraction::Failed(failure) => Err(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ExtractionFailure {
    pub reason: String,
}

impl ExtractionFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Extract a [`GameDetail`] from an `appdetails` payload.
///
/// Absent or null fields become `None`. A field present with the wrong shape
/// fails the whole extraction rather than being silently dropped.
pub fn extract_game_detail(game_id: GameId, payload: &JsonValue) -> DetailExtraction {
    match try_extract(game_id, payload) {
        Ok(detail) => DetailExtraction::Extracted(detail),
        Err(failure) => {
            debug!(game_id, reason = %failure, "detail extraction failed");
            DetailExtraction::Failed(failure)
        }
    }
}

fn try_extract(game_id: GameId, payload: &JsonValue) -> Result<GameDetail, ExtractionFailure> {
    let key = game_id.to_string();
    let entry = payload
        .get(&key)
        .filter(|v| v.is_object())
        .ok_or_else(|| ExtractionFailure::new(format!("payload has no entry for {key}")))?;
    if entry.get("success").and_then(JsonValue::as_bool) == Some(false) {
        return Err(ExtractionFailure::new("upstream reported success=false"));
    }
    let data = entry
        .get("data")
        .filter(|v| v.is_object())
        .ok_or_else(|| ExtractionFailure::new("entry has no data object"))?;

    let (windows, mac, linux) = platforms(data)?;
    let (metacritic_score, metacritic_url) = metacritic(data);

    Ok(GameDetail {
        game_id,
        name: opt_string(data, "name")?,
        genres: genres(data)?,
        controller_support: opt_string(data, "controller_support")?,
        is_free: opt_bool(data, "is_free")?,
        release_date: release_date(data)?,
        windows,
        mac,
        linux,
        metacritic_score,
        metacritic_url,
        reviews: opt_string(data, "reviews")?,
        short_description: opt_string(data, "short_description")?,
        about_the_game: opt_string(data, "about_the_game")?,
        detailed_description: opt_string(data, "detailed_description")?,
        header_image: opt_string(data, "header_image")?,
        capsule_image: opt_string(data, "capsule_image")?,
        capsule_imagev5: opt_string(data, "capsule_imagev5")?,
        website: opt_string(data, "website")?,
    })
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn present<'a>(data: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    data.get(key).filter(|v| !v.is_null())
}

fn opt_string(data: &JsonValue, key: &str) -> Result<Option<String>, ExtractionFailure> {
    match present(data, key) {
        None => Ok(None),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ExtractionFailure::new(format!(
            "{key}: expected string, got {}",
            json_kind(other)
        ))),
    }
}

fn opt_bool(data: &JsonValue, key: &str) -> Result<Option<bool>, ExtractionFailure> {
    match present(data, key) {
        None => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ExtractionFailure::new(format!(
            "{key}: expected bool, got {}",
            json_kind(other)
        ))),
    }
}

fn genres(data: &JsonValue) -> Result<Option<String>, ExtractionFailure> {
    let Some(value) = present(data, "genres") else {
        return Ok(None);
    };
    let items = value.as_array().ok_or_else(|| {
        ExtractionFailure::new(format!("genres: expected array, got {}", json_kind(value)))
    })?;
    let labels = items
        .iter()
        .map(|g| {
            g.get("description")
                .and_then(JsonValue::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| ExtractionFailure::new("genres: entry without description"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if labels.is_empty() {
        Ok(None)
    } else {
        Ok(Some(labels.join(", ")))
    }
}

fn release_date(data: &JsonValue) -> Result<Option<String>, ExtractionFailure> {
    match present(data, "release_date") {
        None => Ok(None),
        Some(value @ JsonValue::Object(_)) => opt_string(value, "date"),
        Some(other) => Err(ExtractionFailure::new(format!(
            "release_date: expected object, got {}",
            json_kind(other)
        ))),
    }
}

/// Windows/mac/linux support. An absent or empty block leaves all three unknown.
fn platforms(
    data: &JsonValue,
) -> Result<(Option<bool>, Option<bool>, Option<bool>), ExtractionFailure> {
    match present(data, "platforms") {
        None => Ok((None, None, None)),
        Some(JsonValue::Object(map)) if map.is_empty() => Ok((None, None, None)),
        Some(value @ JsonValue::Object(_)) => Ok((
            opt_bool(value, "windows")?,
            opt_bool(value, "mac")?,
            opt_bool(value, "linux")?,
        )),
        Some(other) => Err(ExtractionFailure::new(format!(
            "platforms: expected object, got {}",
            json_kind(other)
        ))),
    }
}

/// Critic score and URL; anything but an object means no score.
fn metacritic(data: &JsonValue) -> (Option<i64>, Option<String>) {
    match present(data, "metacritic") {
        Some(value @ JsonValue::Object(_)) => {
            let score = value.get("score").and_then(JsonValue::as_i64);
            let url = value
                .get("url")
                .and_then(JsonValue::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(ToString::to_string);
            (score, url)
        }
        Some(other) => {
            warn!(kind = json_kind(other), "ignoring non-object metacritic block");
            (None, None)
        }
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn owned_games_apply_defaults_and_compose_icon_urls() {
        let body = json!({
            "response": {
                "game_count": 2,
                "games": [
                    {"appid": 440, "name": "Team Fortress 2", "playtime_forever": 300, "playtime_2weeks": 12, "img_icon_url": "abc"},
                    {"appid": 10, "img_icon_url": ""}
                ]
            }
        })
        .to_string();
        let games = parse_games_response(body.as_bytes(), "http://icons/apps/")
            .expect("parse")
            .expect("games present");

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].icon_url.as_deref(), Some("http://icons/apps/440/abc.jpg"));
        assert_eq!(games[0].playtime_2weeks, 12);
        assert_eq!(games[1].name, "N/A");
        assert_eq!(games[1].playtime_forever, 0);
        assert_eq!(games[1].icon_url, None);
    }

    #[test]
    fn response_without_games_is_none() {
        let parsed = parse_games_response(br#"{"response": {}}"#, DEFAULT_ICON_BASE_URL).expect("parse");
        assert!(parsed.is_none());
        let parsed = parse_games_response(b"{}", DEFAULT_ICON_BASE_URL).expect("parse");
        assert!(parsed.is_none());
    }

    #[test]
    fn non_json_games_body_is_malformed() {
        let err = parse_games_response(b"<html>", DEFAULT_ICON_BASE_URL).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload(_)));
    }

    #[test]
    fn urls_carry_required_query_parameters() {
        let client = SteamCatalogClient::new(CatalogConfig::new("K", "765")).expect("client");
        let owned = client.owned_games_url();
        assert!(owned.starts_with("http://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/?"));
        assert!(owned.contains("include_appinfo=1"));
        assert!(owned.contains("include_played_free_games=1"));
        assert!(owned.contains("steamid=765"));
        assert_eq!(
            client.app_details_url(220),
            "https://store.steampowered.com/api/appdetails/?appids=220&key=K"
        );
    }

    #[test]
    fn minimal_payload_yields_absent_markers() {
        let payload = json!({"70": {"success": true, "data": {"name": "Half-Life"}}});
        let detail = extract_game_detail(70, &payload).into_result().expect("extracted");
        assert_eq!(detail.name.as_deref(), Some("Half-Life"));
        assert_eq!(detail.genres, None);
        assert_eq!((detail.windows, detail.mac, detail.linux), (None, None, None));
        assert_eq!((detail.metacritic_score, detail.metacritic_url), (None, None));
        assert_eq!(detail.is_free, None);
    }

    #[test]
    fn platforms_keep_explicit_false() {
        let payload = json!({"70": {"success": true, "data": {
            "platforms": {"windows": true, "mac": false, "linux": false}
        }}});
        let detail = extract_game_detail(70, &payload).into_result().expect("extracted");
        assert_eq!(detail.windows, Some(true));
        assert_eq!(detail.mac, Some(false));
        assert_eq!(detail.linux, Some(false));
    }

    #[test]
    fn empty_strings_and_empty_genres_are_absent() {
        let payload = json!({"70": {"success": true, "data": {
            "website": "", "genres": [], "controller_support": "  "
        }}});
        let detail = extract_game_detail(70, &payload).into_result().expect("extracted");
        assert_eq!(detail.website, None);
        assert_eq!(detail.genres, None);
        assert_eq!(detail.controller_support, None);
    }

    #[test]
    fn unsuccessful_or_missing_entries_fail() {
        let payload = json!({"70": {"success": false}});
        assert!(matches!(extract_game_detail(70, &payload), DetailExtraction::Failed(_)));
        let payload = json!({"71": {"success": true, "data": {}}});
        assert!(matches!(extract_game_detail(70, &payload), DetailExtraction::Failed(_)));
        assert!(matches!(extract_game_detail(70, &JsonValue::Null), DetailExtraction::Failed(_)));
    }

    #[test]
    fn wrong_shape_fails_with_field_name() {
        let payload = json!({"70": {"success": true, "data": {"genres": "Action"}}});
        let failure = extract_game_detail(70, &payload).into_result().unwrap_err();
        assert!(failure.reason.starts_with("genres"));
        let payload = json!({"70": {"success": true, "data": {"platforms": [true]}}});
        let failure = extract_game_detail(70, &payload).into_result().unwrap_err();
        assert!(failure.reason.starts_with("platforms"));
    }

    #[tokio::test]
    async fn fixture_client_records_requests_and_404s_unknown_ids() {
        let owned = vec![CatalogGame {
            game_id: 70,
            name: "Half-Life".into(),
            playtime_2weeks: 0,
            playtime_forever: 10,
            icon_url: None,
        }];
        let client = FixtureCatalogClient::new(owned)
            .with_detail(70, json!({"70": {"success": true, "data": {}}}));

        assert_eq!(client.fetch_owned_games().await.expect("owned").len(), 1);
        assert!(client.fetch_app_details(70).await.is_ok());
        let err = client.fetch_app_details(71).await.unwrap_err();
        assert!(matches!(err, CatalogError::UpstreamUnavailable(_)));
        assert_eq!(client.detail_requests(), vec![70, 71]);
    }

    #[tokio::test]
    async fn empty_fixture_library_is_an_error() {
        let client = FixtureCatalogClient::default();
        assert!(matches!(
            client.fetch_owned_games().await,
            Err(CatalogError::EmptyLibrary)
        ));
    }

    #[test]
    fn non_object_metacritic_means_no_score() {
        let payload = json!({"70": {"success": true, "data": {"metacritic": []}}});
        let detail = extract_game_detail(70, &payload).into_result().expect("extracted");
        assert_eq!(detail.metacritic_score, None);
        assert_eq!(detail.metacritic_url, None);
    }
}
