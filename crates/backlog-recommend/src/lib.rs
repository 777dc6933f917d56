//! Content-based recommendations over the stored library.
//!
//! Reference titles (picked by a [`ReferenceStrategy`]) define a TF-IDF space; every
//! uncompleted title is scored by how close its description sits to the closest references.

pub mod text;
pub mod vectorizer;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use backlog_core::{GameDetail, GameId, NeverPlayedPick, OwnedGame, Recommendation};
use backlog_storage::{GameStore, StoreError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use text::{clean_html, default_stopwords, Analyzer};
pub use vectorizer::{
    cosine_similarity, SparseVector, TfidfVectorizer, VectorizerConfig, VectorizerOverride,
};

pub const CRATE_NAME: &str = "backlog-recommend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceStrategy {
    /// The most-played slice of the whole library.
    ByPlaytime,
    /// Titles flagged completed, excluding broken and endless ones.
    ByCompleted,
    /// Anything played in the last two weeks; falls back to a never-played pick.
    ByRecent,
}

impl fmt::Display for ReferenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceStrategy::ByPlaytime => "by-playtime",
            ReferenceStrategy::ByCompleted => "by-completed",
            ReferenceStrategy::ByRecent => "by-recent",
        })
    }
}

impl FromStr for ReferenceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "by-playtime" | "playtime" => Ok(Self::ByPlaytime),
            "by-completed" | "completed" => Ok(Self::ByCompleted),
            "by-recent" | "recent" => Ok(Self::ByRecent),
            other => Err(format!("unknown reference strategy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Share of the remaining references kept per target; at least one is always kept.
    pub top_fraction: f64,
    pub max_recommendations: usize,
    pub max_results: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.1,
            max_recommendations: 5,
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommenderConfig {
    pub by_playtime: VectorizerConfig,
    pub by_completed: VectorizerConfig,
    pub by_recent: VectorizerConfig,
    /// Share of the library, by lifetime playtime, used as by-playtime references.
    pub playtime_reference_fraction: f64,
    pub ranking: RankingConfig,
    pub extra_stopwords: Vec<String>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            by_playtime: VectorizerConfig {
                max_df: 0.8,
                min_df: 0.1,
                ..Default::default()
            },
            by_completed: VectorizerConfig::default(),
            by_recent: VectorizerConfig::default(),
            playtime_reference_fraction: 0.02,
            ranking: RankingConfig::default(),
            extra_stopwords: Vec::new(),
        }
    }
}

/// Keys present in a recommender YAML file. Anything left out keeps its built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecommenderOverride {
    by_playtime: Option<VectorizerOverride>,
    by_completed: Option<VectorizerOverride>,
    by_recent: Option<VectorizerOverride>,
    playtime_reference_fraction: Option<f64>,
    ranking: Option<RankingConfig>,
    extra_stopwords: Option<Vec<String>>,
}

impl RecommenderOverride {
    fn apply(self, base: RecommenderConfig) -> RecommenderConfig {
        let merge = |o: Option<VectorizerOverride>, b: VectorizerConfig| match o {
            Some(o) => o.apply(b),
            None => b,
        };
        RecommenderConfig {
            by_playtime: merge(self.by_playtime, base.by_playtime),
            by_completed: merge(self.by_completed, base.by_completed),
            by_recent: merge(self.by_recent, base.by_recent),
            playtime_reference_fraction: self
                .playtime_reference_fraction
                .unwrap_or(base.playtime_reference_fraction),
            ranking: self.ranking.unwrap_or(base.ranking),
            extra_stopwords: self.extra_stopwords.unwrap_or(base.extra_stopwords),
        }
    }
}

impl RecommenderConfig {
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        // An empty document deserialises as unit, not as an empty map.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let overrides: RecommenderOverride = serde_yaml::from_str(raw)?;
        Ok(overrides.apply(Self::default()))
    }

    /// Defaults, or the file named by `BACKLOG_RECOMMENDER_CONFIG` when set.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var("BACKLOG_RECOMMENDER_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    pub fn vectorizer_for(&self, strategy: ReferenceStrategy) -> &VectorizerConfig {
        match strategy {
            ReferenceStrategy::ByPlaytime => &self.by_playtime,
            ReferenceStrategy::ByCompleted => &self.by_completed,
            ReferenceStrategy::ByRecent => &self.by_recent,
        }
    }
}

/// Owned games with their details joined on `game_id`, in store order.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub owned: Vec<OwnedGame>,
    pub details: HashMap<GameId, GameDetail>,
}

impl Library {
    pub fn new(owned: Vec<OwnedGame>, details: Vec<GameDetail>) -> Self {
        Self {
            owned,
            details: details.into_iter().map(|d| (d.game_id, d)).collect(),
        }
    }

    pub async fn load(store: &dyn GameStore) -> Result<Self, StoreError> {
        let owned = store.load_owned_games().await?;
        let details = store.load_game_details().await?;
        debug!(owned = owned.len(), details = details.len(), "library loaded");
        Ok(Self::new(owned, details))
    }

    pub fn detail(&self, game_id: GameId) -> Option<&GameDetail> {
        self.details.get(&game_id)
    }

    pub fn name_of(&self, game_id: GameId) -> Option<&str> {
        self.owned
            .iter()
            .find(|g| g.game_id == game_id)
            .map(|g| g.name.as_str())
            .or_else(|| self.detail(game_id).and_then(|d| d.name.as_deref()))
    }

    pub fn uncompleted(&self) -> Vec<&OwnedGame> {
        self.owned
            .iter()
            .filter(|g| g.status.is_uncompleted())
            .collect()
    }

    /// Reference titles for `strategy`. For by-recent this may be empty.
    pub fn references(&self, strategy: ReferenceStrategy, config: &RecommenderConfig) -> Vec<&OwnedGame> {
        match strategy {
            ReferenceStrategy::ByPlaytime => {
                if self.owned.is_empty() {
                    return Vec::new();
                }
                let count = ((config.playtime_reference_fraction * self.owned.len() as f64).floor()
                    as usize)
                    .max(1);
                let mut by_playtime: Vec<&OwnedGame> = self.owned.iter().collect();
                by_playtime.sort_by(|a, b| b.playtime_forever.cmp(&a.playtime_forever));
                by_playtime.truncate(count);
                by_playtime
            }
            ReferenceStrategy::ByCompleted => self
                .owned
                .iter()
                .filter(|g| g.status.is_completed())
                .collect(),
            ReferenceStrategy::ByRecent => self
                .owned
                .iter()
                .filter(|g| g.playtime_2weeks != 0)
                .collect(),
        }
    }

    fn document(&self, game: &OwnedGame) -> Document {
        Document {
            game_id: game.game_id,
            text: clean_html(
                self.detail(game.game_id)
                    .and_then(|d| d.detailed_description.as_deref()),
            ),
        }
    }
}

/// A title's cleaned description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub game_id: GameId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Ranked(Vec<Recommendation>),
    NeverPlayed(NeverPlayedPick),
}

/// Score every target against the references and keep the best.
///
/// Per target: references sorted by descending similarity (stable), the target's own id
/// removed, the top `top_fraction` kept (at least one), and their mean similarity recorded.
pub fn rank_targets(
    vectorizer: &TfidfVectorizer,
    references: &[Document],
    targets: &[Document],
    ranking: &RankingConfig,
) -> Vec<Recommendation> {
    let reference_vectors: Vec<(GameId, SparseVector)> = references
        .iter()
        .map(|d| (d.game_id, vectorizer.transform(&d.text)))
        .collect();

    let mut scored: Vec<Recommendation> = targets
        .iter()
        .map(|target| {
            let target_vector = vectorizer.transform(&target.text);
            let mut similarities: Vec<(GameId, f64)> = reference_vectors
                .iter()
                .map(|(id, v)| (*id, cosine_similarity(&target_vector, v)))
                .collect();
            similarities.sort_by(|a, b| b.1.total_cmp(&a.1));
            similarities.retain(|(id, _)| *id != target.game_id);

            let keep = ((ranking.top_fraction * similarities.len() as f64).floor() as usize)
                .max(1)
                .min(similarities.len());
            let kept = &similarities[..keep];
            let mean = if kept.is_empty() {
                0.0
            } else {
                kept.iter().map(|(_, s)| s).sum::<f64>() / kept.len() as f64
            };
            Recommendation {
                game_id: target.game_id,
                recommendations: kept
                    .iter()
                    .take(ranking.max_recommendations)
                    .map(|(id, _)| *id)
                    .collect(),
                mean_similarity: if mean.is_nan() { 0.0 } else { mean },
            }
        })
        .collect();

    scored.sort_by(|a, b| b.mean_similarity.total_cmp(&a.mean_similarity));
    scored.truncate(ranking.max_results);
    scored
}

/// One uncompleted title: a random unplayed one, else the least played.
pub fn select_never_played<R>(library: &Library, rng: &mut R) -> Option<NeverPlayedPick>
where
    R: Rng + ?Sized,
{
    let uncompleted = library.uncompleted();
    let unplayed: Vec<&OwnedGame> = uncompleted
        .iter()
        .copied()
        .filter(|g| g.playtime_forever == 0)
        .collect();
    let game = match unplayed.choose(rng) {
        Some(game) => *game,
        None => *uncompleted.iter().min_by_key(|g| g.playtime_forever)?,
    };
    Some(NeverPlayedPick {
        game: game.clone(),
        detail: library.detail(game.game_id).cloned(),
    })
}

pub struct Recommender {
    config: RecommenderConfig,
    stopwords: HashSet<String>,
}

impl Recommender {
    pub fn new(config: RecommenderConfig) -> Self {
        let mut stopwords = default_stopwords();
        stopwords.extend(config.extra_stopwords.iter().map(|w| w.to_lowercase()));
        Self { config, stopwords }
    }

    pub fn recommend<R>(
        &self,
        library: &Library,
        strategy: ReferenceStrategy,
        rng: &mut R,
    ) -> RecommendationOutcome
    where
        R: Rng + ?Sized,
    {
        let references = library.references(strategy, &self.config);
        if references.is_empty() {
            if strategy == ReferenceStrategy::ByRecent {
                info!("no games played in the last two weeks; picking a never-played title");
                return match select_never_played(library, rng) {
                    Some(pick) => RecommendationOutcome::NeverPlayed(pick),
                    None => RecommendationOutcome::Ranked(Vec::new()),
                };
            }
            warn!(%strategy, "no reference games; nothing to rank");
            return RecommendationOutcome::Ranked(Vec::new());
        }

        let reference_docs: Vec<Document> =
            references.iter().map(|g| library.document(g)).collect();
        let target_docs: Vec<Document> = library
            .uncompleted()
            .into_iter()
            .map(|g| library.document(g))
            .collect();

        let vectorizer_config = self.config.vectorizer_for(strategy);
        let analyzer = Analyzer::new(
            self.stopwords.clone(),
            vectorizer_config.ngram_min,
            vectorizer_config.ngram_max,
        );
        let texts: Vec<&str> = reference_docs.iter().map(|d| d.text.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(analyzer, vectorizer_config, &texts);

        let ranked = rank_targets(&vectorizer, &reference_docs, &target_docs, &self.config.ranking);
        info!(
            %strategy,
            references = reference_docs.len(),
            targets = target_docs.len(),
            vocabulary = vectorizer.vocabulary_len(),
            results = ranked.len(),
            "recommendations ranked"
        );
        RecommendationOutcome::Ranked(ranked)
    }
}
