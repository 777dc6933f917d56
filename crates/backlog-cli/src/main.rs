use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use backlog_adapters::{
    CatalogClient, CatalogConfig, FixtureCatalogClient, SteamCatalogClient, DEFAULT_ICON_BASE_URL,
};
use backlog_core::{env_or, GameId, Recommendation};
use backlog_recommend::{
    select_never_played, Library, RecommendationOutcome, Recommender, RecommenderConfig,
    ReferenceStrategy,
};
use backlog_storage::{GameStore, PgGameStore, StoreConfig};
use backlog_sync::{SyncConfig, SyncPipeline};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "backlog")]
#[command(about = "Track a game library and pick what to play next")]
struct Cli {
    /// Serve catalog calls from a captured fixture directory instead of the live API.
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Replace the owned-games table with a fresh fetch.
    Load,
    /// Reconcile owned games, then backfill missing details.
    Sync {
        /// Print the owned-games diff without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Backfill details for the owned games already in the store.
    Backfill,
    /// List games played in the last two weeks.
    Recent,
    /// Rank uncompleted games, or pick one nobody has touched.
    Recommend {
        #[arg(value_enum)]
        strategy: StrategyArg,
        /// Seed for the never-played pick.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    ByPlaytime,
    ByCompleted,
    ByRecent,
    NeverPlayed,
}

impl StrategyArg {
    fn reference_strategy(self) -> Option<ReferenceStrategy> {
        match self {
            StrategyArg::ByPlaytime => Some(ReferenceStrategy::ByPlaytime),
            StrategyArg::ByCompleted => Some(ReferenceStrategy::ByCompleted),
            StrategyArg::ByRecent => Some(ReferenceStrategy::ByRecent),
            StrategyArg::NeverPlayed => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct NamedGame {
    game_id: GameId,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct RankedRow {
    game_id: GameId,
    name: Option<String>,
    mean_similarity: f64,
    recommendations: Vec<NamedGame>,
}

fn named(library: &Library, game_id: GameId) -> NamedGame {
    NamedGame {
        game_id,
        name: library.name_of(game_id).map(str::to_string),
    }
}

fn ranked_rows(library: &Library, ranked: &[Recommendation]) -> Vec<RankedRow> {
    ranked
        .iter()
        .map(|r| RankedRow {
            game_id: r.game_id,
            name: library.name_of(r.game_id).map(str::to_string),
            mean_similarity: r.mean_similarity,
            recommendations: r.recommendations.iter().map(|id| named(library, *id)).collect(),
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}

fn catalog_client(fixtures: Option<&PathBuf>) -> Result<Arc<dyn CatalogClient>> {
    match fixtures {
        Some(dir) => {
            let icon_base = env_or("STEAM_ICON_BASE_URL", DEFAULT_ICON_BASE_URL);
            Ok(Arc::new(FixtureCatalogClient::load_dir(dir, &icon_base)?))
        }
        None => {
            let config = CatalogConfig::from_env().context("catalog configuration")?;
            Ok(Arc::new(SteamCatalogClient::new(config)?))
        }
    }
}

async fn connect_store() -> Result<PgGameStore> {
    let config = StoreConfig::from_env().context("store configuration")?;
    PgGameStore::connect(&config)
        .await
        .context("connecting to the database")
}

async fn pipeline(fixtures: Option<&PathBuf>) -> Result<SyncPipeline> {
    let config = SyncConfig::from_env().context("sync configuration")?;
    let catalog = catalog_client(fixtures)?;
    let store: Arc<dyn GameStore> = Arc::new(connect_store().await?);
    Ok(SyncPipeline::new(config, catalog, store))
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let fixtures = cli.fixtures.as_ref();

    match cli.command {
        Commands::Migrate => {
            connect_store().await?.migrate().await.context("running migrations")?;
        }
        Commands::Load => {
            pipeline(fixtures).await?.initial_load().await?;
        }
        Commands::Sync { dry_run: true } => {
            let (_, diff) = pipeline(fixtures).await?.plan_reconcile().await?;
            print_json(&diff)?;
        }
        Commands::Sync { dry_run: false } => {
            let summary = pipeline(fixtures).await?.run_once().await?;
            print_json(&summary)?;
        }
        Commands::Backfill => {
            let outcome = pipeline(fixtures).await?.backfill_stored().await?;
            print_json(&outcome)?;
        }
        Commands::Recent => {
            let games = catalog_client(fixtures)?
                .fetch_recently_played()
                .await
                .context("fetching recently played games")?;
            if games.is_empty() {
                info!("no games played in the last two weeks");
            } else {
                print_json(&games)?;
            }
        }
        Commands::Recommend { strategy, seed } => {
            let store = connect_store().await?;
            let library = Library::load(&store).await.context("loading library")?;
            let mut rng = rng_from(seed);
            match strategy.reference_strategy() {
                None => match select_never_played(&library, &mut rng) {
                    Some(pick) => print_json(&pick)?,
                    None => info!("no uncompleted games"),
                },
                Some(reference) => {
                    let recommender = Recommender::new(RecommenderConfig::from_env()?);
                    match recommender.recommend(&library, reference, &mut rng) {
                        RecommendationOutcome::Ranked(ranked) => {
                            print_json(&ranked_rows(&library, &ranked))?
                        }
                        RecommendationOutcome::NeverPlayed(pick) => print_json(&pick)?,
                    }
                }
            }
        }
    }

    Ok(())
}
