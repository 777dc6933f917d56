//! Ingestion pipeline: status overlay, owned-games reconciliation, detail backfill
//! and the run report tying them together.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use backlog_adapters::{extract_game_detail, CatalogClient, CatalogError};
use backlog_core::{
    env_or, parse_env_or, CatalogGame, ConfigError, FieldChange, GameDetail, GameId, OwnedGame,
    OwnedGameField,
};
use backlog_storage::{GameStore, MissingListPolicy, SkipList, StatusLists, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "backlog-sync";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub status_dir: PathBuf,
    pub skip_list_path: PathBuf,
    /// Pause after each successful detail fetch.
    pub detail_delay: Duration,
    pub missing_status_list: MissingListPolicy,
    /// Run reports are only written when this is set.
    pub reports_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            status_dir: PathBuf::from("./gameStatus"),
            skip_list_path: PathBuf::from("./erroring.csv"),
            detail_delay: Duration::from_millis(3000),
            missing_status_list: MissingListPolicy::Fail,
            reports_dir: None,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let policy = env_or("BACKLOG_MISSING_STATUS_LIST", "fail");
        let missing_status_list =
            policy
                .parse::<MissingListPolicy>()
                .map_err(|_| ConfigError::Invalid {
                    name: "BACKLOG_MISSING_STATUS_LIST",
                    value: policy.clone(),
                })?;
        Ok(Self {
            status_dir: PathBuf::from(env_or("BACKLOG_STATUS_DIR", "./gameStatus")),
            skip_list_path: PathBuf::from(env_or("BACKLOG_SKIP_LIST", "./erroring.csv")),
            detail_delay: Duration::from_millis(parse_env_or("BACKLOG_DETAIL_DELAY_MS", 3000u64)?),
            missing_status_list,
            reports_dir: std::env::var("BACKLOG_REPORTS_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Attach status flags to freshly fetched catalog entries.
pub fn apply_status_overlay(games: Vec<CatalogGame>, lists: &StatusLists) -> Vec<OwnedGame> {
    games
        .into_iter()
        .map(|game| {
            let flags = lists.flags_for(game.game_id);
            game.with_status(flags)
        })
        .collect()
}

/// Owned games keyed by id; the shape both sides of a diff take.
pub type OwnedSnapshot = BTreeMap<GameId, OwnedGame>;

pub fn snapshot(games: impl IntoIterator<Item = OwnedGame>) -> OwnedSnapshot {
    games.into_iter().map(|g| (g.game_id, g)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameUpdate {
    pub game_id: GameId,
    pub changes: Vec<FieldChange>,
}

/// Writes needed to bring the stored snapshot in line with a fresh one.
///
/// Ids present only in the stored snapshot are left alone; owned games are never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnedGamesDiff {
    pub inserted: Vec<OwnedGame>,
    pub updated: Vec<GameUpdate>,
    pub unchanged: Vec<GameId>,
}

impl OwnedGamesDiff {
    /// Number of store statements applying this diff takes.
    pub fn write_count(&self) -> usize {
        self.inserted.len() + self.updated.iter().map(|u| u.changes.len()).sum::<usize>()
    }

    pub fn is_noop(&self) -> bool {
        self.write_count() == 0
    }
}

/// Tracked fields whose value differs between `stored` and `fetched`.
pub fn field_changes(stored: &OwnedGame, fetched: &OwnedGame) -> Vec<FieldChange> {
    OwnedGameField::TRACKED
        .into_iter()
        .filter_map(|field| {
            let value = fetched.field_value(field);
            (stored.field_value(field) != value).then_some(FieldChange { field, value })
        })
        .collect()
}

pub fn diff_owned_games(stored: &OwnedSnapshot, fetched: &OwnedSnapshot) -> OwnedGamesDiff {
    let mut diff = OwnedGamesDiff::default();
    for (game_id, game) in fetched {
        match stored.get(game_id) {
            None => diff.inserted.push(game.clone()),
            Some(previous) => {
                let changes = field_changes(previous, game);
                if changes.is_empty() {
                    diff.unchanged.push(*game_id);
                } else {
                    diff.updated.push(GameUpdate {
                        game_id: *game_id,
                        changes,
                    });
                }
            }
        }
    }
    diff
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub inserted: usize,
    pub updated_rows: usize,
    pub updated_fields: usize,
    pub unchanged: usize,
}

/// Apply a diff one statement at a time: one insert per new row, one update per changed field.
///
/// The first failing write stops the pass; earlier writes are not rolled back.
pub async fn apply_owned_games_diff(
    store: &dyn GameStore,
    diff: &OwnedGamesDiff,
) -> Result<ReconcileOutcome, StoreError> {
    let mut outcome = ReconcileOutcome {
        unchanged: diff.unchanged.len(),
        ..Default::default()
    };

    for game in &diff.inserted {
        if let Err(err) = store.insert_owned_game(game).await {
            error!(game_id = game.game_id, error = %err, "owned game insert failed");
            return Err(err);
        }
        info!(game_id = game.game_id, name = %game.name, "owned game inserted");
        outcome.inserted += 1;
    }

    for update in &diff.updated {
        for change in &update.changes {
            info!(
                game_id = update.game_id,
                field = %change.field,
                value = %change.value,
                "updating owned game field"
            );
            if let Err(err) = store.update_owned_game_field(update.game_id, change).await {
                error!(game_id = update.game_id, field = %change.field, error = %err, "field update failed");
                return Err(err);
            }
            outcome.updated_fields += 1;
        }
        outcome.updated_rows += 1;
    }

    Ok(outcome)
}

/// Which owned ids the backfill will fetch, and which it passes over because they failed before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillPlan {
    pub targets: Vec<GameId>,
    pub already_skipped: Vec<GameId>,
}

/// Owned ids without a detail row, minus the skip list, in owned order.
pub fn backfill_targets(
    owned_ids: &[GameId],
    persisted: &HashSet<GameId>,
    skip_list: &SkipList,
) -> BackfillPlan {
    let mut seen = HashSet::new();
    let mut plan = BackfillPlan::default();
    for &game_id in owned_ids {
        if !seen.insert(game_id) || persisted.contains(&game_id) {
            continue;
        }
        if skip_list.contains(game_id) {
            plan.already_skipped.push(game_id);
        } else {
            plan.targets.push(game_id);
        }
    }
    plan
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillFailure {
    pub game_id: GameId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillOutcome {
    pub attempted: usize,
    pub appended: Vec<GameId>,
    pub failed: Vec<BackfillFailure>,
    pub already_skipped: usize,
    /// Failed ids that were not on the skip list before this pass.
    pub newly_skipped: Vec<GameId>,
}

/// Fetch and append details for every owned id that has none yet.
///
/// Upstream errors and malformed payloads are logged and skip-listed; the pass moves on.
/// A store error stops the pass, but failures collected so far still reach the skip list.
pub async fn run_detail_backfill(
    catalog: &dyn CatalogClient,
    store: &dyn GameStore,
    owned_ids: &[GameId],
    skip_list: &mut SkipList,
    delay: Duration,
) -> Result<BackfillOutcome> {
    let persisted = store
        .load_game_detail_ids()
        .await
        .context("loading persisted detail ids")?;
    let plan = backfill_targets(owned_ids, &persisted, skip_list);
    for game_id in &plan.already_skipped {
        info!(game_id, "skipping game due to previous errors");
    }
    info!(
        targets = plan.targets.len(),
        already_skipped = plan.already_skipped.len(),
        "detail backfill planned"
    );

    let mut outcome = BackfillOutcome {
        already_skipped: plan.already_skipped.len(),
        ..Default::default()
    };
    let fetched = fetch_and_append(catalog, store, &plan.targets, delay, &mut outcome).await;

    outcome.newly_skipped = skip_list.extend(outcome.failed.iter().map(|f| f.game_id));
    if !outcome.newly_skipped.is_empty() {
        skip_list.save().await.with_context(|| {
            format!("saving skip list {}", skip_list.path().display())
        })?;
        info!(
            newly_skipped = outcome.newly_skipped.len(),
            total = skip_list.len(),
            "skip list updated"
        );
    }

    fetched.context("appending game detail")?;
    Ok(outcome)
}

async fn fetch_and_append(
    catalog: &dyn CatalogClient,
    store: &dyn GameStore,
    targets: &[GameId],
    delay: Duration,
    outcome: &mut BackfillOutcome,
) -> Result<(), StoreError> {
    for &game_id in targets {
        outcome.attempted += 1;
        let detail = fetch_detail(catalog, game_id)
            .instrument(info_span!("detail_fetch", game_id))
            .await;
        match detail {
            Ok(detail) => {
                store.append_game_detail(&detail).await?;
                info!(game_id, name = detail.name.as_deref().unwrap_or("N/A"), "game detail appended");
                outcome.appended.push(game_id);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(reason) => {
                warn!(game_id, %reason, "error getting game details");
                outcome.failed.push(BackfillFailure { game_id, reason });
            }
        }
    }
    Ok(())
}

async fn fetch_detail(catalog: &dyn CatalogClient, game_id: GameId) -> Result<GameDetail, String> {
    let payload = catalog
        .fetch_app_details(game_id)
        .await
        .map_err(|e: CatalogError| e.to_string())?;
    extract_game_detail(game_id, &payload)
        .into_result()
        .map_err(|failure| failure.reason)
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched_games: usize,
    pub reconcile: ReconcileOutcome,
    pub details_attempted: usize,
    pub details_appended: usize,
    pub details_failed: usize,
    pub newly_skipped: Vec<GameId>,
    pub report_path: Option<String>,
}

pub struct SyncPipeline {
    config: SyncConfig,
    catalog: Arc<dyn CatalogClient>,
    store: Arc<dyn GameStore>,
}

impl SyncPipeline {
    pub fn new(
        config: SyncConfig,
        catalog: Arc<dyn CatalogClient>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
        }
    }

    /// Fetch the library and overlay the status lists onto it.
    pub async fn fetch_owned_games(&self) -> Result<Vec<OwnedGame>> {
        let games = self
            .catalog
            .fetch_owned_games()
            .await
            .context("fetching owned games")?;
        let lists = StatusLists::load(&self.config.status_dir, self.config.missing_status_list)
            .context("loading status lists")?;
        Ok(apply_status_overlay(games, &lists))
    }

    /// Replace the whole owned-games table with a fresh fetch.
    pub async fn initial_load(&self) -> Result<usize> {
        let games = self.fetch_owned_games().await?;
        self.store
            .replace_owned_games(&games)
            .await
            .context("replacing owned games")?;
        info!(rows = games.len(), "owned games loaded");
        Ok(games.len())
    }

    /// Diff a fresh fetch against the store without writing anything.
    pub async fn plan_reconcile(&self) -> Result<(Vec<OwnedGame>, OwnedGamesDiff)> {
        let fetched = self.fetch_owned_games().await?;
        let stored = self
            .store
            .load_owned_games()
            .await
            .context("loading stored owned games")?;
        let diff = diff_owned_games(&snapshot(stored), &snapshot(fetched.iter().cloned()));
        Ok((fetched, diff))
    }

    pub async fn reconcile(&self) -> Result<(Vec<OwnedGame>, ReconcileOutcome)> {
        let (fetched, diff) = self.plan_reconcile().await?;
        let outcome = apply_owned_games_diff(self.store.as_ref(), &diff)
            .await
            .context("applying owned games diff")?;
        info!(
            inserted = outcome.inserted,
            updated_rows = outcome.updated_rows,
            updated_fields = outcome.updated_fields,
            unchanged = outcome.unchanged,
            "owned games reconciled"
        );
        Ok((fetched, outcome))
    }

    pub async fn backfill_details(&self, owned_ids: &[GameId]) -> Result<BackfillOutcome> {
        let mut skip_list = SkipList::load(&self.config.skip_list_path).await?;
        run_detail_backfill(
            self.catalog.as_ref(),
            self.store.as_ref(),
            owned_ids,
            &mut skip_list,
            self.config.detail_delay,
        )
        .await
    }

    /// Backfill against the ids currently in the store, without fetching the library.
    pub async fn backfill_stored(&self) -> Result<BackfillOutcome> {
        let owned = self
            .store
            .load_owned_games()
            .await
            .context("loading stored owned games")?;
        let ids: Vec<GameId> = owned.iter().map(|g| g.game_id).collect();
        self.backfill_details(&ids).await
    }

    /// One ingestion pass: reconcile owned games, then backfill missing details.
    pub async fn run_once(&self) -> Result<SyncRunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);
        async move {
            let started_at = Utc::now();
            let (fetched, reconcile) = self.reconcile().await?;
            let owned_ids: Vec<GameId> = fetched.iter().map(|g| g.game_id).collect();
            let backfill = self.backfill_details(&owned_ids).await?;

            let mut summary = SyncRunSummary {
                run_id,
                started_at,
                finished_at: Utc::now(),
                fetched_games: fetched.len(),
                reconcile,
                details_attempted: backfill.attempted,
                details_appended: backfill.appended.len(),
                details_failed: backfill.failed.len(),
                newly_skipped: backfill.newly_skipped,
                report_path: None,
            };
            if let Some(path) = self.write_report(&summary).await? {
                summary.report_path = Some(path.display().to_string());
            }
            info!(
                fetched = summary.fetched_games,
                inserted = summary.reconcile.inserted,
                updated_fields = summary.reconcile.updated_fields,
                details_appended = summary.details_appended,
                details_failed = summary.details_failed,
                "sync run finished"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    async fn write_report(&self, summary: &SyncRunSummary) -> Result<Option<PathBuf>> {
        let Some(root) = &self.config.reports_dir else {
            return Ok(None);
        };
        let dir = root.join(summary.run_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join("sync_summary.json");
        let bytes = serde_json::to_vec_pretty(summary).context("serializing sync summary")?;
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_adapters::FixtureCatalogClient;
    use backlog_core::{FieldValue, StatusFlags};
    use backlog_storage::{MemoryGameStore, StoreWrite};
    use serde_json::json;

    fn owned(game_id: GameId, name: &str, forever: i64) -> OwnedGame {
        CatalogGame {
            game_id,
            name: name.to_string(),
            playtime_2weeks: 0,
            playtime_forever: forever,
            icon_url: None,
        }
        .with_status(StatusFlags::default())
    }

    fn detail_payload(game_id: GameId, name: &str) -> serde_json::Value {
        json!({ game_id.to_string(): { "success": true, "data": { "name": name } } })
    }

    #[test]
    fn overlay_sets_flags_from_list_membership() {
        let lists = StatusLists::new(vec![1], vec![], vec![2], vec![]);
        let games = [1, 2, 3]
            .into_iter()
            .map(|game_id| CatalogGame {
                game_id,
                name: format!("game {game_id}"),
                playtime_2weeks: 0,
                playtime_forever: 0,
                icon_url: None,
            })
            .collect();
        let overlaid = apply_status_overlay(games, &lists);
        assert!(overlaid[0].status.completed && !overlaid[0].status.endless);
        assert!(overlaid[1].status.endless);
        assert!(overlaid[2].status.is_uncompleted());
    }

    #[test]
    fn single_field_change_is_a_single_update() {
        let stored = snapshot([owned(10, "Portal", 100), owned(20, "Braid", 5)]);
        let fetched = snapshot([owned(10, "Portal", 160), owned(20, "Braid", 5)]);
        let diff = diff_owned_games(&stored, &fetched);

        assert!(diff.inserted.is_empty());
        assert_eq!(diff.unchanged, vec![20]);
        assert_eq!(
            diff.updated,
            vec![GameUpdate {
                game_id: 10,
                changes: vec![FieldChange {
                    field: OwnedGameField::PlaytimeForever,
                    value: FieldValue::Minutes(160),
                }],
            }]
        );
        assert_eq!(diff.write_count(), 1);
    }

    #[test]
    fn new_id_is_an_insert_with_no_updates() {
        let stored = snapshot([owned(10, "Portal", 100)]);
        let fetched = snapshot([owned(10, "Portal", 100), owned(30, "Fez", 0)]);
        let diff = diff_owned_games(&stored, &fetched);
        assert_eq!(diff.inserted.len(), 1);
        assert_eq!(diff.inserted[0].game_id, 30);
        assert!(diff.updated.is_empty());
    }

    #[test]
    fn identical_snapshots_need_no_writes() {
        let games = [owned(1, "a", 1), owned(2, "b", 2)];
        let diff = diff_owned_games(&snapshot(games.clone()), &snapshot(games));
        assert!(diff.is_noop());
        assert_eq!(diff.unchanged, vec![1, 2]);
    }

    #[test]
    fn ids_missing_from_the_fetch_are_left_alone() {
        let stored = snapshot([owned(1, "a", 1), owned(2, "b", 2)]);
        let fetched = snapshot([owned(1, "a", 1)]);
        assert!(diff_owned_games(&stored, &fetched).is_noop());
    }

    #[test]
    fn status_flag_flip_updates_only_that_flag() {
        let before = owned(5, "Celeste", 300);
        let mut after = before.clone();
        after.status.completed = true;
        let changes = field_changes(&before, &after);
        assert_eq!(
            changes,
            vec![FieldChange {
                field: OwnedGameField::Completed,
                value: FieldValue::Flag(true),
            }]
        );
    }

    #[tokio::test]
    async fn applying_a_diff_issues_one_statement_per_change() {
        let store = MemoryGameStore::seeded(vec![owned(10, "Portal", 100)], vec![]);
        let mut renamed = owned(10, "Portal (2007)", 150);
        renamed.status.selected = true;
        let diff = diff_owned_games(
            &snapshot(store.load_owned_games().await.expect("load")),
            &snapshot([renamed, owned(11, "Portal 2", 0)]),
        );

        let outcome = apply_owned_games_diff(&store, &diff).await.expect("apply");
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.updated_rows, 1);
        assert_eq!(outcome.updated_fields, 3);
        assert_eq!(store.writes().await.len(), 4);
        let stored = store.owned_game(10).await.expect("row");
        assert_eq!(stored.name, "Portal (2007)");
        assert!(stored.status.selected);
    }

    #[tokio::test]
    async fn write_failure_stops_the_pass_and_keeps_earlier_rows() {
        let store = MemoryGameStore::new();
        store.fail_writes_for(2).await;
        let diff = diff_owned_games(
            &OwnedSnapshot::new(),
            &snapshot([owned(1, "a", 0), owned(2, "b", 0), owned(3, "c", 0)]),
        );
        assert!(apply_owned_games_diff(&store, &diff).await.is_err());
        assert_eq!(store.writes().await, vec![StoreWrite::Insert { game_id: 1 }]);
        assert!(store.owned_game(3).await.is_none());
    }

    #[test]
    fn targets_exclude_persisted_and_skipped_ids_in_owned_order() {
        let mut skip = SkipList::empty("unused.csv");
        skip.extend([4]);
        let persisted: HashSet<GameId> = [2].into_iter().collect();
        let plan = backfill_targets(&[5, 2, 4, 1, 5], &persisted, &skip);
        assert_eq!(plan.targets, vec![5, 1]);
        assert_eq!(plan.already_skipped, vec![4]);
    }

    #[tokio::test]
    async fn backfill_never_fetches_skip_listed_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("erroring.csv");
        let mut skip = SkipList::empty(&path);
        skip.extend([7]);
        let catalog = FixtureCatalogClient::new(vec![]).with_detail(8, detail_payload(8, "Limbo"));
        let store = MemoryGameStore::new();

        let outcome = run_detail_backfill(&catalog, &store, &[7, 8], &mut skip, Duration::ZERO)
            .await
            .expect("backfill");
        assert_eq!(catalog.detail_requests(), vec![8]);
        assert_eq!(outcome.appended, vec![8]);
        assert_eq!(outcome.already_skipped, 1);
        assert!(outcome.newly_skipped.is_empty());
        assert!(!path.exists(), "no new failures means no rewrite");
    }

    #[tokio::test]
    async fn failures_are_skip_listed_and_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("erroring.csv");
        let catalog = FixtureCatalogClient::new(vec![])
            .with_detail(1, detail_payload(1, "Inside"))
            .with_detail(2, json!({ "2": { "success": false } }));
        let store = MemoryGameStore::new();

        let mut skip = SkipList::load(&path).await.expect("load");
        let first = run_detail_backfill(&catalog, &store, &[1, 2, 3], &mut skip, Duration::ZERO)
            .await
            .expect("first pass");
        assert_eq!(first.appended, vec![1]);
        assert_eq!(first.newly_skipped, vec![2, 3]);

        let mut skip = SkipList::load(&path).await.expect("reload");
        assert_eq!(skip.ids().collect::<Vec<_>>(), vec![2, 3]);
        let second = run_detail_backfill(&catalog, &store, &[1, 2, 3], &mut skip, Duration::ZERO)
            .await
            .expect("second pass");
        assert_eq!(second.attempted, 0);
        assert_eq!(second.already_skipped, 2);
        assert_eq!(catalog.detail_requests(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn store_error_still_persists_collected_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("erroring.csv");
        let catalog = FixtureCatalogClient::new(vec![]).with_detail(2, detail_payload(2, "Fez"));
        let store = MemoryGameStore::new();
        store.fail_writes_for(2).await;

        let mut skip = SkipList::empty(&path);
        let result = run_detail_backfill(&catalog, &store, &[1, 2], &mut skip, Duration::ZERO).await;
        assert!(result.is_err());
        let reloaded = SkipList::load(&path).await.expect("reload");
        assert_eq!(reloaded.ids().collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_follows_each_append_but_not_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = FixtureCatalogClient::new(vec![])
            .with_detail(1, detail_payload(1, "Inside"))
            .with_detail(3, detail_payload(3, "Braid"));
        let store = MemoryGameStore::new();
        let mut skip = SkipList::empty(dir.path().join("erroring.csv"));
        let delay = Duration::from_secs(3);

        let start = tokio::time::Instant::now();
        let outcome = run_detail_backfill(&catalog, &store, &[1, 2, 3], &mut skip, delay)
            .await
            .expect("backfill");
        assert_eq!(outcome.appended, vec![1, 3]);
        assert_eq!(outcome.newly_skipped, vec![2]);
        assert_eq!(start.elapsed(), delay * 2);
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.detail_delay, Duration::from_secs(3));
        assert_eq!(config.missing_status_list, MissingListPolicy::Fail);
        assert!(config.reports_dir.is_none());
    }
}
