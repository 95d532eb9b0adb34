use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use futures_util::future::join_all;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::calendar::{
    self, SeasonCalendar, SeasonDate, ARCHIVE_START, MATCHDAYS_PER_SEASON,
};
use crate::config::Config;
use crate::error::{RemoteError, SyncError};
use crate::planner::{plan, QueryUnit};
use crate::remote::{MatchProvider, OpenLigaDb};
use crate::store::models::MatchRecord;
use crate::store::LocalStore;

/// Orchestrates one synchronization per call: checks archive coverage,
/// fetches whatever is missing, merges it, and serves the requested slice.
///
/// Holds no state between calls beyond the store's persisted content. An
/// async mutex serializes the coverage-check → fetch → merge sequence so two
/// overlapping calls cannot append the same coordinates; merging only
/// happens after every planned unit succeeded, so an abandoned call never
/// leaves a partial batch behind.
pub struct Synchronizer {
    provider: Arc<dyn MatchProvider>,
    store: LocalStore,
    config: Config,
    wall_clock_year: Option<i32>,
    write_lock: Mutex<()>,
}

impl Synchronizer {
    /// Build a synchronizer against OpenLigaDB with a SQLite archive at the
    /// configured path.
    pub fn new(config: Config) -> Result<Self, SyncError> {
        config.validate()?;
        let provider = OpenLigaDb::new(
            &config.league,
            Some(&config.base_url),
            config.request_timeout_secs,
        )?;
        let store = LocalStore::open(&config.database_path)?;
        Ok(Self::with_parts(Arc::new(provider), store, config))
    }

    /// Wire up an explicit provider and store (dependency injection seam,
    /// also used by tests).
    pub fn with_parts(provider: Arc<dyn MatchProvider>, store: LocalStore, config: Config) -> Self {
        Synchronizer {
            provider,
            store,
            config,
            wall_clock_year: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Pin the wall-clock year used by the season calendar, for
    /// deterministic tests.
    pub fn with_wall_clock_year(mut self, year: i32) -> Self {
        self.wall_clock_year = Some(year);
        self
    }

    /// Shared handle to the underlying archive.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Return all finished matches with coordinates in `[start, end]`,
    /// synchronizing the archive with the remote source first if needed.
    ///
    /// The `{0,0}` sentinel on both endpoints switches to the
    /// [`fetch_upcoming`](Self::fetch_upcoming) mode.
    pub async fn fetch(
        &self,
        start: SeasonDate,
        end: SeasonDate,
    ) -> Result<Vec<MatchRecord>, SyncError> {
        if start.is_upcoming_sentinel() && end.is_upcoming_sentinel() {
            return self.fetch_upcoming().await;
        }

        let _guard = self.write_lock.lock().await;
        let last = self.store.last_coordinate()?;

        // Archive already covers the requested end: serve straight from the
        // store, zero remote queries. Finished matches never change, so the
        // slice is exact.
        if let Some(last) = last {
            if end <= last {
                // current season not probed on this path; the wall-clock
                // year bounds any valid season from above
                let max_season = self.wall_clock_year.unwrap_or_else(|| Utc::now().year());
                self.warn_if_invalid(start, end, max_season);
                debug!("archive covers {} (last: {}); skipping fetch", end, last);
                return Ok(self.store.read_range(start, end)?);
            }
        }

        let calendar = self.calendar();
        let current = calendar.current_matchday().await?;
        self.warn_if_invalid(start, end, current.season);

        let gap_start = last.map(SeasonDate::next).unwrap_or(ARCHIVE_START);

        if end <= current {
            // Requested end lies in the past; the archive is merely behind.
            self.fill_gap(gap_start, end).await?;
            Ok(self.store.read_range(start, end)?)
        } else {
            // Requested end is in the future: sync up to "now" and serve the
            // intersection of the request and availability.
            let start = if start > current {
                warn!(
                    "requested start {} is in the future; clamping to matchday 1/{}",
                    start, current.season
                );
                SeasonDate::new(1, current.season)
            } else {
                start
            };
            if last.map_or(true, |l| current > l) {
                self.fill_gap(gap_start, current).await?;
            }
            Ok(self.store.read_range(start, current)?)
        }
    }

    /// The not-yet-played fixtures of the current season: everything from
    /// the matchday after the current one through matchday 34. Bypasses the
    /// archive entirely.
    pub async fn fetch_upcoming(&self) -> Result<Vec<MatchRecord>, SyncError> {
        let current = self.calendar().current_matchday().await?;
        if current.matchday >= MATCHDAYS_PER_SEASON {
            // season fully played
            return Ok(Vec::new());
        }
        let units = plan(
            SeasonDate::new(current.matchday + 1, current.season),
            SeasonDate::new(MATCHDAYS_PER_SEASON, current.season),
        );
        info!(
            "fetching upcoming fixtures after {} ({} unit(s))",
            current,
            units.len()
        );
        let batches = self.fetch_units(&units).await?;
        Ok(batches
            .into_iter()
            .flatten()
            .filter(|m| !m.finished)
            .collect())
    }

    /// Fetch and merge the finished matches of `[gap_start, gap_end]`.
    /// All-or-nothing: nothing is appended unless every unit succeeded.
    async fn fill_gap(&self, gap_start: SeasonDate, gap_end: SeasonDate) -> Result<(), SyncError> {
        let units = plan(gap_start, gap_end);
        if units.is_empty() {
            return Ok(());
        }
        info!(
            "synchronizing {} remote unit(s) for {} .. {}",
            units.len(),
            gap_start,
            gap_end
        );
        let batches = self.fetch_units(&units).await?;
        let finished: Vec<MatchRecord> = batches
            .into_iter()
            .flatten()
            .filter(|m| m.finished)
            .collect();
        self.store.append(&finished)?;
        Ok(())
    }

    /// Issue all units of one plan concurrently. `join_all` preserves plan
    /// order, so the collected batches stay ascending by coordinate no
    /// matter which request finishes first.
    async fn fetch_units(&self, units: &[QueryUnit]) -> Result<Vec<Vec<MatchRecord>>, SyncError> {
        let fetches = units.iter().map(|&unit| self.fetch_unit_with_retry(unit));
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_unit_with_retry(&self, unit: QueryUnit) -> Result<Vec<MatchRecord>, SyncError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.fetch_unit(unit).await {
                Ok(records) => return Ok(records),
                // retrying won't fix a contract mismatch
                Err(err @ RemoteError::Format(_)) => return Err(err.into()),
                Err(RemoteError::Network(msg)) if attempt < self.config.fetch_attempts => {
                    let base = self.config.retry_backoff_ms * u64::from(attempt);
                    let jitter = rand::thread_rng().gen_range(0..=base / 4 + 1);
                    warn!(
                        "{} fetch of {:?} failed (attempt {}/{}): {}; retrying in {}ms",
                        self.provider.name(),
                        unit,
                        attempt,
                        self.config.fetch_attempts,
                        msg,
                        base + jitter
                    );
                    tokio::time::sleep(Duration::from_millis(base + jitter)).await;
                }
                Err(RemoteError::Network(msg)) => return Err(SyncError::Network(msg)),
            }
        }
    }

    fn calendar(&self) -> SeasonCalendar {
        match self.wall_clock_year {
            Some(year) => SeasonCalendar::with_wall_clock_year(Arc::clone(&self.provider), year),
            None => SeasonCalendar::new(Arc::clone(&self.provider)),
        }
    }

    fn warn_if_invalid(&self, start: SeasonDate, end: SeasonDate, max_season: i32) {
        if let Err(violation) = calendar::validate_range(start, end, max_season) {
            warn!(
                "requested range {} .. {} is out of bounds ({}); \
                 serving the nearest available data",
                start, end, violation
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::StaticProvider;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .try_init();
    }

    fn synchronizer(provider: StaticProvider, year: i32) -> (Arc<StaticProvider>, Synchronizer) {
        let provider = Arc::new(provider);
        let store = LocalStore::open_in_memory().unwrap();
        let config = Config {
            fetch_attempts: 1,
            retry_backoff_ms: 0,
            ..Config::default()
        };
        let sync = Synchronizer::with_parts(Arc::clone(&provider) as Arc<dyn MatchProvider>, store, config)
            .with_wall_clock_year(year);
        (provider, sync)
    }

    #[tokio::test]
    async fn test_empty_store_backfills_whole_season() {
        init_tracing();
        let (provider, sync) = synchronizer(StaticProvider::full_season(2004, 9), 2005);

        let records = sync
            .fetch(SeasonDate::new(1, 2004), SeasonDate::new(34, 2004))
            .await
            .unwrap();

        // 34 matchdays x 9 matches, ascending by coordinate.
        assert_eq!(records.len(), 306);
        assert!(records.windows(2).all(|w| w[0].coordinate <= w[1].coordinate));
        assert_eq!(records[0].coordinate, SeasonDate::new(1, 2004));
        assert_eq!(records[305].coordinate, SeasonDate::new(34, 2004));
        assert_eq!(sync.store().len().unwrap(), 306);

        // Season probe, matchday probe, one whole-season unit.
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_repeat_fetch_is_idempotent_and_offline() {
        let (provider, sync) = synchronizer(StaticProvider::full_season(2004, 9), 2005);
        let range = (SeasonDate::new(1, 2004), SeasonDate::new(34, 2004));

        let first = sync.fetch(range.0, range.1).await.unwrap();
        let calls_after_first = provider.call_count();

        let second = sync.fetch(range.0, range.1).await.unwrap();
        assert_eq!(first, second);
        // zero additional remote queries the second time
        assert_eq!(provider.call_count(), calls_after_first);
    }

    #[tokio::test]
    async fn test_subrange_of_covered_archive_is_exact() {
        let (_, sync) = synchronizer(StaticProvider::full_season(2004, 9), 2005);
        sync.fetch(SeasonDate::new(1, 2004), SeasonDate::new(34, 2004))
            .await
            .unwrap();

        let slice = sync
            .fetch(SeasonDate::new(10, 2004), SeasonDate::new(12, 2004))
            .await
            .unwrap();
        assert_eq!(slice.len(), 27);
        assert!(slice
            .iter()
            .all(|m| m.coordinate >= SeasonDate::new(10, 2004)
                && m.coordinate <= SeasonDate::new(12, 2004)));
    }

    #[tokio::test]
    async fn test_gap_continues_from_last_coordinate() {
        let provider = StaticProvider::full_season(2004, 9).with_season(2005, 9);
        let (provider, sync) = synchronizer(provider, 2006);

        sync.fetch(SeasonDate::new(1, 2004), SeasonDate::new(34, 2004))
            .await
            .unwrap();
        let records = sync
            .fetch(SeasonDate::new(1, 2004), SeasonDate::new(34, 2005))
            .await
            .unwrap();

        assert_eq!(records.len(), 612);
        // no coordinate appended twice
        assert_eq!(sync.store().len().unwrap(), 612);
        // 3 calls per sync: season probe, matchday probe, one season unit
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test]
    async fn test_failed_unit_leaves_store_untouched() {
        // Per-matchday gap 2..=34 of 2010 with matchday 17 failing.
        let provider = StaticProvider::failing_on(
            crate::remote::testing::season_records(2010, 9, 34),
            QueryUnit::Matchday {
                matchday: 17,
                season: 2010,
            },
        );
        let provider = Arc::new(provider);
        let store = LocalStore::open_in_memory().unwrap();
        store
            .append(&crate::remote::testing::season_records(2010, 9, 1)[..9])
            .unwrap();
        let config = Config {
            fetch_attempts: 1,
            retry_backoff_ms: 0,
            ..Config::default()
        };
        let sync = Synchronizer::with_parts(
            Arc::clone(&provider) as Arc<dyn MatchProvider>,
            store,
            config,
        )
        .with_wall_clock_year(2011);

        let err = sync
            .fetch(SeasonDate::new(1, 2010), SeasonDate::new(34, 2010))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
        // only the pre-seeded matchday survives; nothing partial merged
        assert_eq!(sync.store().len().unwrap(), 9);
    }

    #[tokio::test]
    async fn test_future_end_is_clamped_to_now() {
        // Season 2005 played through matchday 10.
        let provider = StaticProvider::season_in_progress(2005, 9, 10).with_season(2004, 9);
        let (_, sync) = synchronizer(provider, 2005);

        let records = sync
            .fetch(SeasonDate::new(1, 2005), SeasonDate::new(34, 2005))
            .await
            .unwrap();
        assert_eq!(records.len(), 90);
        assert_eq!(records.last().unwrap().coordinate, SeasonDate::new(10, 2005));
    }

    #[tokio::test]
    async fn test_future_start_is_clamped_to_season_opening() {
        let provider = StaticProvider::season_in_progress(2005, 9, 10).with_season(2004, 9);
        let (_, sync) = synchronizer(provider, 2005);

        let records = sync
            .fetch(SeasonDate::new(20, 2005), SeasonDate::new(34, 2005))
            .await
            .unwrap();
        // start clamped to (1, 2005), end to current (10, 2005)
        assert_eq!(records.len(), 90);
        assert_eq!(records[0].coordinate, SeasonDate::new(1, 2005));
    }

    #[tokio::test]
    async fn test_upcoming_fixtures_bypass_store() {
        let (_, sync) = synchronizer(StaticProvider::season_in_progress(2005, 9, 10), 2005);

        let upcoming = sync
            .fetch(SeasonDate::UPCOMING, SeasonDate::UPCOMING)
            .await
            .unwrap();

        // matchdays 11..=34, all unfinished with sentinel scores
        assert_eq!(upcoming.len(), 24 * 9);
        assert!(upcoming.iter().all(|m| !m.finished));
        assert!(upcoming.iter().all(|m| m.home_score == -1 && m.guest_score == -1));
        assert_eq!(upcoming[0].coordinate, SeasonDate::new(11, 2005));
        assert!(sync.store().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_upcoming_is_empty_when_season_over() {
        let (_, sync) = synchronizer(StaticProvider::full_season(2004, 9), 2005);
        let upcoming = sync.fetch_upcoming().await.unwrap();
        assert!(upcoming.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_bounds_range_is_served_not_rejected() {
        let (_, sync) = synchronizer(StaticProvider::full_season(2004, 9), 2005);
        // matchday 0 start is invalid; the call is warned about and served
        let records = sync
            .fetch(SeasonDate::new(0, 2004), SeasonDate::new(34, 2004))
            .await
            .unwrap();
        assert_eq!(records.len(), 306);
    }

    #[tokio::test]
    async fn test_network_failure_is_retried_per_unit() {
        // Matchday 17 fails on every attempt; the error still surfaces, but
        // the failing unit must have been tried fetch_attempts times.
        let provider = StaticProvider::failing_on(
            crate::remote::testing::season_records(2004, 1, 34),
            QueryUnit::Matchday {
                matchday: 17,
                season: 2004,
            },
        );
        let provider = Arc::new(provider);
        let store = LocalStore::open_in_memory().unwrap();
        let config = Config {
            fetch_attempts: 3,
            retry_backoff_ms: 0,
            ..Config::default()
        };
        let sync = Synchronizer::with_parts(
            Arc::clone(&provider) as Arc<dyn MatchProvider>,
            store,
            config,
        )
        .with_wall_clock_year(2005);

        let err = sync
            .fetch(SeasonDate::new(1, 2004), SeasonDate::new(17, 2004))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
        assert!(sync.store().is_empty().unwrap());
        // 2 calendar probes + 16 good units + 3 attempts on the failing one
        assert_eq!(provider.call_count(), 21);
    }
}
