use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InvalidRangeError, SyncError};
use crate::planner::QueryUnit;
use crate::remote::MatchProvider;

/// Rounds of fixtures in one Bundesliga season.
pub const MATCHDAYS_PER_SEASON: u32 = 34;

/// OpenLigaDB carries reliable data from this season onward.
pub const FIRST_ARCHIVED_SEASON: i32 = 2003;

/// Coordinate an empty archive backfills from.
pub const ARCHIVE_START: SeasonDate = SeasonDate {
    matchday: 1,
    season: 2004,
};

/// A (matchday, season) coordinate in the domain calendar.
///
/// Ordered by season first, then matchday. The `{0, 0}` value is a sentinel
/// meaning "the next unplayed fixtures of the current season" and is not a
/// point on the normal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonDate {
    pub matchday: u32,
    pub season: i32,
}

impl SeasonDate {
    /// Sentinel for the "upcoming fixtures" request mode.
    pub const UPCOMING: SeasonDate = SeasonDate {
        matchday: 0,
        season: 0,
    };

    pub fn new(matchday: u32, season: i32) -> Self {
        SeasonDate { matchday, season }
    }

    pub fn is_upcoming_sentinel(&self) -> bool {
        self.matchday == 0 && self.season == 0
    }

    /// The coordinate one matchday later, wrapping 34 into matchday 1 of the
    /// following season.
    pub fn next(self) -> SeasonDate {
        if self.matchday >= MATCHDAYS_PER_SEASON {
            SeasonDate::new(1, self.season + 1)
        } else {
            SeasonDate::new(self.matchday + 1, self.season)
        }
    }
}

impl Ord for SeasonDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.season
            .cmp(&other.season)
            .then(self.matchday.cmp(&other.matchday))
    }
}

impl PartialOrd for SeasonDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SeasonDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matchday {}/{}", self.matchday, self.season)
    }
}

/// Check both endpoints of a range against the domain bounds.
///
/// `max_season` is the newest season a caller may ask for (normally the
/// current one). The first violation found is returned; matchday bounds are
/// checked before season bounds so diagnostics stay deterministic.
pub fn validate_range(
    start: SeasonDate,
    end: SeasonDate,
    max_season: i32,
) -> Result<(), InvalidRangeError> {
    for matchday in [start.matchday, end.matchday] {
        if matchday == 0 || matchday > MATCHDAYS_PER_SEASON {
            return Err(InvalidRangeError::Matchday(matchday));
        }
    }
    for season in [start.season, end.season] {
        if season < FIRST_ARCHIVED_SEASON || season > max_season {
            return Err(InvalidRangeError::Season {
                season,
                max: max_season,
            });
        }
    }
    Ok(())
}

/// Resolves "now" into a concrete [`SeasonDate`] by probing the remote
/// source, since the calendar season spans two wall-clock years.
pub struct SeasonCalendar {
    provider: Arc<dyn MatchProvider>,
    wall_clock_year: i32,
}

impl SeasonCalendar {
    pub fn new(provider: Arc<dyn MatchProvider>) -> Self {
        Self::with_wall_clock_year(provider, Utc::now().year())
    }

    /// Pin the wall-clock year, for deterministic tests.
    pub fn with_wall_clock_year(provider: Arc<dyn MatchProvider>, year: i32) -> Self {
        SeasonCalendar {
            provider,
            wall_clock_year: year,
        }
    }

    /// The season currently being played. Any match of e.g. spring 2021
    /// still belongs to season 2020, so when the wall-clock year has no
    /// data yet the season is the year before.
    pub async fn current_season(&self) -> Result<i32, SyncError> {
        let probe = QueryUnit::Matchday {
            matchday: 1,
            season: self.wall_clock_year,
        };
        let matches = self.provider.fetch_unit(probe).await?;
        if matches.is_empty() {
            debug!(
                "no data yet for season {}; current season is {}",
                self.wall_clock_year,
                self.wall_clock_year - 1
            );
            Ok(self.wall_clock_year - 1)
        } else {
            Ok(self.wall_clock_year)
        }
    }

    /// The highest matchday of the current season with at least one finished
    /// match, scanning 34 downward. Defaults to matchday 1 when the season
    /// has not started.
    pub async fn current_matchday(&self) -> Result<SeasonDate, SyncError> {
        let season = self.current_season().await?;
        for matchday in (1..=MATCHDAYS_PER_SEASON).rev() {
            let probe = QueryUnit::Matchday { matchday, season };
            let matches = self.provider.fetch_unit(probe).await?;
            if matches.iter().any(|m| m.finished) {
                return Ok(SeasonDate::new(matchday, season));
            }
        }
        Ok(SeasonDate::new(1, season))
    }
}
