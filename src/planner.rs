use crate::calendar::{SeasonDate, MATCHDAYS_PER_SEASON};

/// One remote fetch: either a whole season or a single matchday.
/// Transient — produced by [`plan`], consumed by the client, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryUnit {
    Season(i32),
    Matchday { matchday: u32, season: i32 },
}

impl QueryUnit {
    pub fn season(&self) -> i32 {
        match *self {
            QueryUnit::Season(season) => season,
            QueryUnit::Matchday { season, .. } => season,
        }
    }
}

/// Produce the smallest ordered list of query units covering
/// `[start, end]` inclusive, preferring whole-season units whenever a season
/// is fully spanned.
///
/// Output is ascending by (season, matchday); the store's append path relies
/// on that ordering to keep its rows sorted without a separate sort step.
pub fn plan(start: SeasonDate, end: SeasonDate) -> Vec<QueryUnit> {
    let mut units = Vec::new();
    if start > end {
        return units;
    }

    if start.season == end.season {
        if start.matchday == 1 && end.matchday == MATCHDAYS_PER_SEASON {
            units.push(QueryUnit::Season(start.season));
        } else {
            for matchday in start.matchday..=end.matchday {
                units.push(QueryUnit::Matchday {
                    matchday,
                    season: start.season,
                });
            }
        }
        return units;
    }

    // Head season: per-matchday tail unless the range starts at matchday 1,
    // in which case the whole season is one unit.
    if start.matchday != 1 {
        for matchday in start.matchday..=MATCHDAYS_PER_SEASON {
            units.push(QueryUnit::Matchday {
                matchday,
                season: start.season,
            });
        }
        for season in start.season + 1..end.season {
            units.push(QueryUnit::Season(season));
        }
    } else {
        for season in start.season..end.season {
            units.push(QueryUnit::Season(season));
        }
    }

    // Tail season.
    if end.matchday != MATCHDAYS_PER_SEASON {
        for matchday in 1..=end.matchday {
            units.push(QueryUnit::Matchday {
                matchday,
                season: end.season,
            });
        }
    } else {
        units.push(QueryUnit::Season(end.season));
    }

    units
}
