use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::SeasonDate;

/// Score carried by both sides of a match that has not been played yet.
/// A sentinel by convention, not "unknown".
pub const UNPLAYED_SCORE: i32 = -1;

/// One match as fetched from the remote source.
///
/// Immutable once created: `finished` is fixed at crawl time. A match is
/// never completed in place — its matchday is simply re-fetched once played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Kickoff time as published (local kickoff, no zone info).
    pub date_time: NaiveDateTime,
    pub coordinate: SeasonDate,
    pub home_team: String,
    pub guest_team: String,
    pub home_score: i32,
    pub guest_score: i32,
    pub finished: bool,
}
