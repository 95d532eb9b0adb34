use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::calendar::SeasonDate;
use crate::error::RemoteError;
use crate::planner::QueryUnit;
use crate::store::models::{MatchRecord, UNPLAYED_SCORE};

use super::MatchProvider;

/// Match-data provider backed by the OpenLigaDB REST API.
/// Docs: <https://api.openligadb.de>
pub struct OpenLigaDb {
    http: Client,
    /// League slug, e.g. "bl1" for the first Bundesliga.
    league: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl OpenLigaDb {
    pub fn new(
        league: &str,
        base_url: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(OpenLigaDb {
            http,
            league: league.to_string(),
            base_url: base_url
                .unwrap_or("https://api.openligadb.de/getmatchdata")
                .to_string(),
        })
    }

    fn unit_url(&self, unit: QueryUnit) -> String {
        match unit {
            QueryUnit::Season(season) => {
                format!("{}/{}/{}", self.base_url, self.league, season)
            }
            QueryUnit::Matchday { matchday, season } => {
                format!("{}/{}/{}/{}", self.base_url, self.league, season, matchday)
            }
        }
    }
}

#[async_trait]
impl MatchProvider for OpenLigaDb {
    fn name(&self) -> &str {
        "OpenLigaDB"
    }

    async fn fetch_unit(&self, unit: QueryUnit) -> Result<Vec<MatchRecord>, RemoteError> {
        let url = self.unit_url(unit);
        debug!("Fetching match data from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(format!("OpenLigaDB request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RemoteError::Network(format!(
                "OpenLigaDB error: {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Network(format!("failed reading body: {e}")))?;

        parse_match_data(&body, unit.season())
    }
}

// ── Parsing ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatch {
    match_date_time: String,
    group: RawGroup,
    team1: RawTeam,
    team2: RawTeam,
    #[serde(default)]
    match_results: Vec<RawResult>,
    match_is_finished: bool,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(rename = "groupOrderID")]
    group_order_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTeam {
    team_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResult {
    points_team1: i32,
    points_team2: i32,
}

/// Parse one response body into classified match records.
///
/// An empty list deserializes to an empty vec — "no data yet for this unit".
/// A payload that is present but missing expected fields is a format error,
/// distinct from transport failure.
fn parse_match_data(body: &str, season: i32) -> Result<Vec<MatchRecord>, RemoteError> {
    let raw: Vec<RawMatch> = serde_json::from_str(body)
        .map_err(|e| RemoteError::Format(format!("unexpected OpenLigaDB payload: {e}")))?;
    raw.into_iter().map(|m| into_record(m, season)).collect()
}

fn into_record(raw: RawMatch, season: i32) -> Result<MatchRecord, RemoteError> {
    let date_time: NaiveDateTime = raw.match_date_time.parse().map_err(|e| {
        RemoteError::Format(format!(
            "bad matchDateTime '{}': {e}",
            raw.match_date_time
        ))
    })?;

    let (home_score, guest_score) = if raw.match_is_finished {
        let result = raw.match_results.first().ok_or_else(|| {
            RemoteError::Format("finished match without matchResults".to_string())
        })?;
        (result.points_team1, result.points_team2)
    } else {
        (UNPLAYED_SCORE, UNPLAYED_SCORE)
    };

    Ok(MatchRecord {
        date_time,
        coordinate: SeasonDate::new(raw.group.group_order_id, season),
        home_team: raw.team1.team_name,
        guest_team: raw.team2.team_name,
        home_score,
        guest_score,
        finished: raw.match_is_finished,
    })
}
