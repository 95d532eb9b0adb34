pub mod openligadb;

pub use openligadb::OpenLigaDb;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::planner::QueryUnit;
use crate::store::models::MatchRecord;

/// Trait that every match-data provider must implement.
///
/// One call per query unit; a whole-season unit returns all matchdays of
/// that season in one response. An empty vec means "no data yet for this
/// unit" — the existence-probe signal, not an error. Providers do not retry;
/// retry policy lives in the synchronizer.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    async fn fetch_unit(&self, unit: QueryUnit) -> Result<Vec<MatchRecord>, RemoteError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
