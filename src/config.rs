use crate::error::SyncError;

/// Synchronizer configuration.
///
/// This is a library, so there is no CLI surface; consumers fill the struct
/// (or take [`Config::default`]) and hand it to
/// [`Synchronizer::new`](crate::Synchronizer::new).
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenLigaDB league slug ("bl1" = first Bundesliga)
    pub league: String,

    /// Remote API base URL
    pub base_url: String,

    /// SQLite archive path
    pub database_path: String,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    /// Attempts per query unit before a network failure is surfaced
    pub fetch_attempts: u32,

    /// Base backoff between retry attempts, in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            league: "bl1".to_string(),
            base_url: "https://api.openligadb.de/getmatchdata".to_string(),
            database_path: "matches.db".to_string(),
            request_timeout_secs: 10,
            fetch_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.league.is_empty() {
            return Err(SyncError::Config("league must not be empty".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(SyncError::Config("base_url must not be empty".to_string()));
        }
        if self.fetch_attempts == 0 {
            return Err(SyncError::Config(
                "fetch_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
