use thiserror::Error;

/// A requested range endpoint lies outside the domain bounds.
///
/// Reported, not fatal: the synchronizer logs the violation and serves the
/// nearest available data instead of rejecting the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRangeError {
    #[error("matchday {0} is outside 1..=34")]
    Matchday(u32),

    #[error("season {season} is outside 2003..={max}")]
    Season { season: i32, max: i32 },
}

/// Error raised by a match-data provider for a single query unit.
///
/// An empty result is *not* an error — the remote source answers existence
/// probes with an empty list, which callers receive as `Ok(vec![])`.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport-level failure (connection, timeout, non-success status).
    /// Transient; safe to retry.
    #[error("network failure: {0}")]
    Network(String),

    /// The payload arrived but is missing expected fields. Retrying won't
    /// fix a contract mismatch, so this is never auto-retried.
    #[error("remote payload mismatch: {0}")]
    Format(String),
}

/// Error surfaced to callers of [`Synchronizer::fetch`](crate::Synchronizer::fetch).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid range: {0}")]
    InvalidRange(#[from] InvalidRangeError),

    /// The fetching phase failed after exhausting retries. The local store
    /// is exactly as it was before the call.
    #[error("network failure while synchronizing: {0}")]
    Network(String),

    #[error("remote contract mismatch: {0}")]
    RemoteFormat(String),

    #[error("local store error")]
    Store(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(msg) => SyncError::Network(msg),
            RemoteError::Format(msg) => SyncError::RemoteFormat(msg),
        }
    }
}
