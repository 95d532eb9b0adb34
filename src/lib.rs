//! Incremental synchronization cache for Bundesliga match data.
//!
//! Historical results live in a durable, append-only SQLite archive that is
//! grown on demand from the OpenLigaDB REST source. A request for an
//! arbitrary `(matchday, season)` range is mapped onto the minimal set of
//! remote queries (whole seasons where possible), the freshly fetched
//! finished matches are merged exactly once, and the requested slice is
//! served back — including the distinguished "next unplayed fixtures" query.
//!
//! ```no_run
//! use buli_sync::{Config, SeasonDate, Synchronizer};
//!
//! # async fn run() -> Result<(), buli_sync::SyncError> {
//! let sync = Synchronizer::new(Config::default())?;
//! let season_2010 = sync
//!     .fetch(SeasonDate::new(1, 2010), SeasonDate::new(34, 2010))
//!     .await?;
//! let upcoming = sync.fetch_upcoming().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Prediction models and UI layers consume the returned records and the
//! archive's flat table; neither belongs to this crate.

pub mod calendar;
pub mod config;
pub mod error;
pub mod planner;
pub mod remote;
pub mod store;
pub mod sync;

pub use calendar::{SeasonCalendar, SeasonDate};
pub use config::Config;
pub use error::{InvalidRangeError, RemoteError, SyncError};
pub use planner::{plan, QueryUnit};
pub use remote::{MatchProvider, OpenLigaDb};
pub use store::models::MatchRecord;
pub use store::LocalStore;
pub use sync::Synchronizer;
