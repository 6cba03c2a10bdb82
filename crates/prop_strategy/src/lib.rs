//! Player-prop strategy crate.
//!
//! Prices over/under player props against the bookmaker consensus,
//! adjusts for an outside fair line, ranks value plays, and finds
//! cross-bookmaker edges for a single target book.

pub mod adjust;
pub mod cache;
pub mod config;
pub mod edge;
pub mod odds;
pub mod quotes;
pub mod ranker;
pub mod snapshot;
pub mod stats;

pub use adjust::{adjusted_ev, Adjustment};
pub use cache::SnapshotCache;
pub use config::{AdjusterParams, EdgeConfig, LineSanity, RankerConfig};
pub use edge::{ComparisonType, EdgeFinder, EdgeRecord, EdgeScan, EdgeSummary};
pub use quotes::{collect_bookmakers, extract_quotes, BookQuote, MedianQuote, QuoteBook};
pub use ranker::{Ranking, ValuePlay, ValuePlayRanker};
pub use snapshot::Snapshot;
pub use stats::{DataWarning, EnrichedStat, StatsAggregator, StatsReport};
