//! Buffered per-level enhancement statistics persisted to SQLite

pub mod aggregator;
pub mod store;

pub use aggregator::{StatsAggregator, FLUSH_INTERVAL};
pub use store::{BucketDelta, LevelStats, StatsStore};
