//! Buffered statistics aggregator
//!
//! Records land in in-memory buckets and are committed in batches, trading
//! write latency for write frequency. The driver must call [`StatsAggregator::close`]
//! on every exit path so the last partial batch is not dropped.

use anyhow::Result;
use std::collections::HashMap;
use tracing::info;

use super::store::{BucketDelta, LevelStats, StatsStore};

/// Pending records before an automatic flush.
pub const FLUSH_INTERVAL: u32 = 100;

pub struct StatsAggregator {
    store: StatsStore,
    buckets: HashMap<u32, BucketDelta>,
    pending: u32,
}

impl StatsAggregator {
    pub fn new(store: StatsStore) -> Self {
        Self {
            store,
            buckets: HashMap::new(),
            pending: 0,
        }
    }

    /// Record a success at the pre-enhance level.
    pub fn record_success(&mut self, level: u32) -> Result<()> {
        self.record(level, |bucket| bucket.successes += 1)
    }

    /// Record a maintain at the held level.
    pub fn record_stay(&mut self, level: u32) -> Result<()> {
        self.record(level, |bucket| bucket.stays += 1)
    }

    /// Record a destroy at the pre-destroy level.
    pub fn record_break(&mut self, level: u32) -> Result<()> {
        self.record(level, |bucket| bucket.breaks += 1)
    }

    fn record(&mut self, level: u32, bump: impl FnOnce(&mut BucketDelta)) -> Result<()> {
        bump(self.buckets.entry(level).or_default());
        self.pending += 1;
        if self.pending >= FLUSH_INTERVAL {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit all pending buckets in one transaction. A no-op when nothing
    /// is pending.
    pub fn flush(&mut self) -> Result<()> {
        if self.buckets.is_empty() {
            return Ok(());
        }
        self.store.apply(&self.buckets)?;
        info!("💾 committed {} buffered enhancement records", self.pending);
        self.buckets.clear();
        self.pending = 0;
        Ok(())
    }

    /// Records buffered since the last flush.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Read-through to the store. Live totals require a flush first.
    pub fn stats(&self, level: u32) -> Result<Option<LevelStats>> {
        self.store.stats(level)
    }

    /// Read-through to the store, ordered by level.
    pub fn all_stats(&self) -> Result<Vec<LevelStats>> {
        self.store.all_stats()
    }

    /// Explicit finalizer: flush the last partial buffer and release the
    /// store. Must run exactly once, on every exit path.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}
