//! Timestamped snapshot cache with a max-age refresh policy.
//!
//! Owned by whoever drives repeated scans; there is no global state.

use chrono::{DateTime, Duration, Utc};
use common::Result;
use tracing::{debug, warn};

use crate::snapshot::Snapshot;

/// Holds the most recent snapshot and when it was loaded.
#[derive(Debug)]
pub struct SnapshotCache {
    entry: Option<Snapshot>,
    max_age: Duration,
    refreshes: u64,
}

impl SnapshotCache {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            entry: None,
            max_age: Duration::seconds(max_age_secs.min(i32::MAX as u64) as i64),
            refreshes: 0,
        }
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match &self.entry {
            Some(snapshot) => now - snapshot.loaded_at > self.max_age,
            None => true,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Return the cached snapshot, reloading it first if it is stale.
    /// A failed reload serves the previous entry; it is an error only when
    /// nothing has been loaded yet.
    pub fn get_or_refresh<F>(&mut self, load: F) -> Result<&Snapshot>
    where
        F: FnOnce() -> Result<Snapshot>,
    {
        if self.is_stale() {
            match load() {
                Ok(snapshot) => {
                    debug!(rows = snapshot.len(), "snapshot cache refreshed");
                    self.entry = Some(snapshot);
                    self.refreshes += 1;
                }
                Err(e) if self.entry.is_some() => {
                    warn!("Snapshot reload failed, serving previous entry: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        match &self.entry {
            Some(snapshot) => Ok(snapshot),
            None => Err(common::Error::Snapshot("cache is empty".into())),
        }
    }

    pub fn get(&self) -> Option<&Snapshot> {
        self.entry.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}
