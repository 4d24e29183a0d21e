// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media-group aggregation.
//!
//! Telegram delivers an album as separate photo messages sharing one
//! `media_group_id`, with no end-of-batch marker. The cache collects file
//! refs per group in arrival order; consumers wait a short settle delay and
//! then take a snapshot copy. A background sweep evicts whole batches once
//! their oldest entry ages out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Whole-batch eviction age, measured from the batch's oldest entry.
const EVICT_AFTER: Duration = Duration::from_secs(10 * 60);

/// Sweep loop period.
const SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

/// How long consumers wait before snapshotting, so stragglers of the same
/// album have arrived.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

struct Entry {
    file_ref: String,
    inserted_at: Instant,
}

/// Concurrent cache of in-flight media batches.
///
/// Callers only ever receive copies of the ref sequence; nothing borrows
/// into the internal table.
#[derive(Default)]
pub struct MediaGroupCache {
    inner: RwLock<HashMap<String, Vec<Entry>>>,
}

impl MediaGroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one photo of a batch. Refs are kept exactly as they arrive:
    /// no reordering, no dedup.
    pub async fn append(&self, group_id: &str, file_ref: &str) {
        let mut table = self.inner.write().await;
        let batch = table.entry(group_id.to_string()).or_default();
        batch.push(Entry {
            file_ref: file_ref.to_string(),
            inserted_at: Instant::now(),
        });
        debug!(group_id, size = batch.len(), "media group entry cached");
    }

    /// Copy of the batch's refs in arrival order; empty when the batch is
    /// unknown (pre-start uploads, already evicted).
    pub async fn snapshot(&self, group_id: &str) -> Vec<String> {
        let table = self.inner.read().await;
        table
            .get(group_id)
            .map(|batch| batch.iter().map(|e| e.file_ref.clone()).collect())
            .unwrap_or_default()
    }

    /// Evict batches whose oldest entry is older than the eviction age.
    /// Returns the number of evicted batches.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    /// Sweep against an explicit "now", so eviction is testable without a
    /// real ten-minute wait.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut table = self.inner.write().await;
        let before = table.len();
        table.retain(|_, batch| {
            batch
                .first()
                .is_some_and(|oldest| now.duration_since(oldest.inserted_at) < EVICT_AFTER)
        });
        let evicted = before - table.len();
        if evicted > 0 {
            debug!(evicted, "media group sweep");
        }
        evicted
    }

    /// Periodic sweep until cancellation.
    pub async fn run_sweep_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(SWEEP_PERIOD);
        ticker.tick().await; // immediate first tick is a no-op pass
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = cancel.cancelled() => {
                    info!("media group sweep loop stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_preserves_arrival_order() {
        let cache = MediaGroupCache::new();
        cache.append("band", "a").await;
        cache.append("band", "b").await;
        cache.append("band", "c").await;
        assert_eq!(cache.snapshot("band").await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn unknown_group_snapshots_empty() {
        let cache = MediaGroupCache::new();
        assert!(cache.snapshot("nope").await.is_empty());
    }

    #[tokio::test]
    async fn repeated_refs_are_kept_in_arrival_order() {
        let cache = MediaGroupCache::new();
        cache.append("band", "a").await;
        cache.append("band", "a").await;
        cache.append("band", "b").await;
        assert_eq!(cache.snapshot("band").await, vec!["a", "a", "b"]);
    }

    #[tokio::test]
    async fn groups_are_independent() {
        let cache = MediaGroupCache::new();
        cache.append("one", "a").await;
        cache.append("two", "b").await;
        assert_eq!(cache.snapshot("one").await, vec!["a"]);
        assert_eq!(cache.snapshot("two").await, vec!["b"]);
    }

    #[tokio::test]
    async fn sweep_evicts_whole_batch_past_age() {
        let cache = MediaGroupCache::new();
        cache.append("old", "a").await;
        cache.append("old", "b").await;

        // Just under the threshold: kept.
        let almost = Instant::now() + Duration::from_secs(9 * 60);
        assert_eq!(cache.sweep_at(almost).await, 0);
        assert_eq!(cache.snapshot("old").await.len(), 2);

        // Past the threshold: the whole batch goes at once.
        let late = Instant::now() + Duration::from_secs(11 * 60);
        assert_eq!(cache.sweep_at(late).await, 1);
        assert!(cache.snapshot("old").await.is_empty());
    }

    #[tokio::test]
    async fn eviction_age_is_measured_from_oldest_entry() {
        let cache = MediaGroupCache::new();
        cache.append("band", "early").await;
        // A late straggler does not refresh the batch's age.
        cache.append("band", "late").await;
        let late = Instant::now() + Duration::from_secs(11 * 60);
        assert_eq!(cache.sweep_at(late).await, 1);
    }
}
