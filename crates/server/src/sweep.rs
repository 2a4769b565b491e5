//! Periodic eviction sweeps.
//!
//! Two independent fixed-delay loops reclaim registry entries and their
//! blobs: the hard-expiry sweep (short period) and the idle-eviction sweep
//! (long period). Each loop sleeps again only after its previous run has
//! completed, so a slow run never overlaps itself. Both funnel through the
//! registry's conditional removal, so a racing download-path lazy cleanup
//! and a sweep can never both delete the same blob.

use crate::state::AppState;
use filedrop_registry::FileRegistry;
use filedrop_storage::{BlobStore, StorageError};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

/// Outcome of one sweep run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries examined.
    pub scanned: usize,
    /// Entries removed from the registry.
    pub removed: usize,
    /// Blob deletions that failed for a reason other than the blob already
    /// being gone. These are tolerated as orphans.
    pub delete_failures: usize,
}

/// Remove every entry whose hard expiry has passed, deleting its blob.
pub async fn run_expiry_sweep(registry: &FileRegistry, storage: &dyn BlobStore) -> SweepStats {
    let now = OffsetDateTime::now_utc();
    let mut stats = SweepStats::default();

    for id in registry.ids() {
        stats.scanned += 1;
        if let Some(entry) = registry.remove_expired(id, now) {
            stats.removed += 1;
            tracing::debug!(id = %id, name = %entry.original_name, "expired entry removed");
            delete_blob(storage, &entry.storage_key, &mut stats).await;
        }
    }

    stats
}

/// Remove every entry unused for at least `threshold`, independent of its
/// hard expiry, deleting its blob.
pub async fn run_idle_sweep(
    registry: &FileRegistry,
    storage: &dyn BlobStore,
    threshold: Duration,
) -> SweepStats {
    let now = OffsetDateTime::now_utc();
    let mut stats = SweepStats::default();

    for id in registry.ids() {
        stats.scanned += 1;
        if let Some(entry) = registry.remove_idle(id, threshold, now) {
            stats.removed += 1;
            tracing::debug!(id = %id, name = %entry.original_name, "idle entry evicted");
            delete_blob(storage, &entry.storage_key, &mut stats).await;
        }
    }

    stats
}

/// Best-effort blob deletion after a registry removal.
///
/// The caller has already won the removal, so it is the only one allowed to
/// touch the blob. An already-gone blob is fine; any other failure leaves an
/// orphan behind, which is an accepted, recoverable leak.
async fn delete_blob(storage: &dyn BlobStore, key: &str, stats: &mut SweepStats) {
    match storage.delete(key).await {
        Ok(()) => {}
        Err(StorageError::NotFound(_)) => {}
        Err(e) => {
            stats.delete_failures += 1;
            tracing::warn!(key = %key, error = %e, "blob delete failed, leaving orphan");
        }
    }
}

/// Spawn both sweep loops on fixed-delay cadences from the retention config.
///
/// Returns the task handles; dropping them does not cancel the loops.
pub fn spawn_sweepers(state: &AppState) -> (JoinHandle<()>, JoinHandle<()>) {
    let expiry_interval = state.config.retention.expiry_sweep_interval();
    let idle_interval = state.config.retention.idle_sweep_interval();
    let idle_threshold = state.config.retention.idle_threshold();

    let expiry_handle = {
        let registry = state.registry.clone();
        let storage = state.storage.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(expiry_interval).await;
                let stats = run_expiry_sweep(&registry, storage.as_ref()).await;
                if stats.removed > 0 || stats.delete_failures > 0 {
                    tracing::info!(
                        scanned = stats.scanned,
                        removed = stats.removed,
                        delete_failures = stats.delete_failures,
                        "hard-expiry sweep finished"
                    );
                }
            }
        })
    };

    let idle_handle = {
        let registry = state.registry.clone();
        let storage = state.storage.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(idle_interval).await;
                let stats = run_idle_sweep(&registry, storage.as_ref(), idle_threshold).await;
                if stats.removed > 0 || stats.delete_failures > 0 {
                    tracing::info!(
                        scanned = stats.scanned,
                        removed = stats.removed,
                        delete_failures = stats.delete_failures,
                        "idle-eviction sweep finished"
                    );
                }
            }
        })
    };

    (expiry_handle, idle_handle)
}
