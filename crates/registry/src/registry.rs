//! The concurrent file registry.

use crate::entry::{EntrySnapshot, StoredEntry, to_millis};
use crate::error::{RegistryError, RegistryResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use filedrop_core::FileId;
use std::sync::atomic::Ordering;
use std::time::Duration;
use time::OffsetDateTime;

/// Concurrent map from [`FileId`] to registry entry.
///
/// Expiry is authoritative before any sweep physically removes an entry:
/// every read path treats an entry whose deadline has passed as absent
/// (lazy expiry). Removal goes through a single conditional primitive so
/// that, however many sweeps and requests race on the same ID, exactly one
/// caller receives the entry back and becomes responsible for the blob.
#[derive(Debug, Default)]
pub struct FileRegistry {
    entries: DashMap<FileId, StoredEntry>,
}

impl FileRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh unique ID and insert a new entry.
    ///
    /// The entry starts with `expires_at = now + ttl`, `last_access_at =
    /// now` and a zero download count. Pure map insert; no I/O.
    pub fn create(
        &self,
        storage_key: impl Into<String>,
        original_name: impl Into<String>,
        size: u64,
        ttl: Duration,
    ) -> FileId {
        self.register(FileId::new(), storage_key, original_name, size, ttl)
    }

    /// Insert a new entry under a caller-provided ID, normally the one the
    /// upload path embedded in the blob key.
    ///
    /// Returns the ID the entry ended up under. On the effectively
    /// unreachable collision with a live entry the ID is regenerated rather
    /// than overwriting.
    pub fn register(
        &self,
        id: FileId,
        storage_key: impl Into<String>,
        original_name: impl Into<String>,
        size: u64,
        ttl: Duration,
    ) -> FileId {
        let now = OffsetDateTime::now_utc();
        let mut entry = StoredEntry::new(id, storage_key.into(), original_name.into(), size, ttl, now);
        let mut id = id;
        loop {
            match self.entries.entry(id) {
                Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                    return id;
                }
                Entry::Occupied(_) => {
                    id = FileId::new();
                    entry.id = id;
                }
            }
        }
    }

    /// Get a snapshot of a live entry.
    ///
    /// Returns `None` for unknown ids and for entries whose expiry deadline
    /// has passed, even if no sweep has removed them yet.
    pub fn get(&self, id: FileId) -> Option<EntrySnapshot> {
        let entry = self.entries.get(&id)?;
        if entry.is_expired(OffsetDateTime::now_utc()) {
            return None;
        }
        Some(entry.snapshot())
    }

    /// Record a successful download: bump `last_access_at` to now and
    /// increment the download counter by exactly one.
    ///
    /// Both updates are atomic cells on the entry, so concurrent calls never
    /// lose increments and never block operations on other entries.
    pub fn record_access(&self, id: FileId) -> RegistryResult<()> {
        let Some(entry) = self.entries.get(&id) else {
            return Err(RegistryError::NotFound(id));
        };
        let now_ms = to_millis(OffsetDateTime::now_utc());
        entry.last_access_ms.fetch_max(now_ms, Ordering::Relaxed);
        entry.download_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Remove an entry unconditionally, returning its final snapshot.
    ///
    /// At most one of any number of racing callers receives the entry; the
    /// rest see `None`. The winner is responsible for releasing the blob.
    pub fn remove(&self, id: FileId) -> Option<EntrySnapshot> {
        self.remove_if(id, |_| true)
    }

    /// Remove an entry only if its expiry deadline has passed as of `now`.
    ///
    /// Used by the hard-expiry sweep and by request-path lazy cleanup.
    pub fn remove_expired(&self, id: FileId, now: OffsetDateTime) -> Option<EntrySnapshot> {
        self.remove_if(id, |entry| entry.is_expired(now))
    }

    /// Remove an entry only if it has been unused for at least `threshold`
    /// as of `now`, independent of its hard expiry.
    pub fn remove_idle(
        &self,
        id: FileId,
        threshold: Duration,
        now: OffsetDateTime,
    ) -> Option<EntrySnapshot> {
        self.remove_if(id, |entry| entry.is_idle(threshold, now))
    }

    /// The single removal primitive all eviction paths funnel through.
    /// The predicate is evaluated under the entry's shard lock, so the
    /// decision and the removal are atomic with respect to other mutations.
    fn remove_if(
        &self,
        id: FileId,
        predicate: impl FnOnce(&StoredEntry) -> bool,
    ) -> Option<EntrySnapshot> {
        self.entries
            .remove_if(&id, |_, entry| predicate(entry))
            .map(|(_, entry)| entry.snapshot())
    }

    /// Point-in-time snapshots of all live entries.
    ///
    /// Weakly consistent: no global lock is taken, each entry is read in
    /// some consistent state, and entries inserted or removed during the
    /// iteration may or may not appear.
    pub fn list_all(&self) -> Vec<EntrySnapshot> {
        let now = OffsetDateTime::now_utc();
        self.entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.snapshot())
            .collect()
    }

    /// IDs of every entry currently in the map, expired ones included.
    ///
    /// Sweeps iterate this and apply their conditional removal per ID, so a
    /// concurrent refresh between collection and removal is harmless.
    pub fn ids(&self) -> Vec<FileId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// The most recently created live entry whose original filename matches.
    pub fn find_latest_by_name(&self, name: &str) -> Option<EntrySnapshot> {
        let now = OffsetDateTime::now_utc();
        self.entries
            .iter()
            .filter(|entry| entry.original_name == name && !entry.is_expired(now))
            .max_by_key(|entry| entry.created_at)
            .map(|entry| entry.snapshot())
    }

    /// Number of entries physically present, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn short_ttl() -> Duration {
        Duration::from_millis(5)
    }

    fn long_ttl() -> Duration {
        Duration::from_secs(600)
    }

    #[test]
    fn create_then_get() {
        let registry = FileRegistry::new();
        let id = registry.create("key_a.txt", "a.txt", 5, long_ttl());

        let entry = registry.get(id).expect("entry should be live");
        assert_eq!(entry.id, id);
        assert_eq!(entry.storage_key, "key_a.txt");
        assert_eq!(entry.original_name, "a.txt");
        assert_eq!(entry.size, 5);
        assert_eq!(entry.download_count, 0);
        assert_eq!(entry.last_access_at, entry.created_at);
        assert!(entry.expires_at > entry.created_at);
    }

    #[test]
    fn get_unknown_is_none() {
        let registry = FileRegistry::new();
        assert!(registry.get(FileId::new()).is_none());
    }

    #[test]
    fn lazy_expiry_hides_entry_before_sweep() {
        let registry = FileRegistry::new();
        let id = registry.create("k", "a.txt", 1, short_ttl());

        assert!(registry.get(id).is_some());
        thread::sleep(Duration::from_millis(20));

        // Expired but not yet physically removed.
        assert!(registry.get(id).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn record_access_updates_counter_and_timestamp() {
        let registry = FileRegistry::new();
        let id = registry.create("k", "a.txt", 1, long_ttl());
        let before = registry.get(id).unwrap();

        thread::sleep(Duration::from_millis(5));
        registry.record_access(id).unwrap();

        let after = registry.get(id).unwrap();
        assert_eq!(after.download_count, 1);
        assert!(after.last_access_at >= before.last_access_at);
        assert!(after.last_access_at >= after.created_at);
    }

    #[test]
    fn record_access_unknown_reports_not_found() {
        let registry = FileRegistry::new();
        assert!(matches!(
            registry.record_access(FileId::new()),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_record_access_loses_no_increments() {
        let registry = Arc::new(FileRegistry::new());
        let id = registry.create("k", "a.txt", 1, long_ttl());

        let threads = 8;
        let per_thread = 500;
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        registry.record_access(id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entry = registry.get(id).unwrap();
        assert_eq!(entry.download_count, threads * per_thread);
    }

    #[test]
    fn remove_has_one_winner() {
        let registry = FileRegistry::new();
        let id = registry.create("k", "a.txt", 1, long_ttl());

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn concurrent_remove_has_one_winner() {
        let registry = Arc::new(FileRegistry::new());
        let id = registry.create("k", "a.txt", 1, long_ttl());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.remove(id).is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_expired_leaves_live_entries() {
        let registry = FileRegistry::new();
        let live = registry.create("k1", "a.txt", 1, long_ttl());
        let dead = registry.create("k2", "b.txt", 1, short_ttl());
        thread::sleep(Duration::from_millis(20));

        let now = OffsetDateTime::now_utc();
        assert!(registry.remove_expired(live, now).is_none());
        assert!(registry.remove_expired(dead, now).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_idle_is_independent_of_expiry() {
        let registry = FileRegistry::new();
        let id = registry.create("k", "a.txt", 1, long_ttl());
        thread::sleep(Duration::from_millis(20));

        let now = OffsetDateTime::now_utc();
        // Not idle yet with a generous threshold.
        assert!(
            registry
                .remove_idle(id, Duration::from_secs(60), now)
                .is_none()
        );
        // Idle with a tiny threshold even though the hard expiry is far away.
        assert!(
            registry
                .remove_idle(id, Duration::from_millis(10), now)
                .is_some()
        );
    }

    #[test]
    fn record_access_defers_idle_eviction() {
        let registry = FileRegistry::new();
        let id = registry.create("k", "a.txt", 1, long_ttl());
        thread::sleep(Duration::from_millis(20));
        registry.record_access(id).unwrap();

        let now = OffsetDateTime::now_utc();
        assert!(
            registry
                .remove_idle(id, Duration::from_millis(15), now)
                .is_none()
        );
    }

    #[test]
    fn list_all_excludes_expired() {
        let registry = FileRegistry::new();
        let live = registry.create("k1", "a.txt", 1, long_ttl());
        let _dead = registry.create("k2", "b.txt", 1, short_ttl());
        thread::sleep(Duration::from_millis(20));

        let listed = registry.list_all();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, live);

        // ids() still reports both for the sweeps.
        assert_eq!(registry.ids().len(), 2);
    }

    #[test]
    fn find_latest_by_name_picks_newest_live_match() {
        let registry = FileRegistry::new();
        let _old = registry.create("k1", "a.txt", 1, long_ttl());
        thread::sleep(Duration::from_millis(5));
        let newest = registry.create("k2", "a.txt", 1, long_ttl());
        let _other = registry.create("k3", "b.txt", 1, long_ttl());

        let found = registry.find_latest_by_name("a.txt").unwrap();
        assert_eq!(found.id, newest);
        assert!(registry.find_latest_by_name("missing.txt").is_none());
    }

    #[test]
    fn register_regenerates_id_on_collision() {
        let registry = FileRegistry::new();
        let id = registry.create("k1", "a.txt", 1, long_ttl());

        let other = registry.register(id, "k2", "b.txt", 1, long_ttl());
        assert_ne!(other, id);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(id).unwrap().original_name, "a.txt");
        assert_eq!(registry.get(other).unwrap().original_name, "b.txt");
    }
}
