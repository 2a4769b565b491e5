//! Registry entry representation.

use filedrop_core::FileId;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

/// The stored form of a registry entry.
///
/// Identity and expiry are immutable once inserted. The two fields mutated
/// on download (`last_access_ms`, `download_count`) are per-entry atomic
/// cells, so updating one entry never contends with any other entry.
#[derive(Debug)]
pub(crate) struct StoredEntry {
    pub(crate) id: FileId,
    pub(crate) storage_key: String,
    pub(crate) original_name: String,
    pub(crate) size: u64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
    /// Last access time in unix milliseconds, updated with `fetch_max` so it
    /// is monotonically non-decreasing under concurrent downloads.
    pub(crate) last_access_ms: AtomicI64,
    pub(crate) download_count: AtomicU64,
}

pub(crate) fn to_millis(t: OffsetDateTime) -> i64 {
    i64::try_from(t.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

pub(crate) fn from_millis(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

impl StoredEntry {
    pub(crate) fn new(
        id: FileId,
        storage_key: String,
        original_name: String,
        size: u64,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Self {
        // All entry timestamps live at millisecond resolution, the precision
        // of the atomic last-access cell. A fresh entry's last access is
        // exactly its creation time.
        let now = from_millis(to_millis(now));
        // expires_at must stay strictly after created_at
        let ttl = ttl.max(Duration::from_millis(1));
        Self {
            id,
            storage_key,
            original_name,
            size,
            created_at: now,
            expires_at: now + ttl,
            last_access_ms: AtomicI64::new(to_millis(now)),
            download_count: AtomicU64::new(0),
        }
    }

    /// Whether the hard expiry deadline has passed as of `now`.
    pub(crate) fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Whether the entry has been unused for longer than `threshold` as of `now`.
    pub(crate) fn is_idle(&self, threshold: Duration, now: OffsetDateTime) -> bool {
        let last_access = from_millis(self.last_access_ms.load(Ordering::Relaxed));
        now - last_access >= threshold
    }

    pub(crate) fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            id: self.id,
            storage_key: self.storage_key.clone(),
            original_name: self.original_name.clone(),
            size: self.size,
            created_at: self.created_at,
            expires_at: self.expires_at,
            last_access_at: from_millis(self.last_access_ms.load(Ordering::Relaxed)),
            download_count: self.download_count.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of one registry entry.
///
/// Snapshots are internally consistent for the entry they were taken from,
/// but a list of snapshots is only weakly consistent as a whole.
#[derive(Clone, Debug)]
pub struct EntrySnapshot {
    /// File identifier.
    pub id: FileId,
    /// Opaque key into the blob store.
    pub storage_key: String,
    /// Display filename as the client supplied it.
    pub original_name: String,
    /// Blob size in bytes.
    pub size: u64,
    /// When the entry was created.
    pub created_at: OffsetDateTime,
    /// Hard expiry deadline, fixed at creation.
    pub expires_at: OffsetDateTime,
    /// Last successful download, or creation time if never downloaded.
    pub last_access_at: OffsetDateTime,
    /// Number of successful downloads.
    pub download_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_roundtrip() {
        let now = OffsetDateTime::now_utc();
        let back = from_millis(to_millis(now));
        // Sub-millisecond precision is dropped.
        assert!((now - back).whole_milliseconds().abs() < 1);
    }

    #[test]
    fn fresh_entry_is_not_expired() {
        let now = OffsetDateTime::now_utc();
        let entry = StoredEntry::new(
            FileId::new(),
            "key".to_string(),
            "a.txt".to_string(),
            3,
            Duration::from_secs(600),
            now,
        );
        assert!(!entry.is_expired(now));
        assert!(entry.is_expired(now + Duration::from_secs(600)));
        assert!(entry.expires_at > entry.created_at);
    }

    #[test]
    fn fresh_entry_access_time_equals_creation_time() {
        let now = OffsetDateTime::now_utc();
        let entry = StoredEntry::new(
            FileId::new(),
            "key".to_string(),
            "a.txt".to_string(),
            3,
            Duration::from_secs(600),
            now,
        );

        let snapshot = entry.snapshot();
        assert_eq!(snapshot.last_access_at, snapshot.created_at);
        assert!(snapshot.last_access_at >= snapshot.created_at);
    }

    #[test]
    fn zero_ttl_still_orders_expiry_after_creation() {
        let now = OffsetDateTime::now_utc();
        let entry = StoredEntry::new(
            FileId::new(),
            "key".to_string(),
            "a.txt".to_string(),
            0,
            Duration::ZERO,
            now,
        );
        assert!(entry.expires_at > entry.created_at);
    }

    #[test]
    fn idle_measured_from_last_access() {
        let now = OffsetDateTime::now_utc();
        let entry = StoredEntry::new(
            FileId::new(),
            "key".to_string(),
            "a.txt".to_string(),
            3,
            Duration::from_secs(600),
            now,
        );

        assert!(!entry.is_idle(Duration::from_secs(60), now));
        assert!(entry.is_idle(Duration::from_secs(60), now + Duration::from_secs(60)));

        // A later access resets idleness.
        entry
            .last_access_ms
            .store(to_millis(now + Duration::from_secs(50)), Ordering::Relaxed);
        assert!(!entry.is_idle(Duration::from_secs(60), now + Duration::from_secs(60)));
    }
}
