//! In-memory announcement log.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments. Also the read side of [`FileAnnouncer`].
//!
//! [`FileAnnouncer`]: crate::FileAnnouncer

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use dispas_core::error::{DispasError, Result};
use dispas_core::traits::AnnouncementLog;
use dispas_core::types::{Announcement, AnnouncementStats};

/// In-memory announcement log.
///
/// Entries live in one vector indexed by `sequence - 1`; the vector's
/// write lock is the single writer lock that orders appends.
///
/// # Indexing
///
/// Besides sequence order, announcements are indexed by view tag
/// (one bucket per tag value).
#[derive(Debug)]
pub struct MemoryAnnouncer {
    /// Log entries in sequence order
    entries: RwLock<Vec<Announcement>>,
    /// View tag index: tag → [sequences]
    view_tag_index: DashMap<u8, Vec<u64>>,
    /// Log statistics
    stats: RwLock<AnnouncementStats>,
}

impl MemoryAnnouncer {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            view_tag_index: DashMap::new(),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Creates a log with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::with_capacity(capacity)),
            view_tag_index: DashMap::with_capacity(256),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.stats.read().clone()
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns every announcement in sequence order (for export/backup).
    pub fn all_announcements(&self) -> Vec<Announcement> {
        self.entries.read().clone()
    }

    /// Restores announcements that already carry their sequence numbers.
    ///
    /// Sequences must continue the log without gaps; the first offending
    /// entry aborts the import with `LogCorrupted`, keeping what came before.
    pub fn import(&self, announcements: Vec<Announcement>) -> Result<usize> {
        let mut imported = 0;
        for announcement in announcements {
            announcement.validate()?;
            self.insert_sequenced(announcement)?;
            imported += 1;
        }
        Ok(imported)
    }

    /// Sequence the next append will receive.
    pub(crate) fn next_sequence(&self) -> u64 {
        self.entries.read().len() as u64 + 1
    }

    /// Stores an announcement whose sequence was assigned by the caller.
    pub(crate) fn insert_sequenced(&self, announcement: Announcement) -> Result<u64> {
        let mut entries = self.entries.write();
        let expected = entries.len() as u64 + 1;
        if announcement.sequence != expected {
            return Err(DispasError::LogCorrupted(format!(
                "expected sequence {}, found {}",
                expected, announcement.sequence
            )));
        }
        Ok(self.store(&mut entries, announcement))
    }

    fn store(&self, entries: &mut Vec<Announcement>, announcement: Announcement) -> u64 {
        let sequence = announcement.sequence;
        self.view_tag_index
            .entry(announcement.view_tag)
            .or_default()
            .push(sequence);
        self.stats.write().add(&announcement);
        entries.push(announcement);
        sequence
    }
}

impl Default for MemoryAnnouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnouncementLog for MemoryAnnouncer {
    /// Validates the announcement and assigns it the next sequence.
    #[instrument(skip(self, announcement), fields(view_tag = announcement.view_tag))]
    async fn append(&self, mut announcement: Announcement) -> Result<u64> {
        announcement.validate()?;

        let mut entries = self.entries.write();
        announcement.sequence = entries.len() as u64 + 1;
        let sequence = self.store(&mut entries, announcement);

        debug!(sequence, "Announcement appended");
        Ok(sequence)
    }

    #[instrument(skip(self))]
    async fn query_window(&self, from: u64, to: u64) -> Result<Vec<Announcement>> {
        let entries = self.entries.read();
        let start = from.max(1);
        let end = to.min(entries.len() as u64);
        if start > end {
            return Ok(Vec::new());
        }

        let window = entries[(start - 1) as usize..end as usize].to_vec();
        debug!(count = window.len(), "Window retrieved");
        Ok(window)
    }

    async fn get(&self, sequence: u64) -> Result<Option<Announcement>> {
        if sequence == 0 {
            return Ok(None);
        }
        Ok(self.entries.read().get((sequence - 1) as usize).cloned())
    }

    /// O(1) bucket lookup, then one clone per entry in the bucket.
    #[instrument(skip(self))]
    async fn get_by_view_tag(&self, view_tag: u8) -> Result<Vec<Announcement>> {
        let sequences = match self.view_tag_index.get(&view_tag) {
            Some(bucket) => bucket.clone(),
            None => return Ok(Vec::new()),
        };

        let entries = self.entries.read();
        let announcements: Vec<Announcement> = sequences
            .iter()
            .filter_map(|seq| entries.get((*seq - 1) as usize).cloned())
            .collect();

        debug!(view_tag, count = announcements.len(), "Retrieved by view tag");
        Ok(announcements)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }

    async fn latest_sequence(&self) -> Result<Option<u64>> {
        let len = self.len() as u64;
        Ok((len > 0).then_some(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispas_core::types::PublicKey;
    use dispas_core::Address;

    const EPHEMERAL: &str = "023c72addb4fdf09af94f0c94d7fe92a386a7e70cf8a1d85916386bb2535c7b1b1";

    fn make_test_announcement(view_tag: u8) -> Announcement {
        Announcement::new(
            Address::repeat_byte(view_tag.wrapping_add(1)),
            PublicKey::from_hex(EPHEMERAL).unwrap(),
            view_tag,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let log = MemoryAnnouncer::new();

        let seq = log.append(make_test_announcement(0x42)).await.unwrap();
        assert_eq!(seq, 1);

        let retrieved = log.get(seq).await.unwrap().unwrap();
        assert_eq!(retrieved.view_tag, 0x42);
        assert_eq!(retrieved.sequence, 1);
        assert!(log.get(0).await.unwrap().is_none());
        assert!(log.get(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequences_are_contiguous() {
        let log = MemoryAnnouncer::new();

        for expected in 1..=5 {
            let seq = log.append(make_test_announcement(expected as u8)).await.unwrap();
            assert_eq!(seq, expected);
        }
        assert_eq!(log.latest_sequence().await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_caller_supplied_sequence_is_ignored() {
        let log = MemoryAnnouncer::new();
        let mut ann = make_test_announcement(0x01);
        ann.sequence = 99;

        assert_eq!(log.append(ann).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_window() {
        let log = MemoryAnnouncer::new();
        for tag in 0..10u8 {
            log.append(make_test_announcement(tag)).await.unwrap();
        }

        let window = log.query_window(3, 6).await.unwrap();
        let sequences: Vec<u64> = window.iter().map(|a| a.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5, 6]);

        // Bounds are clamped to the log
        assert_eq!(log.query_window(0, 100).await.unwrap().len(), 10);
        assert!(log.query_window(11, 20).await.unwrap().is_empty());
        assert!(log.query_window(6, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_log() {
        let log = MemoryAnnouncer::new();
        assert_eq!(log.count().await.unwrap(), 0);
        assert_eq!(log.latest_sequence().await.unwrap(), None);
        assert!(log.query_window(1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_view_tag() {
        let log = MemoryAnnouncer::new();

        log.append(make_test_announcement(0x42)).await.unwrap();
        log.append(make_test_announcement(0x42)).await.unwrap();
        log.append(make_test_announcement(0x00)).await.unwrap();

        let matching = log.get_by_view_tag(0x42).await.unwrap();
        assert_eq!(matching.len(), 2);
        assert_eq!(matching[1].sequence, 2);

        assert_eq!(log.get_by_view_tag(0x00).await.unwrap().len(), 1);
        assert!(log.get_by_view_tag(0xFF).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let log = MemoryAnnouncer::new();

        log.append(make_test_announcement(0x42)).await.unwrap();
        log.append(make_test_announcement(0x42)).await.unwrap();
        log.append(make_test_announcement(0x00)).await.unwrap();

        let stats = log.stats();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.view_tag_distribution[0x42], 2);
        assert_eq!(stats.view_tag_distribution[0x00], 1);
    }

    #[tokio::test]
    async fn test_invalid_announcement_rejected() {
        let log = MemoryAnnouncer::new();

        let mut invalid = make_test_announcement(0x01);
        invalid.stealth_address = Address::ZERO;

        assert!(log.append(invalid).await.is_err());
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_import_export() {
        let source = MemoryAnnouncer::new();
        source.append(make_test_announcement(0x01)).await.unwrap();
        source.append(make_test_announcement(0x02)).await.unwrap();

        let copy = MemoryAnnouncer::new();
        assert_eq!(copy.import(source.all_announcements()).unwrap(), 2);
        assert_eq!(copy.next_sequence(), 3);
        assert_eq!(copy.get(2).await.unwrap(), source.get(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_import_rejects_gaps() {
        let log = MemoryAnnouncer::new();
        let mut first = make_test_announcement(0x01);
        first.sequence = 1;
        let mut third = make_test_announcement(0x03);
        third.sequence = 3;

        let result = log.import(vec![first, third]);
        assert!(matches!(result, Err(DispasError::LogCorrupted(_))));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_append() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let log = Arc::new(MemoryAnnouncer::new());
        let mut tasks = JoinSet::new();

        for i in 0..100u8 {
            let log = log.clone();
            tasks.spawn(async move { log.append(make_test_announcement(i)).await.unwrap() });
        }

        let mut sequences = Vec::new();
        while let Some(result) = tasks.join_next().await {
            sequences.push(result.unwrap());
        }
        sequences.sort_unstable();

        assert_eq!(sequences, (1..=100).collect::<Vec<u64>>());
        let all = log.all_announcements();
        assert!(all.iter().enumerate().all(|(i, a)| a.sequence == i as u64 + 1));
    }
}
