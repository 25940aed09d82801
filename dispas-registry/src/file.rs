//! File-backed announcement log.
//!
//! Every append is written as one JSON line and synced before it becomes
//! visible to readers. Suitable for single-node deployments where the log
//! must survive restarts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use dispas_core::error::{DispasError, Result};
use dispas_core::traits::AnnouncementLog;
use dispas_core::types::{Announcement, AnnouncementStats};

use crate::MemoryAnnouncer;

/// File-backed announcement log.
///
/// Reads are served by an in-memory copy; the file is only read on open.
///
/// # File Format
///
/// ```text
/// one announcement per line, serde JSON, in sequence order
/// {"scheme_id":1,"stealth_address":"0x…","ephemeral_public_key":"02…",…,"sequence":1,…}
/// ```
///
/// A final line without its newline is a torn write from a crash. It is
/// dropped on open and the file truncated back to the last full entry.
///
/// The writer remembers how many bytes are acknowledged. Anything past that
/// (an append that failed, or was cancelled after its write had started)
/// is cut off before the next append.
pub struct FileAnnouncer {
    /// Path to the log file
    path: PathBuf,
    /// In-memory copy of every durable entry
    memory: MemoryAnnouncer,
    /// Its lock is the writer lock
    writer: Mutex<Writer>,
}

struct Writer {
    file: fs::File,
    /// Bytes covered by acknowledged appends
    durable_len: u64,
}

impl Writer {
    /// Drops bytes left behind by an unacknowledged append.
    async fn restore(&mut self) -> Result<()> {
        // Waits for any write a cancelled append left in flight.
        if let Err(e) = self.file.flush().await {
            warn!(error = %e, "Pending write failed");
        }

        let len = self.file.metadata().await?.len();
        if len != self.durable_len {
            warn!(found = len, durable = self.durable_len, "Truncating unacknowledged bytes");
            self.file.set_len(self.durable_len).await?;
            self.file.sync_all().await?;
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.file.write_all(line).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok(())
    }
}

impl FileAnnouncer {
    /// Opens the log at `path`, creating an empty file if needed.
    ///
    /// Existing entries are loaded and must be contiguous from sequence 1.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let memory = MemoryAnnouncer::new();

        if fs::try_exists(&path).await? {
            Self::load(&path, &memory).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let durable_len = file.metadata().await?.len();

        info!(path = ?path, entries = memory.len(), "Announcement log opened");

        Ok(Self {
            path,
            memory,
            writer: Mutex::new(Writer { file, durable_len }),
        })
    }

    #[instrument(skip(memory))]
    async fn load(path: &Path, memory: &MemoryAnnouncer) -> Result<()> {
        let contents = fs::read(path).await?;
        let text = std::str::from_utf8(&contents)
            .map_err(|e| DispasError::LogCorrupted(format!("log is not UTF-8: {}", e)))?;

        let mut durable_len = 0usize;
        let mut announcements = Vec::new();

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let complete = line.ends_with('\n');
            let body = line.trim_end();

            if body.is_empty() {
                durable_len += line.len();
                continue;
            }

            // Only the last piece can lack its newline; that append was never acknowledged.
            if !complete {
                warn!(line = index + 1, "Dropping torn entry at end of log");
                break;
            }

            let announcement: Announcement = serde_json::from_str(body)
                .map_err(|e| DispasError::LogCorrupted(format!("line {}: {}", index + 1, e)))?;
            announcements.push(announcement);
            durable_len += line.len();
        }

        if durable_len < contents.len() {
            let file = OpenOptions::new().write(true).open(path).await?;
            file.set_len(durable_len as u64).await?;
            file.sync_all().await?;
        }

        let count = memory.import(announcements)?;
        debug!(count, "Announcement log loaded");
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.memory.stats()
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

impl std::fmt::Debug for FileAnnouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAnnouncer")
            .field("path", &self.path)
            .field("entries", &self.memory.len())
            .finish()
    }
}

#[async_trait]
impl AnnouncementLog for FileAnnouncer {
    #[instrument(skip(self, announcement), fields(view_tag = announcement.view_tag))]
    async fn append(&self, mut announcement: Announcement) -> Result<u64> {
        announcement.validate()?;

        let mut writer = self.writer.lock().await;
        writer.restore().await?;
        announcement.sequence = self.memory.next_sequence();

        let mut line = serde_json::to_vec(&announcement)?;
        line.push(b'\n');
        if let Err(e) = writer.write_line(&line).await {
            if let Err(undo) = writer.restore().await {
                warn!(error = %undo, "Could not drop failed append; retrying on next append");
            }
            return Err(e);
        }
        writer.durable_len += line.len() as u64;

        let sequence = self.memory.insert_sequenced(announcement)?;
        debug!(sequence, "Announcement persisted");
        Ok(sequence)
    }

    async fn query_window(&self, from: u64, to: u64) -> Result<Vec<Announcement>> {
        self.memory.query_window(from, to).await
    }

    async fn get(&self, sequence: u64) -> Result<Option<Announcement>> {
        self.memory.get(sequence).await
    }

    async fn get_by_view_tag(&self, view_tag: u8) -> Result<Vec<Announcement>> {
        self.memory.get_by_view_tag(view_tag).await
    }

    async fn count(&self) -> Result<u64> {
        self.memory.count().await
    }

    async fn latest_sequence(&self) -> Result<Option<u64>> {
        self.memory.latest_sequence().await
    }
}
