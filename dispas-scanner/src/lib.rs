//! # Dispas Scanner
//!
//! Batch scanning of the announcement log to discover payments.
//!
//! ## Features
//!
//! - **View-only**: the scanner holds the viewing secret and the spending
//!   *public* key; it can find payments but never spend them
//! - **Parallel**: each page is cut into chunks checked on blocking workers
//! - **Resumable**: the last scanned sequence is tracked for incremental scans
//! - **Progress Reporting**: callbacks for UI progress updates
//!
//! ## Example
//!
//! ```rust,ignore
//! use dispas_scanner::{Scanner, ScannerConfig};
//!
//! let scanner = Scanner::with_config(wallet.view_only(), ScannerConfig::new().parallelism(8));
//!
//! // First call scans everything, later calls only what was appended since
//! let found = scanner.scan_new(log.clone()).await?;
//!
//! for payment in found {
//!     println!("Found payment at: {}", payment.stealth_address);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use dispas_core::constants::{DEFAULT_PAGE_SIZE, DEFAULT_SCAN_CHUNK_SIZE};
use dispas_core::error::{DispasError, Result};
use dispas_core::traits::AnnouncementLog;
use dispas_core::types::{Announcement, PublicKey, ViewingSecretKey};
use dispas_registry::AnnouncementWindow;
use dispas_stealth::discovery::{scan_announcements_with_stats, MatchedPayment, ScanStats};
use dispas_stealth::{StealthWallet, ViewOnlyKeys};

/// Scans `announcements` with the given keys and returns the matches, in order.
///
/// Pure and single-threaded; [`Scanner`] adds partitioning and bookkeeping.
pub fn scan(
    viewing_secret: &ViewingSecretKey,
    spending_public: &PublicKey,
    announcements: &[Announcement],
) -> Vec<MatchedPayment> {
    dispas_stealth::scan_announcements(announcements, viewing_secret, spending_public)
}

/// Scanner configuration.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Announcements fetched from the log per page
    pub page_size: usize,
    /// Announcements per worker chunk
    pub chunk_size: usize,
    /// Number of chunks scanned concurrently
    pub parallelism: usize,
    /// Whether to stop after the first page with a discovery
    pub stop_on_first: bool,
    /// Minimum timestamp to scan from (inclusive)
    pub from_timestamp: Option<u64>,
    /// Maximum timestamp to scan to (inclusive)
    pub to_timestamp: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_SCAN_CHUNK_SIZE,
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            stop_on_first: false,
            from_timestamp: None,
            to_timestamp: None,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Sets the chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sets the number of concurrent workers.
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    /// Enables stopping on first discovery.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }

    /// Sets the time range filter.
    pub fn time_range(mut self, from: u64, to: u64) -> Self {
        self.from_timestamp = Some(from);
        self.to_timestamp = Some(to);
        self
    }

    fn in_time_range(&self, announcement: &Announcement) -> bool {
        self.from_timestamp.map_or(true, |from| announcement.timestamp >= from)
            && self.to_timestamp.map_or(true, |to| announcement.timestamp <= to)
    }
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Total announcements to scan
    pub total: u64,
    /// Announcements scanned so far
    pub scanned: u64,
    /// Discoveries found so far
    pub discoveries: u64,
    /// Current scan rate (announcements per second)
    pub rate: f64,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<f64>,
    /// Percentage complete (0-100)
    pub percent: f64,
}

impl ScanProgress {
    /// Creates a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            scanned: 0,
            discoveries: 0,
            rate: 0.0,
            eta_seconds: None,
            percent: 0.0,
        }
    }

    /// Updates progress with new values.
    pub fn update(&mut self, scanned: u64, discoveries: u64, elapsed_ms: u64) {
        self.scanned = scanned;
        self.discoveries = discoveries;

        if elapsed_ms > 0 {
            self.rate = (scanned as f64 / elapsed_ms as f64) * 1000.0;
        }

        if self.total == 0 {
            self.percent = 100.0;
        } else {
            self.percent = (scanned as f64 / self.total as f64) * 100.0;

            if self.rate > 0.0 {
                let remaining = self.total.saturating_sub(scanned);
                self.eta_seconds = Some(remaining as f64 / self.rate);
            }
        }
    }
}

/// Scan position for resumable scanning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPosition {
    /// Highest sequence scanned so far (0 = nothing yet)
    pub last_sequence: u64,
    /// Timestamp of that announcement
    pub last_timestamp: u64,
    /// Total announcements scanned in this session
    pub total_scanned: u64,
    /// Total discoveries in this session
    pub total_discoveries: u64,
}

impl ScanPosition {
    /// Creates a new scan position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence an incremental scan resumes from.
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }

    fn advance(&mut self, last: &Announcement, scanned: u64, discoveries: u64) {
        if last.sequence >= self.last_sequence {
            self.last_sequence = last.sequence;
            self.last_timestamp = last.timestamp;
        }
        self.total_scanned += scanned;
        self.total_discoveries += discoveries;
    }
}

/// Main scanner for discovering payments.
pub struct Scanner {
    /// Scan capability (viewing secret + spending public key)
    keys: Arc<ViewOnlyKeys>,
    /// Scanner configuration
    config: ScannerConfig,
    /// Current scan position
    position: RwLock<ScanPosition>,
    /// Scan statistics
    stats: RwLock<ScanStats>,
}

impl Scanner {
    /// Creates a scanner with the default configuration.
    pub fn new(keys: ViewOnlyKeys) -> Self {
        Self::with_config(keys, ScannerConfig::default())
    }

    /// Creates a scanner with a custom configuration.
    pub fn with_config(keys: ViewOnlyKeys, config: ScannerConfig) -> Self {
        Self {
            keys: Arc::new(keys),
            config,
            position: RwLock::new(ScanPosition::new()),
            stats: RwLock::new(ScanStats::new()),
        }
    }

    /// Creates a scanner from a wallet's view-only capability.
    pub fn from_wallet(wallet: &StealthWallet) -> Self {
        Self::new(wallet.view_only())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns the current scan position.
    pub fn position(&self) -> ScanPosition {
        self.position.read().clone()
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> ScanStats {
        self.stats.read().clone()
    }

    /// Resets the scan position and statistics.
    pub fn reset_position(&self) {
        *self.position.write() = ScanPosition::new();
        *self.stats.write() = ScanStats::new();
    }

    /// Scans announcements already in memory.
    #[instrument(skip(self, announcements), fields(count = announcements.len()))]
    pub async fn scan_slice(&self, announcements: &[Announcement]) -> Result<Vec<MatchedPayment>> {
        let found = self.scan_batch(announcements.to_vec()).await?;
        info!(discoveries = found.len(), "Slice scan complete");
        Ok(found)
    }

    /// Scans the sequence range `[from, to]` of `log`.
    #[instrument(skip(self, log))]
    pub async fn scan_window<L>(&self, log: Arc<L>, from: u64, to: u64) -> Result<Vec<MatchedPayment>>
    where
        L: AnnouncementLog + ?Sized,
    {
        let window = AnnouncementWindow::new(log, from)
            .until(to)
            .page_size(self.config.page_size);
        self.scan_pages(window, None).await
    }

    /// Scans everything appended since the last scanned sequence.
    #[instrument(skip(self, log))]
    pub async fn scan_new<L>(&self, log: Arc<L>) -> Result<Vec<MatchedPayment>>
    where
        L: AnnouncementLog + ?Sized,
    {
        let from = self.position.read().next_sequence();
        let window = AnnouncementWindow::new(log, from).page_size(self.config.page_size);
        self.scan_pages(window, None).await
    }

    /// Like [`scan_new`](Self::scan_new), reporting progress after each page.
    #[instrument(skip(self, log, progress_callback))]
    pub async fn scan_with_progress<L>(
        &self,
        log: Arc<L>,
        progress_callback: ProgressCallback,
    ) -> Result<Vec<MatchedPayment>>
    where
        L: AnnouncementLog + ?Sized,
    {
        let from = self.position.read().next_sequence();
        let latest = log.latest_sequence().await?.unwrap_or(0);
        let total = (latest + 1).saturating_sub(from);

        let window = AnnouncementWindow::new(log, from)
            .until(latest)
            .page_size(self.config.page_size);
        self.scan_pages(window, Some((ScanProgress::new(total), progress_callback)))
            .await
    }

    async fn scan_pages<L>(
        &self,
        mut window: AnnouncementWindow<L>,
        mut progress: Option<(ScanProgress, ProgressCallback)>,
    ) -> Result<Vec<MatchedPayment>>
    where
        L: AnnouncementLog + ?Sized,
    {
        let start = Instant::now();
        let mut discoveries = Vec::new();
        let mut scanned = 0u64;

        while let Some(page) = window.next_page().await? {
            scanned += page.len() as u64;
            let found = self.scan_batch(page).await?;
            let stop = self.config.stop_on_first && !found.is_empty();
            discoveries.extend(found);

            if let Some((tracker, callback)) = progress.as_mut() {
                tracker.update(scanned, discoveries.len() as u64, start.elapsed().as_millis() as u64);
                callback(tracker.clone());
            }

            if stop {
                info!("Stopping on first discovery");
                break;
            }
        }

        if let Some((mut tracker, callback)) = progress {
            if scanned == 0 {
                tracker.update(0, 0, start.elapsed().as_millis() as u64);
                callback(tracker);
            }
        }

        let rate = self.stats.read().rate();
        info!(
            discoveries = discoveries.len(),
            scanned,
            position = window.cursor().saturating_sub(1),
            rate = format!("{:.2}/s", rate),
            "Scan complete"
        );

        Ok(discoveries)
    }

    /// Partitions `announcements` into chunks and scans them on blocking
    /// workers, then merges the matches back into sequence order.
    async fn scan_batch(&self, announcements: Vec<Announcement>) -> Result<Vec<MatchedPayment>> {
        let Some(last) = announcements.last().cloned() else {
            return Ok(Vec::new());
        };
        let start = Instant::now();
        let total = announcements.len() as u64;

        let candidates: Vec<Announcement> = announcements
            .into_iter()
            .filter(|a| self.config.in_time_range(a))
            .collect();
        let chunks: Vec<Vec<Announcement>> = candidates
            .chunks(self.config.chunk_size)
            .map(<[Announcement]>::to_vec)
            .collect();

        debug!(chunks = chunks.len(), candidates = candidates.len(), "Dispatching scan chunks");

        let results: Vec<(Vec<MatchedPayment>, ScanStats)> = stream::iter(chunks)
            .map(|chunk| {
                let keys = self.keys.clone();
                tokio::task::spawn_blocking(move || {
                    scan_announcements_with_stats(&chunk, &keys.viewing_secret, &keys.spending_public)
                })
            })
            .buffered(self.config.parallelism)
            .try_collect()
            .await
            .map_err(|e| DispasError::InternalError(format!("scan worker failed: {}", e)))?;

        let mut batch_stats = ScanStats::new();
        let mut found = Vec::new();
        for (matches, chunk_stats) in results {
            batch_stats.merge(&chunk_stats);
            found.extend(matches);
        }
        found.sort_by_key(|m| m.announcement.sequence);

        {
            let mut stats = self.stats.write();
            stats.merge(&batch_stats);
            stats.duration_ms += start.elapsed().as_millis() as u64;
        }
        self.position.write().advance(&last, total, found.len() as u64);

        Ok(found)
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .field("position", &*self.position.read())
            .finish()
    }
}

/// Scan result summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of announcements scanned
    pub total_scanned: u64,
    /// Number of view tag matches
    pub view_tag_matches: u64,
    /// Number of payments discovered
    pub discoveries: u64,
    /// Number of errors
    pub errors: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
    /// Filter efficiency (% filtered by view tag)
    pub filter_efficiency: f64,
}

impl From<ScanStats> for ScanSummary {
    fn from(stats: ScanStats) -> Self {
        Self {
            total_scanned: stats.total_scanned,
            view_tag_matches: stats.view_tag_matches,
            discoveries: stats.discoveries,
            errors: stats.errors,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
            filter_efficiency: stats.filter_efficiency(),
        }
    }
}
