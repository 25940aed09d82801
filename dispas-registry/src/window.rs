//! Windowed, restartable iteration over an announcement log.

use std::sync::Arc;

use futures::stream::{self, Stream};
use tracing::debug;

use dispas_core::constants::DEFAULT_PAGE_SIZE;
use dispas_core::error::Result;
use dispas_core::traits::AnnouncementLog;
use dispas_core::types::Announcement;

/// Lazy pager over the sequence range `[from, to]` of a log.
///
/// Without an explicit end the window stops at whatever was the latest
/// sequence when the first page was fetched, so iteration always terminates.
/// The cursor can be read at any time and handed to a new window (or to
/// [`restart_from`](Self::restart_from)) to resume after a crash.
pub struct AnnouncementWindow<L: AnnouncementLog + ?Sized> {
    log: Arc<L>,
    cursor: u64,
    end: Option<u64>,
    resolved_end: Option<u64>,
    page_size: u64,
}

impl<L: AnnouncementLog + ?Sized> AnnouncementWindow<L> {
    /// Creates a window starting at sequence `from`.
    pub fn new(log: Arc<L>, from: u64) -> Self {
        Self {
            log,
            cursor: from.max(1),
            end: None,
            resolved_end: None,
            page_size: DEFAULT_PAGE_SIZE as u64,
        }
    }

    /// Ends the window at sequence `to` (inclusive).
    pub fn until(mut self, to: u64) -> Self {
        self.end = Some(to);
        self
    }

    /// Sets the number of announcements fetched per page.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1) as u64;
        self
    }

    /// Sequence of the next announcement this window will yield.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Rewinds or advances the window to `cursor`.
    ///
    /// An open-ended window re-reads the latest sequence on its next page.
    pub fn restart_from(&mut self, cursor: u64) {
        self.cursor = cursor.max(1);
        self.resolved_end = None;
    }

    async fn end(&mut self) -> Result<Option<u64>> {
        if let Some(end) = self.end {
            return Ok(Some(end));
        }
        if self.resolved_end.is_none() {
            self.resolved_end = self.log.latest_sequence().await?;
        }
        Ok(self.resolved_end)
    }

    /// Fetches the next page, or `None` once the window is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Announcement>>> {
        let Some(end) = self.end().await? else {
            return Ok(None);
        };
        if self.cursor > end {
            return Ok(None);
        }

        let page_end = end.min(self.cursor.saturating_add(self.page_size - 1));
        let page = self.log.query_window(self.cursor, page_end).await?;

        // A bounded window may extend past the log's tail.
        let Some(last) = page.last() else {
            return Ok(None);
        };
        debug!(from = self.cursor, to = last.sequence, "Window page fetched");
        self.cursor = last.sequence + 1;
        Ok(Some(page))
    }

    /// Fetches every remaining page and concatenates them.
    pub async fn collect_all(mut self) -> Result<Vec<Announcement>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    /// Turns the window into a stream of pages.
    ///
    /// The stream ends after the last page or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Announcement>>> {
        stream::unfold(Some(self), |state| async move {
            let mut window = state?;
            match window.next_page().await {
                Ok(Some(page)) => Some((Ok(page), Some(window))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
