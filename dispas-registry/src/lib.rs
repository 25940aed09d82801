//! # Dispas Registry
//!
//! Storage for the two pieces of shared state the protocol needs.
//!
//! - **Meta-address registry**: identity → stealth meta-address, with
//!   authorization delegated to an [`AccountAuthority`]
//! - **Announcement log**: append-only, totally ordered announcements
//!   - **Memory**: in-process storage with a view tag index
//!   - **File**: JSON lines, synced on every append, reloaded on open
//! - **Windows**: restartable paging over a sequence range
//!
//! ## Example
//!
//! ```rust,ignore
//! use dispas_registry::{AnnouncementLog, AnnouncementWindow, MemoryAnnouncer};
//!
//! let log = Arc::new(MemoryAnnouncer::new());
//! let sequence = log.append(announcement).await?;
//!
//! let mut window = AnnouncementWindow::new(log.clone(), 1).page_size(500);
//! while let Some(page) = window.next_page().await? {
//!     // hand the page to a scanner
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod meta;
mod memory;
mod file;
mod window;

pub use meta::{AccountOwnership, MemoryMetaRegistry};
pub use memory::MemoryAnnouncer;
pub use file::FileAnnouncer;
pub use window::AnnouncementWindow;

pub use dispas_core::traits::{AccountAuthority, AnnouncementLog, MetaAddressRegistry};
