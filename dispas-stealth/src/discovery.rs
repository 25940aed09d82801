//! Payment discovery (recipient scan).
//!
//! Discovery needs only the viewing secret and the spending public key, so it
//! can run on a machine that could never spend what it finds.

use serde::{Deserialize, Serialize};

use dispas_core::error::DispasError;
use dispas_core::types::{Announcement, PublicKey, ViewingSecretKey};
use dispas_core::Address;
use dispas_crypto::{check_stealth_address, StealthCheck};

/// An announcement proven to pay the scanning recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPayment {
    /// The announcement that matched
    pub announcement: Announcement,
    /// The recipient's one-time address
    pub stealth_address: Address,
    /// Set once the full address check has passed
    pub proven_owned: bool,
}

/// Result of scanning a single announcement.
#[derive(Debug)]
pub enum ScanResult {
    /// View tag didn't match - not for this recipient
    NotForUs,
    /// View tag matched by chance but the address did not
    ViewTagCollision,
    /// Full check passed - payment discovered
    Matched(MatchedPayment),
    /// Announcement could not be processed
    Invalid(DispasError),
}

impl ScanResult {
    /// Returns true if a payment was discovered.
    pub fn is_matched(&self) -> bool {
        matches!(self, ScanResult::Matched(_))
    }

    /// Returns the matched payment if present.
    pub fn into_match(self) -> Option<MatchedPayment> {
        match self {
            ScanResult::Matched(found) => Some(found),
            _ => None,
        }
    }
}

/// Statistics for scanning operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Total announcements scanned
    pub total_scanned: u64,
    /// Number of view tag matches (true matches + collisions)
    pub view_tag_matches: u64,
    /// Number of payments discovered
    pub discoveries: u64,
    /// Number of announcements that could not be processed
    pub errors: u64,
    /// Duration of the scan in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scan result.
    pub fn record(&mut self, result: &ScanResult) {
        self.total_scanned += 1;
        match result {
            ScanResult::Matched(_) => {
                self.view_tag_matches += 1;
                self.discoveries += 1;
            }
            ScanResult::ViewTagCollision => {
                self.view_tag_matches += 1;
            }
            ScanResult::Invalid(_) => {
                self.errors += 1;
            }
            ScanResult::NotForUs => {}
        }
    }

    /// Adds another tracker's counts into this one.
    pub fn merge(&mut self, other: &ScanStats) {
        self.total_scanned += other.total_scanned;
        self.view_tag_matches += other.view_tag_matches;
        self.discoveries += other.discoveries;
        self.errors += other.errors;
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total_scanned as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Returns the filter efficiency (percentage skipped by the view tag).
    pub fn filter_efficiency(&self) -> f64 {
        if self.total_scanned == 0 {
            0.0
        } else {
            ((self.total_scanned - self.view_tag_matches) as f64 / self.total_scanned as f64) * 100.0
        }
    }
}

/// View-tag pre-filter, then the full address check.
pub fn scan_announcement(
    announcement: &Announcement,
    viewing_secret: &ViewingSecretKey,
    spending_public: &PublicKey,
) -> ScanResult {
    if let Err(e) = announcement.validate() {
        return ScanResult::Invalid(e);
    }

    let check = check_stealth_address(
        &announcement.ephemeral_public_key,
        viewing_secret,
        spending_public,
        announcement.view_tag,
        &announcement.stealth_address,
    );

    match check {
        Ok(StealthCheck::ViewTagMismatch) => ScanResult::NotForUs,
        Ok(StealthCheck::AddressMismatch) => ScanResult::ViewTagCollision,
        Ok(StealthCheck::Match) => ScanResult::Matched(MatchedPayment {
            announcement: announcement.clone(),
            stealth_address: announcement.stealth_address,
            proven_owned: true,
        }),
        Err(e) => ScanResult::Invalid(e),
    }
}

/// Scans a slice and returns matches in input order.
pub fn scan_announcements(
    announcements: &[Announcement],
    viewing_secret: &ViewingSecretKey,
    spending_public: &PublicKey,
) -> Vec<MatchedPayment> {
    scan_announcements_with_stats(announcements, viewing_secret, spending_public).0
}

/// Like [`scan_announcements`], also returning per-call statistics.
pub fn scan_announcements_with_stats(
    announcements: &[Announcement],
    viewing_secret: &ViewingSecretKey,
    spending_public: &PublicKey,
) -> (Vec<MatchedPayment>, ScanStats) {
    let mut stats = ScanStats::new();
    let matches = announcements
        .iter()
        .filter_map(|ann| {
            let result = scan_announcement(ann, viewing_secret, spending_public);
            stats.record(&result);
            result.into_match()
        })
        .collect();
    (matches, stats)
}
