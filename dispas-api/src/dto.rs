//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};

use dispas_core::types::{AccountAddress, Announcement, DistributionBatch, RegistrationOutcome};
use dispas_core::{Address, U256};

/// Response for key generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateKeysResponse {
    /// Spending public key (compressed, hex)
    pub spending_pk: String,
    /// Spending secret key (hex) - HANDLE WITH CARE
    pub spending_sk: String,
    /// Viewing public key (compressed, hex)
    pub viewing_pk: String,
    /// Viewing secret key (hex) - HANDLE WITH CARE
    pub viewing_sk: String,
    /// Meta-address URI (`st:eth:0x...`)
    pub meta_address: String,
}

/// Request to register a meta-address.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account submitting the registration
    pub caller: Address,
    /// Account the meta-address is registered for
    pub identity: AccountAddress,
    /// Meta-address URI or bare hex
    pub meta_address: String,
}

/// Response for registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Registered identity
    pub identity: Address,
    /// What the call changed
    pub outcome: RegistrationOutcome,
}

/// Response for a registry lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Identity that was looked up
    pub identity: Address,
    /// Meta-address URI
    pub meta_address: String,
    /// Spending public key (hex)
    pub spending_pk: String,
    /// Viewing public key (hex)
    pub viewing_pk: String,
}

/// Request to create a stealth payment.
///
/// Exactly one of `meta_address` or `identity` must be given.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateStealthRequest {
    /// Recipient meta-address URI
    #[serde(default)]
    pub meta_address: Option<String>,
    /// Registered recipient identity
    #[serde(default)]
    pub identity: Option<Address>,
    /// Native amount hint for the announcement metadata
    #[serde(default)]
    pub amount: Option<U256>,
    /// Append the announcement to the log right away
    #[serde(default)]
    pub publish: bool,
}

/// Response for stealth payment creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateStealthResponse {
    /// The one-time address to send funds to
    pub stealth_address: Address,
    /// Ephemeral public key `R` (hex)
    pub ephemeral_public_key: String,
    /// View tag for the announcement
    pub view_tag: u8,
    /// Announcement to append
    pub announcement: Announcement,
    /// Assigned sequence when `publish` was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

/// Response for appending an announcement.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishAnnouncementResponse {
    /// Assigned sequence number
    pub sequence: u64,
}

/// Query for listing announcements by sequence.
#[derive(Debug, Default, Deserialize)]
pub struct ListAnnouncementsQuery {
    /// First sequence (inclusive, default 1)
    pub from: Option<u64>,
    /// Last sequence (inclusive, default latest)
    pub to: Option<u64>,
}

/// Response for listing announcements.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListAnnouncementsResponse {
    /// Announcements in sequence order
    pub announcements: Vec<Announcement>,
    /// Total entries in the log
    pub total: u64,
    /// Where the next page starts, if the window was truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,
}

/// Request to scan for payments.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Viewing secret key (hex)
    pub viewing_sk: String,
    /// Spending public key (hex)
    pub spending_pk: String,
    /// First sequence to scan (default 1)
    #[serde(default)]
    pub from: Option<u64>,
    /// Last sequence to scan (default latest)
    #[serde(default)]
    pub to: Option<u64>,
}

/// Response for scanning.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    /// Discovered payments
    pub discoveries: Vec<DiscoveryDto>,
    /// Scan statistics
    pub stats: ScanStatsDto,
}

/// A discovered payment.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoveryDto {
    /// One-time address that belongs to the scanning key
    pub stealth_address: Address,
    /// Announcement sequence
    pub sequence: u64,
    /// Announcement timestamp
    pub timestamp: u64,
    /// Announced native amount, if the metadata carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<U256>,
}

/// Scan statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanStatsDto {
    /// Total announcements scanned
    pub total_scanned: u64,
    /// View tag matches
    pub view_tag_matches: u64,
    /// Payments discovered
    pub discoveries: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
}

/// Request to distribute value.
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributeRequest {
    /// Acting account; must control `payer`
    pub caller: Address,
    /// Debited account
    pub payer: AccountAddress,
    /// Attached value; must equal the sum of the payments
    pub value: U256,
    /// Payments in order
    pub payments: DistributionBatch,
    /// Idempotency key
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Request for a stealth transfer to a registered identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct StealthSendRequest {
    /// Account submitting the transfer
    pub caller: Address,
    /// Debited account
    pub from: AccountAddress,
    /// Registered recipient identity
    pub to: AccountAddress,
    /// Amount to move
    pub amount: U256,
    /// Announcement metadata (hex); defaults to the native amount hint
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Response for a balance query.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Queried account
    pub account: Address,
    /// Current balance
    pub balance: U256,
}

/// Response for health check.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Number of announcements in the log
    pub announcements_count: u64,
}
