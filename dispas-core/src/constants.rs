//! Protocol constants for Dispas.
//!
//! Sizes follow SEC1 encodings of secp256k1 and the ERC-5564 announcement
//! layout for scheme 1.

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a SEC1 compressed public key in bytes.
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;

/// Size of a SEC1 uncompressed public key in bytes (including the 0x04 tag).
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Size of a secret scalar in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

/// Size of a ledger address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Size of a binary stealth meta-address (spending || viewing).
pub const META_ADDRESS_SIZE: usize = 2 * COMPRESSED_PUBLIC_KEY_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH SCHEME
// ═══════════════════════════════════════════════════════════════════════════════

/// ERC-5564 scheme identifier for secp256k1 with view tags.
pub const SCHEME_ID_SECP256K1: u32 = 1;

/// Prefix of the text form of a stealth meta-address.
pub const META_ADDRESS_PREFIX: &str = "st:eth:0x";

/// Size of view tag in bytes.
/// One byte skips ~99.6% of announcements before the full check.
pub const VIEW_TAG_SIZE: usize = 1;

/// Number of possible view tag values (2^8 = 256).
pub const VIEW_TAG_SPACE: usize = 256;

/// Upper bound on fresh ephemeral scalars tried before giving up on a
/// degenerate shared-secret hash.
pub const MAX_DERIVATION_ATTEMPTS: usize = 8;

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Function selector marking a native-asset transfer in announcement metadata.
pub const NATIVE_TRANSFER_SELECTOR: [u8; 4] = [0xee, 0xee, 0xee, 0xee];

/// Maximum metadata payload carried by a single announcement.
pub const MAX_METADATA_SIZE: usize = 1024;

/// How far past the local clock an announcement timestamp may be, in seconds.
pub const MAX_TIMESTAMP_SKEW_SECS: u64 = 3600;

/// Fixed part of the announcement wire layout:
/// scheme (4) || address (20) || ephemeral (33) || view tag (1) ||
/// sequence (8) || timestamp (8) || metadata length (4).
pub const ANNOUNCEMENT_HEADER_SIZE: usize =
    4 + ADDRESS_SIZE + COMPRESSED_PUBLIC_KEY_SIZE + VIEW_TAG_SIZE + 8 + 8 + 4;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL VERSIONING
// ═══════════════════════════════════════════════════════════════════════════════

/// Current on-disk format version.
pub const PROTOCOL_VERSION: u8 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNING DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Announcements fetched per page when iterating a window.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Announcements handed to a single scan worker at a time.
pub const DEFAULT_SCAN_CHUNK_SIZE: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Deadline for a single ledger request.
pub const DEFAULT_LEDGER_TIMEOUT_MS: u64 = 5_000;

/// Attempts made for a transient ledger failure, including the first.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 4;

/// Backoff before the first retry; doubled on each subsequent attempt.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// Backoff ceiling.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_header_size() {
        assert_eq!(ANNOUNCEMENT_HEADER_SIZE, 78);
    }

    #[test]
    fn test_meta_address_size() {
        assert_eq!(META_ADDRESS_SIZE, 66);
        assert_eq!(META_ADDRESS_PREFIX.len(), 9);
    }
}
