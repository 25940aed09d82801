//! Announcement types for the Dispas announcement log.
//!
//! Senders append an announcement for every stealth payment. It carries the
//! ephemeral key and view tag recipients need to recognise the payment,
//! nothing that links it to them.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::PublicKey;
use crate::constants::{
    ADDRESS_SIZE, ANNOUNCEMENT_HEADER_SIZE, COMPRESSED_PUBLIC_KEY_SIZE, MAX_METADATA_SIZE,
    MAX_TIMESTAMP_SKEW_SECS, NATIVE_TRANSFER_SELECTOR, SCHEME_ID_SECP256K1, VIEW_TAG_SPACE,
};
use crate::error::{DispasError, Result};

/// An announcement appended to the log.
///
/// # Wire Format (binary, big-endian)
/// ```text
/// scheme_id (4) || stealth_address (20) || ephemeral_pk (33) || view_tag (1)
///   || sequence (8) || timestamp (8) || metadata_len (4) || metadata
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Stealth scheme identifier (1 = secp256k1 with view tags)
    pub scheme_id: u32,
    /// One-time address that received the payment
    pub stealth_address: Address,
    /// Sender's ephemeral public key `R`
    pub ephemeral_public_key: PublicKey,
    /// View tag for efficient filtering (first byte of the hashed secret)
    pub view_tag: u8,
    /// Opaque payload, e.g. an asset id and amount hint
    #[serde(with = "hex", default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<u8>,
    /// Position in the log (assigned on append, starts at 1)
    #[serde(default)]
    pub sequence: u64,
    /// Unix timestamp when the announcement was created
    pub timestamp: u64,
}

impl Announcement {
    /// Creates a scheme-1 announcement. The sequence is assigned by the log.
    pub fn new(
        stealth_address: Address,
        ephemeral_public_key: PublicKey,
        view_tag: u8,
        metadata: Vec<u8>,
    ) -> Self {
        Self {
            scheme_id: SCHEME_ID_SECP256K1,
            stealth_address,
            ephemeral_public_key,
            view_tag,
            metadata,
            sequence: 0,
            timestamp: Self::current_timestamp(),
        }
    }

    /// Validates the announcement structure.
    pub fn validate(&self) -> Result<()> {
        if self.scheme_id != SCHEME_ID_SECP256K1 {
            return Err(DispasError::UnsupportedScheme(self.scheme_id));
        }

        if self.stealth_address.is_zero() {
            return Err(DispasError::InvalidAnnouncement(
                "stealth address is the zero address".into(),
            ));
        }

        if self.metadata.len() > MAX_METADATA_SIZE {
            return Err(DispasError::InvalidAnnouncement(format!(
                "metadata too large: {} bytes, maximum {}",
                self.metadata.len(),
                MAX_METADATA_SIZE
            )));
        }

        let now = Self::current_timestamp();
        if self.timestamp > now.saturating_add(MAX_TIMESTAMP_SKEW_SECS) {
            return Err(DispasError::InvalidAnnouncement(
                "timestamp is too far in the future".into(),
            ));
        }

        Ok(())
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ANNOUNCEMENT_HEADER_SIZE + self.metadata.len());
        bytes.extend_from_slice(&self.scheme_id.to_be_bytes());
        bytes.extend_from_slice(self.stealth_address.as_slice());
        bytes.extend_from_slice(&self.ephemeral_public_key.to_compressed());
        bytes.push(self.view_tag);
        bytes.extend_from_slice(&self.sequence.to_be_bytes());
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&(self.metadata.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.metadata);
        bytes
    }

    /// Deserializes from compact binary format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ANNOUNCEMENT_HEADER_SIZE {
            return Err(DispasError::InvalidAnnouncement(format!(
                "too short: {} bytes, minimum {}",
                bytes.len(),
                ANNOUNCEMENT_HEADER_SIZE
            )));
        }

        let mut reader = WireReader::new(bytes);
        let scheme_id = u32::from_be_bytes(reader.take()?);
        let stealth_address = Address::from(reader.take::<ADDRESS_SIZE>()?);
        let ephemeral_public_key =
            PublicKey::from_bytes(&reader.take::<COMPRESSED_PUBLIC_KEY_SIZE>()?)?;
        let [view_tag] = reader.take::<1>()?;
        let sequence = u64::from_be_bytes(reader.take()?);
        let timestamp = u64::from_be_bytes(reader.take()?);
        let metadata_len = u32::from_be_bytes(reader.take()?) as usize;

        let metadata = reader.rest();
        if metadata.len() != metadata_len {
            return Err(DispasError::InvalidAnnouncement(format!(
                "metadata length mismatch: header says {}, found {}",
                metadata_len,
                metadata.len()
            )));
        }

        let announcement = Self {
            scheme_id,
            stealth_address,
            ephemeral_public_key,
            view_tag,
            metadata: metadata.to_vec(),
            sequence,
            timestamp,
        };

        announcement.validate()?;
        Ok(announcement)
    }

    /// Decodes a native-asset amount hint from the metadata, if present.
    pub fn native_amount(&self) -> Option<U256> {
        decode_native_metadata(&self.metadata)
    }

    /// Returns current Unix timestamp in seconds.
    fn current_timestamp() -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| DispasError::InvalidAnnouncement("truncated".into()))?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Encodes a native-asset amount hint: `0xeeeeeeee || amount (32, big-endian)`.
pub fn encode_native_metadata(amount: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32);
    out.extend_from_slice(&NATIVE_TRANSFER_SELECTOR);
    out.extend_from_slice(&amount.to_be_bytes::<32>());
    out
}

/// Decodes a native-asset amount hint produced by [`encode_native_metadata`].
pub fn decode_native_metadata(metadata: &[u8]) -> Option<U256> {
    if metadata.len() != 36 || metadata[..4] != NATIVE_TRANSFER_SELECTOR {
        return None;
    }
    Some(U256::from_be_slice(&metadata[4..]))
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for creating announcements with optional fields.
#[derive(Default)]
pub struct AnnouncementBuilder {
    stealth_address: Option<Address>,
    ephemeral_public_key: Option<PublicKey>,
    view_tag: Option<u8>,
    metadata: Vec<u8>,
    timestamp: Option<u64>,
}

impl AnnouncementBuilder {
    /// Creates a new announcement builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stealth address (required).
    pub fn stealth_address(mut self, address: Address) -> Self {
        self.stealth_address = Some(address);
        self
    }

    /// Sets the ephemeral public key (required).
    pub fn ephemeral_public_key(mut self, key: PublicKey) -> Self {
        self.ephemeral_public_key = Some(key);
        self
    }

    /// Sets the view tag (required).
    pub fn view_tag(mut self, tag: u8) -> Self {
        self.view_tag = Some(tag);
        self
    }

    /// Sets raw metadata.
    pub fn metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets a native-asset amount hint as metadata.
    pub fn native_amount(mut self, amount: U256) -> Self {
        self.metadata = encode_native_metadata(amount);
        self
    }

    /// Sets a custom timestamp (optional, defaults to now).
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Builds the announcement.
    pub fn build(self) -> Result<Announcement> {
        let stealth_address = self
            .stealth_address
            .ok_or_else(|| DispasError::ValidationError("stealth_address is required".into()))?;

        let ephemeral_public_key = self
            .ephemeral_public_key
            .ok_or_else(|| DispasError::ValidationError("ephemeral_public_key is required".into()))?;

        let view_tag = self
            .view_tag
            .ok_or_else(|| DispasError::ValidationError("view_tag is required".into()))?;

        let mut announcement =
            Announcement::new(stealth_address, ephemeral_public_key, view_tag, self.metadata);

        if let Some(ts) = self.timestamp {
            announcement.timestamp = ts;
        }

        announcement.validate()?;
        Ok(announcement)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Statistics about announcements in a log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnouncementStats {
    /// Total number of announcements
    pub total_count: u64,
    /// Announcements per view tag (for distribution analysis)
    pub view_tag_distribution: Vec<u64>,
    /// Earliest announcement timestamp
    pub earliest_timestamp: Option<u64>,
    /// Latest announcement timestamp
    pub latest_timestamp: Option<u64>,
    /// Announcements carrying a native amount hint
    pub native_transfer_count: u64,
}

impl Default for AnnouncementStats {
    fn default() -> Self {
        Self {
            total_count: 0,
            view_tag_distribution: vec![0; VIEW_TAG_SPACE],
            earliest_timestamp: None,
            latest_timestamp: None,
            native_transfer_count: 0,
        }
    }
}

impl AnnouncementStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates stats with a new announcement.
    pub fn add(&mut self, announcement: &Announcement) {
        self.total_count += 1;
        self.view_tag_distribution[announcement.view_tag as usize] += 1;

        self.earliest_timestamp = Some(
            self.earliest_timestamp
                .map_or(announcement.timestamp, |t| t.min(announcement.timestamp)),
        );
        self.latest_timestamp = Some(
            self.latest_timestamp
                .map_or(announcement.timestamp, |t| t.max(announcement.timestamp)),
        );

        if announcement.native_amount().is_some() {
            self.native_transfer_count += 1;
        }
    }
}
