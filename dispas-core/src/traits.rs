//! Store traits for Dispas.
//!
//! Registry, announcement log and value ledger are injected into the
//! services that use them. Each has an in-memory implementation for tests
//! and development; the announcement log also has a durable file-backed one.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AccountAddress, Announcement, RegistrationOutcome, StealthMetaAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// AUTHORIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Decides whether a caller may act for an account.
///
/// A key-controlled account controls itself. Smart accounts are controlled
/// by whatever owner the account-abstraction layer records.
pub trait AccountAuthority: Send + Sync {
    /// Returns true if `caller` is the controller of `account`.
    fn controls(&self, caller: Address, account: &AccountAddress) -> bool;
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity → stealth meta-address mapping.
#[async_trait]
pub trait MetaAddressRegistry: Send + Sync {
    /// Stores `meta_address` for `identity`, replacing any previous value.
    ///
    /// Fails with `NotAuthorized` unless `caller` controls `identity`.
    async fn register(
        &self,
        caller: Address,
        identity: AccountAddress,
        meta_address: StealthMetaAddress,
    ) -> Result<RegistrationOutcome>;

    /// Returns the meta-address registered for `identity`, if any.
    async fn lookup(&self, identity: Address) -> Result<Option<StealthMetaAddress>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Append-only, totally ordered log of announcements.
///
/// Sequence numbers start at 1 and are contiguous. Entries are never
/// mutated or removed once appended.
#[async_trait]
pub trait AnnouncementLog: Send + Sync {
    /// Appends an announcement and returns its sequence number.
    async fn append(&self, announcement: Announcement) -> Result<u64>;

    /// Returns announcements with `from <= sequence <= to`, in order.
    ///
    /// No recipient filtering happens here: the log cannot tell who an
    /// announcement is for.
    async fn query_window(&self, from: u64, to: u64) -> Result<Vec<Announcement>>;

    /// Retrieves a single announcement by sequence.
    async fn get(&self, sequence: u64) -> Result<Option<Announcement>>;

    /// Retrieves announcements carrying the given view tag.
    async fn get_by_view_tag(&self, view_tag: u8) -> Result<Vec<Announcement>>;

    /// Returns total announcement count.
    async fn count(&self) -> Result<u64>;

    /// Returns the highest assigned sequence, or `None` if empty.
    async fn latest_sequence(&self) -> Result<Option<u64>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Account balances and atomic multi-party transfers.
#[async_trait]
pub trait ValueLedger: Send + Sync {
    /// Returns the balance of `account`.
    async fn balance_of(&self, account: Address) -> Result<U256>;

    /// Debits `debit` from `from` and applies every credit, atomically.
    ///
    /// Either the debit and all credits are applied or none is. Fails with
    /// `InsufficientBalance` if `from` cannot cover `debit` and with
    /// `TransferRejected` if any credited account refuses value.
    async fn transfer_batch(
        &self,
        from: Address,
        debit: U256,
        credits: &[(Address, U256)],
    ) -> Result<()>;
}
