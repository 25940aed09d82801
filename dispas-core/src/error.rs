//! Error types for Dispas.
//!
//! Every variant maps to a stable machine-readable code via
//! [`DispasError::code`]. Distribution validation failures carry the
//! `Dispas__` prefix used by the on-ledger contract so callers can match on
//! them regardless of transport.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Result type alias using `DispasError`.
pub type Result<T> = std::result::Result<T, DispasError>;

/// Main error type for all Dispas operations.
#[derive(Debug, Error)]
pub enum DispasError {
    // ═══════════════════════════════════════════════════════════════════════════
    // KEY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The random number generator failed to produce bytes.
    #[error("Entropy source failure: {0}")]
    Entropy(String),

    /// Invalid key size.
    #[error("Invalid key: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    /// Key bytes do not encode a valid curve point or non-zero scalar.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The hashed shared secret reduced to zero modulo the curve order.
    #[error("Degenerate stealth key: shared secret hash is zero modulo the curve order")]
    DegenerateStealthKey,

    /// Announcement uses a scheme this implementation does not handle.
    #[error("Unsupported stealth scheme: {0}")]
    UnsupportedScheme(u32),

    // ═══════════════════════════════════════════════════════════════════════════
    // STEALTH ADDRESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Invalid meta-address format or content.
    #[error("Invalid meta-address: {0}")]
    InvalidMetaAddress(String),

    /// Invalid address format.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Caller does not control the account it is acting for.
    #[error("Not authorized: {caller} does not control {account}")]
    NotAuthorized { caller: Address, account: Address },

    /// Recipient has never registered a stealth meta-address.
    #[error("Recipient has no stealth metadata: {0}")]
    RecipientNotRegistered(Address),

    /// Invalid announcement format.
    #[error("Invalid announcement: {0}")]
    InvalidAnnouncement(String),

    /// Announcement not found.
    #[error("Announcement not found: {0}")]
    AnnouncementNotFound(u64),

    /// Persisted announcement log failed an integrity check.
    #[error("Announcement log corrupted: {0}")]
    LogCorrupted(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // DISTRIBUTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// A payment in the batch targets the zero address.
    #[error("Payment {index} targets the zero address")]
    ZeroAddress { index: usize },

    /// A payment in the batch has a zero amount.
    #[error("Payment {index} has zero amount")]
    ZeroAmount { index: usize },

    /// Attached value does not equal the batch total.
    #[error("Insufficient value: batch requires exactly {expected}, supplied {supplied}")]
    InsufficientValue { expected: U256, supplied: U256 },

    /// Batch total does not fit in 256 bits.
    #[error("Amount overflow while summing batch")]
    AmountOverflow,

    /// Account balance cannot cover the debit.
    #[error("Insufficient balance: {account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        required: U256,
        available: U256,
    },

    /// A recipient refused inbound value.
    #[error("Transfer to {recipient} rejected")]
    TransferRejected { recipient: Address },

    /// Value arrived without a distribution request.
    #[error("Direct deposits not allowed")]
    BareDepositRejected,

    // ═══════════════════════════════════════════════════════════════════════════
    // LEDGER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Ledger could not be reached.
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Ledger request exceeded its deadline.
    #[error("Ledger request timed out after {millis}ms")]
    Timeout { millis: u64 },

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DispasError {
    /// Stable identifier for this error, safe to expose to clients.
    pub fn code(&self) -> &'static str {
        match self {
            DispasError::Entropy(_) => "EntropyError",
            DispasError::InvalidKeySize { .. } | DispasError::InvalidKey(_) => "InvalidKey",
            DispasError::DegenerateStealthKey => "DegenerateStealthKey",
            DispasError::UnsupportedScheme(_) => "UnsupportedScheme",
            DispasError::InvalidMetaAddress(_) => "InvalidMetaAddress",
            DispasError::InvalidAddress(_) => "InvalidAddress",
            DispasError::NotAuthorized { .. } => "NotAuthorized",
            DispasError::RecipientNotRegistered(_) => "RecipientNotRegistered",
            DispasError::InvalidAnnouncement(_) => "InvalidAnnouncement",
            DispasError::AnnouncementNotFound(_) => "AnnouncementNotFound",
            DispasError::LogCorrupted(_) => "LogCorrupted",
            DispasError::ZeroAddress { .. } => "Dispas__ZeroAddress",
            DispasError::ZeroAmount { .. } => "Dispas__ZeroAmount",
            DispasError::InsufficientValue { .. } => "Dispas__InsufficientValue",
            DispasError::AmountOverflow => "AmountOverflow",
            DispasError::InsufficientBalance { .. } => "InsufficientBalance",
            DispasError::TransferRejected { .. } => "TransferRejected",
            DispasError::BareDepositRejected => "BareDepositRejected",
            DispasError::LedgerUnavailable(_) => "LedgerUnavailable",
            DispasError::Timeout { .. } => "Timeout",
            DispasError::JsonError(_) => "JsonError",
            DispasError::HexError(_) => "HexError",
            DispasError::IoError(_) => "IoError",
            DispasError::ValidationError(_) => "ValidationError",
            DispasError::ConfigError(_) => "ConfigError",
            DispasError::InternalError(_) => "InternalError",
        }
    }

    /// Returns true if the failure is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispasError::LedgerUnavailable(_) | DispasError::Timeout { .. }
        )
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            DispasError::Entropy(_)
                | DispasError::InvalidKeySize { .. }
                | DispasError::InvalidKey(_)
                | DispasError::DegenerateStealthKey
        )
    }

    /// Returns true if the error was raised while validating input, before
    /// any state changed.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            DispasError::ValidationError(_)
                | DispasError::InvalidMetaAddress(_)
                | DispasError::InvalidAddress(_)
                | DispasError::InvalidAnnouncement(_)
                | DispasError::ZeroAddress { .. }
                | DispasError::ZeroAmount { .. }
                | DispasError::InsufficientValue { .. }
                | DispasError::AmountOverflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = DispasError::InvalidKeySize {
            expected: 33,
            actual: 10,
        };
        assert!(err.to_string().contains("33"));
        assert!(err.to_string().contains("10"));
    }

    #[test_case(DispasError::ZeroAddress { index: 0 }, "Dispas__ZeroAddress")]
    #[test_case(DispasError::ZeroAmount { index: 2 }, "Dispas__ZeroAmount")]
    #[test_case(
        DispasError::InsufficientValue { expected: U256::from(2), supplied: U256::from(1) },
        "Dispas__InsufficientValue"
    )]
    #[test_case(DispasError::BareDepositRejected, "BareDepositRejected")]
    #[test_case(DispasError::Entropy("rng".into()), "EntropyError")]
    #[test_case(DispasError::RecipientNotRegistered(Address::ZERO), "RecipientNotRegistered")]
    fn test_error_codes(err: DispasError, code: &str) {
        assert_eq!(err.code(), code);
    }

    #[test]
    fn test_error_classification() {
        assert!(DispasError::LedgerUnavailable("down".into()).is_retryable());
        assert!(DispasError::Timeout { millis: 500 }.is_retryable());
        assert!(!DispasError::ZeroAmount { index: 0 }.is_retryable());
        assert!(!DispasError::BareDepositRejected.is_retryable());

        assert!(DispasError::DegenerateStealthKey.is_crypto_error());
        assert!(!DispasError::AmountOverflow.is_crypto_error());

        assert!(DispasError::ZeroAddress { index: 1 }.is_validation_error());
        assert!(!DispasError::TransferRejected { recipient: Address::ZERO }.is_validation_error());
    }

    #[test]
    fn test_bare_deposit_message() {
        assert_eq!(
            DispasError::BareDepositRejected.to_string(),
            "Direct deposits not allowed"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let dispas_result: Result<serde_json::Value> = json_result.map_err(DispasError::from);
        assert!(matches!(dispas_result, Err(DispasError::JsonError(_))));
    }
}
