//! Address types for Dispas.
//!
//! - [`AccountAddress`]: A ledger account, either a plain key-controlled
//!   account or a smart account with a separate owner
//! - [`StealthMetaAddress`]: The pair of public keys a recipient registers
//! - [`StealthAddress`]: A one-time address derived for a single payment

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::PublicKey;
use crate::constants::{COMPRESSED_PUBLIC_KEY_SIZE, META_ADDRESS_PREFIX, META_ADDRESS_SIZE};
use crate::error::{DispasError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A ledger account taking part in registration or distribution.
///
/// Key-controlled accounts act for themselves. Smart accounts are acted for
/// by their recorded owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "address", rename_all = "snake_case")]
pub enum AccountAddress {
    /// Externally owned, key-controlled account.
    Eoa(Address),
    /// Contract account with an owner (e.g. a universal profile).
    SmartAccount(Address),
}

impl AccountAddress {
    /// Returns the raw ledger address.
    pub fn address(&self) -> Address {
        match self {
            AccountAddress::Eoa(a) | AccountAddress::SmartAccount(a) => *a,
        }
    }

    /// Returns true for the null address.
    pub fn is_zero(&self) -> bool {
        self.address().is_zero()
    }

    /// Returns true for a smart account.
    pub fn is_smart_account(&self) -> bool {
        matches!(self, AccountAddress::SmartAccount(_))
    }
}

impl From<Address> for AccountAddress {
    fn from(address: Address) -> Self {
        AccountAddress::Eoa(address)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountAddress::Eoa(a) => write!(f, "{a}"),
            AccountAddress::SmartAccount(a) => write!(f, "{a} (smart account)"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A stealth meta-address that is registered for receiving private payments.
///
/// Senders derive a fresh one-time address from it for every payment.
///
/// # Encoding
/// Binary: `spending (33) || viewing (33)`. Text: `st:eth:0x<132 hex chars>`.
///
/// # Example
/// ```ignore
/// use dispas_core::StealthMetaAddress;
///
/// let meta = StealthMetaAddress::new(spending_pk, viewing_pk);
/// let uri = meta.to_uri();
/// assert_eq!(StealthMetaAddress::from_uri(&uri)?, meta);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StealthMetaAddress {
    /// Spending public key `S` - stealth keys are offsets from it
    pub spending: PublicKey,
    /// Viewing public key `V` - senders build the shared secret against it
    pub viewing: PublicKey,
}

impl StealthMetaAddress {
    /// Creates a meta-address from its two public keys.
    pub fn new(spending: PublicKey, viewing: PublicKey) -> Self {
        Self { spending, viewing }
    }

    /// Serializes to the 66-byte binary form.
    pub fn to_bytes(&self) -> [u8; META_ADDRESS_SIZE] {
        let mut bytes = [0u8; META_ADDRESS_SIZE];
        bytes[..COMPRESSED_PUBLIC_KEY_SIZE].copy_from_slice(&self.spending.to_compressed());
        bytes[COMPRESSED_PUBLIC_KEY_SIZE..].copy_from_slice(&self.viewing.to_compressed());
        bytes
    }

    /// Deserializes from the 66-byte binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_ADDRESS_SIZE {
            return Err(DispasError::InvalidMetaAddress(format!(
                "expected {} bytes, got {}",
                META_ADDRESS_SIZE,
                bytes.len()
            )));
        }

        let spending = PublicKey::from_bytes(&bytes[..COMPRESSED_PUBLIC_KEY_SIZE])
            .map_err(|e| DispasError::InvalidMetaAddress(format!("spending key: {e}")))?;
        let viewing = PublicKey::from_bytes(&bytes[COMPRESSED_PUBLIC_KEY_SIZE..])
            .map_err(|e| DispasError::InvalidMetaAddress(format!("viewing key: {e}")))?;

        Ok(Self { spending, viewing })
    }

    /// Encodes as `st:eth:0x...`.
    pub fn to_uri(&self) -> String {
        format!("{}{}", META_ADDRESS_PREFIX, hex::encode(self.to_bytes()))
    }

    /// Decodes `st:eth:0x...`; bare hex with or without `0x` is accepted too.
    pub fn from_uri(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix(META_ADDRESS_PREFIX)
            .unwrap_or_else(|| s.trim_start_matches("0x"));
        let bytes = hex::decode(hex_part)
            .map_err(|e| DispasError::InvalidMetaAddress(format!("bad hex: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for StealthMetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl FromStr for StealthMetaAddress {
    type Err = DispasError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_uri(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// The outcome of deriving a one-time address for a recipient.
///
/// `ephemeral_public_key` and `view_tag` go into the announcement;
/// `address` receives the funds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthAddress {
    /// One-time ledger address
    pub address: Address,
    /// Public key controlling `address` (`S + h·G`)
    pub stealth_public_key: PublicKey,
    /// Sender's ephemeral public key `R`
    pub ephemeral_public_key: PublicKey,
    /// First byte of the hashed shared secret
    pub view_tag: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: &str = "034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa";
    const V: &str = "02466d7fcae563e5cb09a0d1870bb580344804617879a14949cf22285f1bae3f27";

    fn meta() -> StealthMetaAddress {
        StealthMetaAddress::new(PublicKey::from_hex(S).unwrap(), PublicKey::from_hex(V).unwrap())
    }

    #[test]
    fn test_meta_address_uri() {
        let uri = meta().to_uri();
        assert_eq!(uri, format!("st:eth:0x{}{}", S, V));
        assert_eq!(StealthMetaAddress::from_uri(&uri).unwrap(), meta());
        assert_eq!(uri.parse::<StealthMetaAddress>().unwrap(), meta());
    }

    #[test]
    fn test_meta_address_bare_hex() {
        let bare = format!("0x{}{}", S, V);
        assert_eq!(StealthMetaAddress::from_uri(&bare).unwrap(), meta());
    }

    #[test]
    fn test_meta_address_wrong_length() {
        let result = StealthMetaAddress::from_bytes(&[2u8; 40]);
        assert!(matches!(result, Err(DispasError::InvalidMetaAddress(_))));
    }

    #[test]
    fn test_meta_address_serde() {
        let json = serde_json::to_string(&meta()).unwrap();
        assert!(json.contains(S));
        let back: StealthMetaAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta());
    }

    #[test]
    fn test_account_address() {
        let a = Address::repeat_byte(0x11);
        let eoa = AccountAddress::from(a);
        let smart = AccountAddress::SmartAccount(a);

        assert_eq!(eoa.address(), smart.address());
        assert!(!eoa.is_smart_account());
        assert!(smart.is_smart_account());
        assert!(AccountAddress::Eoa(Address::ZERO).is_zero());

        let json = serde_json::to_string(&smart).unwrap();
        assert!(json.contains("smart_account"));
        let back: AccountAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, smart);
    }
}
