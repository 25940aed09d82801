//! Key types for Dispas.
//!
//! This module defines the secp256k1 key structures used in the protocol:
//!
//! - [`PublicKey`]: A validated curve point, SEC1-compressed on the wire
//! - [`SecretKey`]: A non-zero scalar tagged with its role, zeroized on drop
//! - [`KeyPair`]: Public + secret key of one role
//! - [`IdentityKeys`]: The spending and viewing pairs of one recipient
//!
//! Spending and viewing secrets are different types. A function that scans
//! takes `&ViewingSecretKey` and cannot be handed the spending secret.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::StealthMetaAddress;
use crate::constants::{
    COMPRESSED_PUBLIC_KEY_SIZE, SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE,
};
use crate::error::{DispasError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// KEY ROLES
// ═══════════════════════════════════════════════════════════════════════════════

mod sealed {
    pub trait Sealed {}
}

/// Marker for what a secret key is allowed to do.
pub trait KeyRole: sealed::Sealed + Send + Sync + 'static {
    /// Human-readable role name used in `Debug` output.
    const NAME: &'static str;
}

/// Role of the key that controls funds at stealth addresses.
#[derive(Debug)]
pub enum Spending {}

/// Role of the key that detects incoming payments but cannot spend them.
#[derive(Debug)]
pub enum Viewing {}

impl sealed::Sealed for Spending {}
impl sealed::Sealed for Viewing {}

impl KeyRole for Spending {
    const NAME: &'static str = "Spending";
}

impl KeyRole for Viewing {
    const NAME: &'static str = "Viewing";
}

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 public key.
///
/// Always a valid point other than the identity. Serialized as the hex of its
/// 33-byte compressed form.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    point: k256::PublicKey,
}

impl PublicKey {
    /// Parses a SEC1-encoded point (compressed or uncompressed).
    ///
    /// # Errors
    /// Returns error if the length is wrong or the bytes are not on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
            return Err(DispasError::InvalidKeySize {
                expected: COMPRESSED_PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let point = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| DispasError::InvalidKey("bytes do not encode a secp256k1 point".into()))?;
        Ok(Self { point })
    }

    /// Returns the 33-byte compressed encoding.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_PUBLIC_KEY_SIZE] {
        let encoded = self.point.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Returns the 65-byte uncompressed encoding (`0x04 || x || y`).
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] {
        let encoded = self.point.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Returns the underlying curve point.
    pub fn as_point(&self) -> &k256::PublicKey {
        &self.point
    }

    /// Returns the hex-encoded compressed key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    /// Creates a public key from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))?;
        Self::from_bytes(&bytes)
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(point: k256::PublicKey) -> Self {
        Self { point }
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_compressed().hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_compressed();
        write!(
            f,
            "PublicKey({}...{})",
            hex::encode(&bytes[..4]),
            hex::encode(&bytes[COMPRESSED_PUBLIC_KEY_SIZE - 4..])
        )
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECRET KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 secret scalar bound to a [`KeyRole`].
///
/// Non-zero and below the curve order. The scalar is wiped when dropped and
/// never appears in `Debug` output.
pub struct SecretKey<R: KeyRole> {
    inner: k256::SecretKey,
    _role: PhantomData<R>,
}

/// Secret half of the spending pair.
pub type SpendingSecretKey = SecretKey<Spending>;

/// Secret half of the viewing pair.
pub type ViewingSecretKey = SecretKey<Viewing>;

impl<R: KeyRole> SecretKey<R> {
    /// Creates a secret key from 32 big-endian bytes.
    ///
    /// # Errors
    /// Returns error if the length is wrong, the value is zero, or it is not
    /// below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(DispasError::InvalidKeySize {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let inner = k256::SecretKey::from_slice(bytes)
            .map_err(|_| DispasError::InvalidKey("scalar is zero or not below the curve order".into()))?;
        Ok(Self::from_k256(inner))
    }

    /// Wraps an existing k256 secret key.
    pub fn from_k256(inner: k256::SecretKey) -> Self {
        Self {
            inner,
            _role: PhantomData,
        }
    }

    /// Parses a hex-encoded secret, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = Zeroizing::new(hex::decode(s.trim_start_matches("0x"))?);
        Self::from_bytes(&bytes)
    }

    /// Returns the raw scalar bytes.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn to_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Returns the hex-encoded scalar.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.to_bytes().as_slice()))
    }

    /// Returns the scalar for curve arithmetic.
    pub fn to_nonzero_scalar(&self) -> k256::NonZeroScalar {
        self.inner.to_nonzero_scalar()
    }

    /// Returns the matching public key (`secret·G`).
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.inner.public_key())
    }
}

impl<R: KeyRole> Clone for SecretKey<R> {
    fn clone(&self) -> Self {
        Self::from_k256(self.inner.clone())
    }
}

impl<R: KeyRole> ZeroizeOnDrop for SecretKey<R> {}

impl<R: KeyRole> fmt::Debug for SecretKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose secret key content
        write!(f, "{}SecretKey([REDACTED])", R::NAME)
    }
}

impl<R: KeyRole> Serialize for SecretKey<R> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de, R: KeyRole> Deserialize<'de> for SecretKey<R> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 key pair of a single role.
///
/// Invariant: `public == secret·G`.
pub struct KeyPair<R: KeyRole> {
    /// Public key (safe to share)
    pub public: PublicKey,
    /// Secret key (keep private, auto-zeroized)
    pub secret: SecretKey<R>,
}

/// Spending key pair - controls funds at stealth addresses.
pub type SpendingKeyPair = KeyPair<Spending>;

/// Viewing key pair - detects incoming payments.
///
/// The viewing secret can be shared with a third party (an auditor, a
/// scanning service) without granting spending ability.
pub type ViewingKeyPair = KeyPair<Viewing>;

impl<R: KeyRole> KeyPair<R> {
    /// Creates a key pair, checking that `public` belongs to `secret`.
    pub fn new(public: PublicKey, secret: SecretKey<R>) -> Result<Self> {
        if secret.public_key() != public {
            return Err(DispasError::InvalidKey(format!(
                "{} public key does not match its secret",
                R::NAME.to_lowercase()
            )));
        }
        Ok(Self { public, secret })
    }

    /// Builds the pair from its secret half.
    pub fn from_secret(secret: SecretKey<R>) -> Self {
        Self {
            public: secret.public_key(),
            secret,
        }
    }
}

impl<R: KeyRole> Clone for KeyPair<R> {
    fn clone(&self) -> Self {
        Self {
            public: self.public.clone(),
            secret: self.secret.clone(),
        }
    }
}

impl<R: KeyRole> fmt::Debug for KeyPair<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("role", &R::NAME)
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl<R: KeyRole> Serialize for KeyPair<R> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("KeyPair", 2)?;
        state.serialize_field("public", &self.public)?;
        state.serialize_field("secret", &self.secret)?;
        state.end()
    }
}

impl<'de, R: KeyRole> Deserialize<'de> for KeyPair<R> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            public: PublicKey,
            secret: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        let secret_hex = Zeroizing::new(raw.secret);
        let secret = SecretKey::<R>::from_hex(&secret_hex).map_err(serde::de::Error::custom)?;
        KeyPair::new(raw.public, secret).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete key set of one recipient (spending + viewing).
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityKeys {
    /// Keys controlling stealth address funds
    pub spending: SpendingKeyPair,
    /// Keys for scanning announcements
    pub viewing: ViewingKeyPair,
}

impl IdentityKeys {
    /// Creates a key set.
    pub fn new(spending: SpendingKeyPair, viewing: ViewingKeyPair) -> Self {
        Self { spending, viewing }
    }

    /// Returns the meta-address to publish for these keys.
    pub fn meta_address(&self) -> StealthMetaAddress {
        StealthMetaAddress::new(self.spending.public.clone(), self.viewing.public.clone())
    }
}

impl fmt::Debug for IdentityKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeys")
            .field("spending", &self.spending)
            .field("viewing", &self.viewing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    // secp256k1 generator, compressed
    const GENERATOR: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_public_key_from_generator() {
        let pk = PublicKey::from_hex(GENERATOR).unwrap();
        assert_eq!(pk.to_hex(), GENERATOR);
        assert_eq!(pk.to_uncompressed()[0], 0x04);
    }

    #[test]
    fn test_public_key_wrong_size() {
        let result = PublicKey::from_bytes(&[2u8; 10]);
        assert!(matches!(result, Err(DispasError::InvalidKeySize { .. })));
    }

    #[test]
    fn test_public_key_not_on_curve() {
        let mut bytes = [0xFFu8; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = 0x02;
        assert!(matches!(PublicKey::from_bytes(&bytes), Err(DispasError::InvalidKey(_))));
    }

    #[test]
    fn test_secret_key_rejects_zero_and_order() {
        assert!(SpendingSecretKey::from_bytes(&[0u8; 32]).is_err());
        let order = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap();
        assert!(SpendingSecretKey::from_bytes(&order).is_err());
    }

    #[test]
    fn test_secret_key_public_key() {
        let sk = ViewingSecretKey::from_hex(SECRET_ONE).unwrap();
        assert_eq!(sk.public_key().to_hex(), GENERATOR);
    }

    #[test]
    fn test_secret_key_debug_redacted() {
        let sk = SpendingSecretKey::from_hex(SECRET_ONE).unwrap();
        let debug = format!("{:?}", sk);
        assert!(debug.contains("REDACTED"));
        assert!(debug.starts_with("Spending"));
        assert!(!debug.contains("01"));
    }

    #[test]
    fn test_keypair_rejects_mismatched_public() {
        let sk = SpendingSecretKey::from_hex(SECRET_ONE).unwrap();
        let other = SpendingSecretKey::from_bytes(&[7u8; 32]).unwrap().public_key();
        assert!(KeyPair::new(other, sk).is_err());
    }

    #[test]
    fn test_keypair_serde_roundtrip() {
        let pair = ViewingKeyPair::from_secret(ViewingSecretKey::from_bytes(&[9u8; 32]).unwrap());
        let json = serde_json::to_string(&pair).unwrap();
        let pair2: ViewingKeyPair = serde_json::from_str(&json).unwrap();
        assert_eq!(pair.public, pair2.public);
        assert_eq!(*pair.secret.to_bytes(), *pair2.secret.to_bytes());
    }

    #[test]
    fn test_public_key_serde() {
        let pk = PublicKey::from_hex(GENERATOR).unwrap();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", GENERATOR));
        let pk2: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, pk2);
    }
}
