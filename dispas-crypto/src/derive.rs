//! Stealth address derivation and recovery (ERC-5564 scheme 1, secp256k1).
//!
//! ## Sender
//!
//! ```text
//! r  ← random, R = r·G
//! P  = r·V                         (shared secret, compressed point)
//! h  = keccak256(P)
//! view_tag = h[0]
//! Ps = S + (h mod n)·G
//! stealth_address = keccak256(Ps.x || Ps.y)[12..32]
//! ```
//!
//! ## Recipient
//!
//! ```text
//! P' = v·R = r·V
//! h' = keccak256(P')               (same h, so same view tag and Ps)
//! stealth_sk = s + (h' mod n)
//! ```

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use dispas_core::constants::{COMPRESSED_PUBLIC_KEY_SIZE, MAX_DERIVATION_ATTEMPTS, SECRET_KEY_SIZE};
use dispas_core::error::{DispasError, Result};
use dispas_core::types::{
    PublicKey, SpendingSecretKey, StealthAddress, StealthMetaAddress, ViewingSecretKey,
};
use dispas_core::Address;

use crate::hash::{keccak256, public_key_to_address};
use crate::view_tag::view_tags_match;

// ═══════════════════════════════════════════════════════════════════════════════
// EPHEMERAL SECRET
// ═══════════════════════════════════════════════════════════════════════════════

/// The sender's per-payment scalar `r`.
///
/// Used once and dropped; the value is wiped on drop.
pub struct EphemeralSecret {
    inner: k256::SecretKey,
}

impl EphemeralSecret {
    /// Samples `r` from the OS CSPRNG.
    pub fn random() -> Result<Self> {
        Self::random_with_rng(&mut OsRng)
    }

    /// Samples `r` from the given RNG.
    pub fn random_with_rng<G: RngCore + CryptoRng>(rng: &mut G) -> Result<Self> {
        Ok(Self {
            inner: crate::keys::sample_scalar(rng)?,
        })
    }

    /// Creates `r` from 32 big-endian bytes (for test vectors and replays).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(DispasError::InvalidKeySize {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let inner = k256::SecretKey::from_slice(bytes)
            .map_err(|_| DispasError::InvalidKey("ephemeral scalar out of range".into()))?;
        Ok(Self { inner })
    }

    /// Returns `R = r·G`.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.inner.public_key())
    }

    fn scalar(&self) -> NonZeroScalar {
        self.inner.to_nonzero_scalar()
    }
}

impl std::fmt::Debug for EphemeralSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EphemeralSecret([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED SECRET
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes `secret·point` as a compressed point.
///
/// Sender: `r·V`. Recipient: `v·R`. Both give the same 33 bytes.
pub fn shared_secret(
    secret: &NonZeroScalar,
    point: &PublicKey,
) -> Result<Zeroizing<[u8; COMPRESSED_PUBLIC_KEY_SIZE]>> {
    let product = point.as_point().to_projective() * **secret;
    // Non-zero scalar times a non-identity point of a prime-order group is
    // never the identity.
    let product = k256::PublicKey::from_affine(product.to_affine())
        .map_err(|_| DispasError::InternalError("shared secret is the identity".into()))?;

    let encoded = product.to_encoded_point(true);
    let mut out = Zeroizing::new([0u8; COMPRESSED_PUBLIC_KEY_SIZE]);
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

/// Reduces a 32-byte hash to a scalar mod n. `None` if the result is zero.
fn hash_to_scalar(hash: &[u8; 32]) -> Option<NonZeroScalar> {
    let bytes = k256::FieldBytes::from(*hash);
    let scalar = <Scalar as Reduce<k256::U256>>::reduce_bytes(&bytes);
    Option::from(NonZeroScalar::new(scalar))
}

/// `S + h·G` as a public key.
fn offset_public_key(spending: &PublicKey, h: &NonZeroScalar) -> Result<PublicKey> {
    let point = spending.as_point().to_projective() + ProjectivePoint::GENERATOR * **h;
    k256::PublicKey::from_affine(point.to_affine())
        .map(PublicKey::from)
        .map_err(|_| DispasError::DegenerateStealthKey)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SENDER SIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth address for `meta` under a fixed ephemeral secret.
///
/// Deterministic: the same `(r, S, V)` always gives the same output.
///
/// # Errors
/// Returns `DegenerateStealthKey` if `keccak256(r·V)` is zero modulo the
/// curve order, in which case the caller must pick another `r`.
pub fn derive_stealth_address(
    meta: &StealthMetaAddress,
    ephemeral: &EphemeralSecret,
) -> Result<StealthAddress> {
    let shared = shared_secret(&ephemeral.scalar(), &meta.viewing)?;
    let h = Zeroizing::new(keccak256(&shared[..]));
    let view_tag = h[0];

    let h_scalar = hash_to_scalar(&h).ok_or(DispasError::DegenerateStealthKey)?;
    let stealth_public_key = offset_public_key(&meta.spending, &h_scalar)?;

    Ok(StealthAddress {
        address: public_key_to_address(&stealth_public_key),
        stealth_public_key,
        ephemeral_public_key: ephemeral.public_key(),
        view_tag,
    })
}

/// Derives a fresh, unlinkable stealth address for `meta`.
///
/// Samples a new `r` per call and resamples if the derivation degenerates.
///
/// # Example
///
/// ```rust,ignore
/// use dispas_crypto::generate_stealth_address;
///
/// let stealth = generate_stealth_address(&recipient_meta)?;
/// // pay stealth.address, then announce
/// // (stealth.ephemeral_public_key, stealth.view_tag)
/// ```
pub fn generate_stealth_address(meta: &StealthMetaAddress) -> Result<StealthAddress> {
    generate_stealth_address_with_rng(meta, &mut OsRng)
}

/// Same as [`generate_stealth_address`] with a caller-supplied RNG.
pub fn generate_stealth_address_with_rng<G: RngCore + CryptoRng>(
    meta: &StealthMetaAddress,
    rng: &mut G,
) -> Result<StealthAddress> {
    for _ in 0..MAX_DERIVATION_ATTEMPTS {
        let ephemeral = EphemeralSecret::random_with_rng(rng)?;
        match derive_stealth_address(meta, &ephemeral) {
            Err(DispasError::DegenerateStealthKey) => continue,
            result => return result,
        }
    }
    Err(DispasError::DegenerateStealthKey)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECIPIENT SIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of testing one announcement against a viewing key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StealthCheck {
    /// View tag differs; the announcement is certainly not ours.
    ViewTagMismatch,
    /// View tag collided but the address differs.
    AddressMismatch,
    /// The address belongs to the holder of the spending key.
    Match,
}

impl StealthCheck {
    /// Returns true for [`StealthCheck::Match`].
    pub fn is_match(self) -> bool {
        self == StealthCheck::Match
    }
}

/// Recomputes `(stealth address, view tag)` for an ephemeral key.
///
/// Needs only the viewing secret and the spending *public* key.
pub fn recover_stealth_address(
    ephemeral_public_key: &PublicKey,
    viewing_secret: &ViewingSecretKey,
    spending_public_key: &PublicKey,
) -> Result<(Address, u8)> {
    let shared = shared_secret(&viewing_secret.to_nonzero_scalar(), ephemeral_public_key)?;
    let h = Zeroizing::new(keccak256(&shared[..]));
    let h_scalar = hash_to_scalar(&h).ok_or(DispasError::DegenerateStealthKey)?;
    let stealth_public_key = offset_public_key(spending_public_key, &h_scalar)?;
    Ok((public_key_to_address(&stealth_public_key), h[0]))
}

/// Tests whether an announced `(ephemeral key, view tag, address)` is ours.
///
/// The view tag is compared first; the point addition and address hash run
/// only when it matches. Both comparisons are constant-time.
pub fn check_stealth_address(
    ephemeral_public_key: &PublicKey,
    viewing_secret: &ViewingSecretKey,
    spending_public_key: &PublicKey,
    view_tag: u8,
    stealth_address: &Address,
) -> Result<StealthCheck> {
    let shared = shared_secret(&viewing_secret.to_nonzero_scalar(), ephemeral_public_key)?;
    let h = Zeroizing::new(keccak256(&shared[..]));

    if !view_tags_match(h[0], view_tag) {
        return Ok(StealthCheck::ViewTagMismatch);
    }

    // An honest sender never announces a degenerate derivation.
    let Some(h_scalar) = hash_to_scalar(&h) else {
        return Ok(StealthCheck::AddressMismatch);
    };
    let expected = public_key_to_address(&offset_public_key(spending_public_key, &h_scalar)?);

    if bool::from(expected.as_slice().ct_eq(stealth_address.as_slice())) {
        Ok(StealthCheck::Match)
    } else {
        Ok(StealthCheck::AddressMismatch)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PRIVATE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// The private key controlling one stealth address (`s + h mod n`).
///
/// Wiped on drop; never printed.
#[derive(Clone)]
pub struct StealthPrivateKey {
    inner: k256::SecretKey,
}

impl StealthPrivateKey {
    /// Returns the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.inner.public_key())
    }

    /// Returns the address this key controls.
    pub fn address(&self) -> Address {
        public_key_to_address(&self.public_key())
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

    /// Returns the hex-encoded scalar, suitable for importing into a wallet.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.to_bytes()[..]))
    }
}

impl std::fmt::Debug for StealthPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StealthPrivateKey([REDACTED])")
    }
}

/// Derives the private key of the stealth address announced with
/// `ephemeral_public_key`.
///
/// Only the holder of both secrets can call this.
pub fn derive_stealth_private_key(
    spending_secret: &SpendingSecretKey,
    viewing_secret: &ViewingSecretKey,
    ephemeral_public_key: &PublicKey,
) -> Result<StealthPrivateKey> {
    let shared = shared_secret(&viewing_secret.to_nonzero_scalar(), ephemeral_public_key)?;
    let h = Zeroizing::new(keccak256(&shared[..]));
    let h_scalar = hash_to_scalar(&h).ok_or(DispasError::DegenerateStealthKey)?;

    let sum = *spending_secret.to_nonzero_scalar() + *h_scalar;
    let sum = Option::<NonZeroScalar>::from(NonZeroScalar::new(sum))
        .ok_or(DispasError::DegenerateStealthKey)?;

    Ok(StealthPrivateKey {
        inner: k256::SecretKey::from(sum),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispas_core::types::{KeyPair, SpendingKeyPair, ViewingKeyPair};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use crate::keys::generate_identity_keys_with_rng;

    // Known-answer vector: s = 0x11..11, v = 0x22..22, r = 0x33..33
    const SPENDING_PUB: &str = "034f355bdcb7cc0af728ef3cceb9615d90684bb5b2ca5f859ab0f0b704075871aa";
    const VIEWING_PUB: &str = "02466d7fcae563e5cb09a0d1870bb580344804617879a14949cf22285f1bae3f27";
    const EPHEMERAL_PUB: &str = "023c72addb4fdf09af94f0c94d7fe92a386a7e70cf8a1d85916386bb2535c7b1b1";
    const SHARED: &str = "029110f8760a37d96052e3dcaf14862a147654f49f722cf213568ccef1eca2ec71";
    const STEALTH_PUB: &str = "02a2a582c7f89476beb6de1d8b5f6329b7dfdc6e224f251215f5875450a7cc80fb";
    const STEALTH_ADDR: &str = "0xd8606ed2ecdb71fdcb8cca8fa1925ff84238f2a9";
    const STEALTH_PRIV: &str = "32074def70f9689560d0eb1b86aa895b735ed5852c9ce187ff0dcd968e8a19d3";

    fn vector_keys() -> (SpendingKeyPair, ViewingKeyPair) {
        let spending = KeyPair::from_secret(SpendingSecretKey::from_bytes(&[0x11; 32]).unwrap());
        let viewing = KeyPair::from_secret(ViewingSecretKey::from_bytes(&[0x22; 32]).unwrap());
        (spending, viewing)
    }

    fn vector_meta() -> StealthMetaAddress {
        let (spending, viewing) = vector_keys();
        StealthMetaAddress::new(spending.public, viewing.public)
    }

    #[test]
    fn test_known_answer_public_keys() {
        let (spending, viewing) = vector_keys();
        assert_eq!(spending.public.to_hex(), SPENDING_PUB);
        assert_eq!(viewing.public.to_hex(), VIEWING_PUB);

        let ephemeral = EphemeralSecret::from_bytes(&[0x33; 32]).unwrap();
        assert_eq!(ephemeral.public_key().to_hex(), EPHEMERAL_PUB);
    }

    #[test]
    fn test_known_answer_shared_secret_is_symmetric() {
        let (_, viewing) = vector_keys();
        let ephemeral = EphemeralSecret::from_bytes(&[0x33; 32]).unwrap();

        let sender = shared_secret(&ephemeral.scalar(), &viewing.public).unwrap();
        let recipient =
            shared_secret(&viewing.secret.to_nonzero_scalar(), &ephemeral.public_key()).unwrap();

        assert_eq!(hex::encode(&sender[..]), SHARED);
        assert_eq!(&sender[..], &recipient[..]);
    }

    #[test]
    fn test_known_answer_stealth_address() {
        let ephemeral = EphemeralSecret::from_bytes(&[0x33; 32]).unwrap();
        let stealth = derive_stealth_address(&vector_meta(), &ephemeral).unwrap();

        assert_eq!(stealth.view_tag, 0x20);
        assert_eq!(stealth.stealth_public_key.to_hex(), STEALTH_PUB);
        assert_eq!(stealth.address, STEALTH_ADDR.parse::<Address>().unwrap());
        assert_eq!(stealth.ephemeral_public_key.to_hex(), EPHEMERAL_PUB);
    }

    #[test]
    fn test_known_answer_stealth_private_key() {
        let (spending, viewing) = vector_keys();
        let ephemeral = PublicKey::from_hex(EPHEMERAL_PUB).unwrap();

        let key = derive_stealth_private_key(&spending.secret, &viewing.secret, &ephemeral).unwrap();
        assert_eq!(key.to_hex().as_str(), STEALTH_PRIV);
        assert_eq!(key.public_key().to_hex(), STEALTH_PUB);
        assert_eq!(key.address(), STEALTH_ADDR.parse::<Address>().unwrap());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let ephemeral = EphemeralSecret::from_bytes(&[0x44; 32]).unwrap();
        let a = derive_stealth_address(&vector_meta(), &ephemeral).unwrap();
        let b = derive_stealth_address(&vector_meta(), &ephemeral).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fresh_addresses_are_unlinkable() {
        let meta = vector_meta();
        let a = generate_stealth_address(&meta).unwrap();
        let b = generate_stealth_address(&meta).unwrap();

        assert_ne!(a.address, b.address);
        assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
        assert_ne!(a.stealth_public_key, meta.spending);
    }

    #[test]
    fn test_check_matches_own_payment() {
        let (spending, viewing) = vector_keys();
        let stealth = generate_stealth_address(&vector_meta()).unwrap();

        let check = check_stealth_address(
            &stealth.ephemeral_public_key,
            &viewing.secret,
            &spending.public,
            stealth.view_tag,
            &stealth.address,
        )
        .unwrap();
        assert_eq!(check, StealthCheck::Match);

        let (recovered, tag) =
            recover_stealth_address(&stealth.ephemeral_public_key, &viewing.secret, &spending.public)
                .unwrap();
        assert_eq!(recovered, stealth.address);
        assert_eq!(tag, stealth.view_tag);
    }

    #[test]
    fn test_check_rejects_wrong_view_tag() {
        let (spending, viewing) = vector_keys();
        let stealth = generate_stealth_address(&vector_meta()).unwrap();

        let check = check_stealth_address(
            &stealth.ephemeral_public_key,
            &viewing.secret,
            &spending.public,
            stealth.view_tag.wrapping_add(1),
            &stealth.address,
        )
        .unwrap();
        assert_eq!(check, StealthCheck::ViewTagMismatch);
    }

    #[test]
    fn test_check_rejects_wrong_address_with_colliding_tag() {
        let (spending, viewing) = vector_keys();
        let stealth = generate_stealth_address(&vector_meta()).unwrap();

        let check = check_stealth_address(
            &stealth.ephemeral_public_key,
            &viewing.secret,
            &spending.public,
            stealth.view_tag,
            &Address::repeat_byte(0xFF),
        )
        .unwrap();
        assert_eq!(check, StealthCheck::AddressMismatch);
    }

    #[test]
    fn test_check_rejects_other_recipient() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let other = generate_identity_keys_with_rng(&mut rng).unwrap();
        let (spending, viewing) = vector_keys();

        let stealth = generate_stealth_address_with_rng(&other.meta_address(), &mut rng).unwrap();
        let check = check_stealth_address(
            &stealth.ephemeral_public_key,
            &viewing.secret,
            &spending.public,
            stealth.view_tag,
            &stealth.address,
        )
        .unwrap();
        assert!(!check.is_match());
    }

    #[test]
    fn test_hash_to_scalar_zero_is_degenerate() {
        assert!(hash_to_scalar(&[0u8; 32]).is_none());
        // The curve order itself reduces to zero too
        let order: [u8; 32] =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
                .unwrap()
                .try_into()
                .unwrap();
        assert!(hash_to_scalar(&order).is_none());
        assert!(hash_to_scalar(&[1u8; 32]).is_some());
    }

    #[test]
    fn test_ephemeral_secret_debug_redacted() {
        let ephemeral = EphemeralSecret::from_bytes(&[0x33; 32]).unwrap();
        assert_eq!(format!("{:?}", ephemeral), "EphemeralSecret([REDACTED])");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_derive_then_recover_roundtrip(seed in any::<u64>()) {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let keys = generate_identity_keys_with_rng(&mut rng).unwrap();
            let stealth = generate_stealth_address_with_rng(&keys.meta_address(), &mut rng).unwrap();

            let check = check_stealth_address(
                &stealth.ephemeral_public_key,
                &keys.viewing.secret,
                &keys.spending.public,
                stealth.view_tag,
                &stealth.address,
            )
            .unwrap();
            prop_assert_eq!(check, StealthCheck::Match);

            let key = derive_stealth_private_key(
                &keys.spending.secret,
                &keys.viewing.secret,
                &stealth.ephemeral_public_key,
            )
            .unwrap();
            prop_assert_eq!(key.address(), stealth.address);
        }
    }
}
