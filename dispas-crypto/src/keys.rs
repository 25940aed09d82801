//! Key generation.
//!
//! Secrets are drawn from the operating system CSPRNG by rejection sampling:
//! 32 random bytes are accepted only if they encode a non-zero scalar below
//! the curve order.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use dispas_core::constants::SECRET_KEY_SIZE;
use dispas_core::error::{DispasError, Result};
use dispas_core::types::{IdentityKeys, KeyPair, KeyRole, PublicKey, SecretKey};

/// Candidates tried before declaring the entropy source broken.
/// An honest RNG fails a single draw with probability below 2^-127.
const MAX_SAMPLING_ATTEMPTS: usize = 16;

/// Generates a key pair of role `R` from the OS CSPRNG.
///
/// # Errors
/// Returns `Entropy` if the random source fails.
///
/// # Example
///
/// ```rust,ignore
/// use dispas_core::{Spending, SpendingKeyPair};
/// use dispas_crypto::generate_keypair;
///
/// let spending: SpendingKeyPair = generate_keypair()?;
/// ```
pub fn generate_keypair<R: KeyRole>() -> Result<KeyPair<R>> {
    generate_keypair_with_rng(&mut OsRng)
}

/// Generates a key pair from the given RNG.
pub fn generate_keypair_with_rng<R, G>(rng: &mut G) -> Result<KeyPair<R>>
where
    R: KeyRole,
    G: RngCore + CryptoRng,
{
    Ok(KeyPair::from_secret(generate_secret_with_rng(rng)?))
}

/// Samples a secret scalar of role `R`.
pub fn generate_secret_with_rng<R, G>(rng: &mut G) -> Result<SecretKey<R>>
where
    R: KeyRole,
    G: RngCore + CryptoRng,
{
    Ok(SecretKey::from_k256(sample_scalar(rng)?))
}

pub(crate) fn sample_scalar<G: RngCore + CryptoRng>(rng: &mut G) -> Result<k256::SecretKey> {
    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        let mut candidate = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
        rng.try_fill_bytes(&mut candidate[..])
            .map_err(|e| DispasError::Entropy(e.to_string()))?;

        if let Ok(secret) = k256::SecretKey::from_slice(&candidate[..]) {
            return Ok(secret);
        }
    }

    Err(DispasError::Entropy(
        "random source produced no valid scalar".into(),
    ))
}

/// Generates a full spending + viewing key set from the OS CSPRNG.
pub fn generate_identity_keys() -> Result<IdentityKeys> {
    generate_identity_keys_with_rng(&mut OsRng)
}

/// Generates a full spending + viewing key set from the given RNG.
pub fn generate_identity_keys_with_rng<G: RngCore + CryptoRng>(rng: &mut G) -> Result<IdentityKeys> {
    let spending = generate_keypair_with_rng(rng)?;
    let viewing = generate_keypair_with_rng(rng)?;
    Ok(IdentityKeys::new(spending, viewing))
}

/// Returns `secret·G`. Deterministic and total.
pub fn derive_public_key<R: KeyRole>(secret: &SecretKey<R>) -> PublicKey {
    secret.public_key()
}
