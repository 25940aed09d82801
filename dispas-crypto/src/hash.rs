//! Keccak256 hashing.
//!
//! Keccak256 is the only hash in the scheme. It is applied to the compressed
//! shared-secret point (giving the view tag and the stealth scalar) and to
//! uncompressed public keys (giving ledger addresses).
//!
//! Note: Keccak256 is NOT SHA3-256. They use different padding.

use sha3::{Digest, Keccak256};

use dispas_core::constants::ADDRESS_SIZE;
use dispas_core::{Address, PublicKey};

/// Computes Keccak256 of `input`.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Computes Keccak256 over several parts, as if concatenated.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Returns the ledger address controlled by `public_key`.
///
/// ```text
/// address = keccak256(x || y)[12..32]
/// ```
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.to_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[32 - ADDRESS_SIZE..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256() {
        let hash = keccak256(b"hello");

        // Known test vector
        let expected =
            hex::decode("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8").unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_keccak256_empty() {
        let expected =
            hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470").unwrap();
        assert_eq!(keccak256(b"").as_slice(), expected.as_slice());
    }

    #[test]
    fn test_keccak256_concat_matches_single() {
        assert_eq!(keccak256_concat(&[b"hel", b"lo"]), keccak256(b"hello"));
    }

    #[test]
    fn test_address_of_secret_one() {
        // Address of the key with secret scalar 1 (the generator point)
        let generator =
            PublicKey::from_hex("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        let expected: Address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
        assert_eq!(public_key_to_address(&generator), expected);
    }
}
