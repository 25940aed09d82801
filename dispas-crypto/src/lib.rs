//! # Dispas Cryptography
//!
//! secp256k1 stealth address primitives for the Dispas protocol
//! (ERC-5564 scheme 1).
//!
//! This crate provides:
//!
//! - **Keys**: Spending and viewing key generation from the OS CSPRNG
//! - **Hash**: Keccak256 and public key → address
//! - **View Tags**: One-byte pre-filter for scanning
//! - **Derivation**: Stealth address derivation, recovery and stealth private keys
//!
//! ## Security Properties
//!
//! - Address and view tag comparisons are constant-time
//! - Secret keys, ephemeral scalars and hashed shared secrets are zeroized on drop
//! - The viewing secret alone can recognise payments but never spend them
//!
//! ## Example
//!
//! ```rust,ignore
//! use dispas_crypto::{generate_identity_keys, generate_stealth_address, check_stealth_address};
//!
//! // Recipient publishes a meta-address
//! let keys = generate_identity_keys()?;
//! let meta = keys.meta_address();
//!
//! // Sender derives a one-time address
//! let stealth = generate_stealth_address(&meta)?;
//!
//! // Recipient recognises it from the announcement
//! let check = check_stealth_address(
//!     &stealth.ephemeral_public_key,
//!     &keys.viewing.secret,
//!     &keys.spending.public,
//!     stealth.view_tag,
//!     &stealth.address,
//! )?;
//! assert!(check.is_match());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod keys;
pub mod hash;
pub mod view_tag;
pub mod derive;

// Re-export main functions at crate root
pub use keys::{
    derive_public_key, generate_identity_keys, generate_identity_keys_with_rng, generate_keypair,
    generate_keypair_with_rng,
};
pub use hash::{keccak256, public_key_to_address};
pub use view_tag::{compute_view_tag, verify_view_tag};
pub use derive::{
    check_stealth_address, derive_stealth_address, derive_stealth_private_key,
    generate_stealth_address, generate_stealth_address_with_rng, recover_stealth_address,
    EphemeralSecret, StealthCheck, StealthPrivateKey,
};
