//! Domain types for Dispas.
//!
//! This module provides all the core data structures used throughout the protocol:
//!
//! - [`KeyPair`]: secp256k1 key pair tagged with its role
//! - [`StealthMetaAddress`]: Registered pair of public keys for receiving payments
//! - [`StealthAddress`]: One-time address for a specific payment
//! - [`Announcement`]: Published ephemeral key + view tag
//! - [`DistributionBatch`]: Exact-sum batch of payments

mod keys;
mod address;
mod announcement;
mod payment;

pub use keys::*;
pub use address::*;
pub use announcement::*;
pub use payment::*;
