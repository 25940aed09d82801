//! # Dispas Core
//!
//! Core types, errors, and store traits for the Dispas stealth payment and
//! batch distribution protocol.
//!
//! This crate provides the foundational building blocks used by all other Dispas crates:
//!
//! - **Types**: Keys, meta-addresses, announcements, payments and events
//! - **Errors**: One error enum with stable codes
//! - **Constants**: Protocol constants and sizes
//! - **Traits**: Injected stores (registry, announcement log, value ledger)
//!
//! ## Example
//!
//! ```rust
//! use dispas_core::{Address, DistributionBatch, Payment, U256};
//!
//! let batch = DistributionBatch::new(vec![
//!     Payment::new(Address::repeat_byte(1), U256::from(100)),
//!     Payment::new(Address::repeat_byte(2), U256::from(50)),
//! ]);
//! assert_eq!(batch.total().unwrap(), U256::from(150));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use alloy_primitives::{Address, U256};
pub use constants::*;
pub use error::{DispasError, Result};
pub use traits::*;
pub use types::*;
