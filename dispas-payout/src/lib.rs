//! # Dispas Payout
//!
//! Moving value: exact-sum batch distribution and stealth transfers
//! between registered accounts.
//!
//! - [`DistributionEngine`]: checks that the caller controls the payer and
//!   validates a batch, then applies it to the
//!   [`ValueLedger`] in one atomic call. Nothing moves unless everything does.
//! - [`StealthSender`]: pays a registered recipient through a fresh stealth
//!   address and appends the matching announcement.
//! - [`MemoryLedger`]: in-memory balances for tests and single-node use.
//! - [`RetryPolicy`]: per-attempt timeout and exponential backoff for
//!   transient ledger failures.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dispas_payout::{DistributionEngine, MemoryLedger};
//!
//! let ledger = Arc::new(MemoryLedger::new());
//! let engine = DistributionEngine::new(Arc::new(AccountOwnership::new()), ledger.clone());
//!
//! let batch: DistributionBatch = [Payment::new(alice, one), Payment::new(bob, half)]
//!     .into_iter()
//!     .collect();
//! let receipt = engine.distribute(payer, payer.into(), &batch, one + half, Some("invoice-17")).await?;
//! ```
//!
//! [`ValueLedger`]: dispas_core::traits::ValueLedger

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod engine;
pub mod ledger;
pub mod retry;
pub mod stealth;

pub use engine::{validate_batch, DistributionEngine, EngineConfig};
pub use ledger::MemoryLedger;
pub use retry::RetryPolicy;
pub use stealth::{StealthSender, StealthTransferReceipt};
