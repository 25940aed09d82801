//! # Dispas Stealth Payments
//!
//! High-level API for creating and discovering stealth payments.
//!
//! This crate provides:
//!
//! - **Payment Creation**: One-time address + announcement for a recipient
//! - **Discovery**: Recognise announcements addressed to a viewing key
//! - **Wallet**: Key custody with a view-only capability for scanners
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dispas_stealth::{StealthWallet, create_stealth_payment};
//!
//! // Recipient: Generate keys and register the meta-address
//! let wallet = StealthWallet::generate()?;
//! let meta = wallet.meta_address();
//!
//! // Sender: Create stealth payment
//! let payment = create_stealth_payment(&meta)?;
//! // Send funds to payment.stealth.address
//! // Append payment.announcement to the log
//!
//! // Recipient: Discover payments
//! for found in wallet.scan(&announcements) {
//!     println!("Found payment at: {}", found.stealth_address);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod wallet;
pub mod payment;
pub mod discovery;

pub use wallet::{DiscoveredPayment, StealthWallet, ViewOnlyKeys};
pub use payment::{
    create_stealth_payment, create_stealth_payment_with_amount, PaymentDetails, StealthPayment,
    StealthPaymentBuilder,
};
pub use discovery::{
    scan_announcement, scan_announcements, scan_announcements_with_stats, MatchedPayment, ScanResult,
    ScanStats,
};
