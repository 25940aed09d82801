//! Stealth transfers between registered accounts.
//!
//! The sender names a registered identity; the value lands on a fresh
//! one-time address derived from that identity's meta-address, and an
//! announcement lets the recipient find it.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use dispas_core::error::{DispasError, Result};
use dispas_core::traits::{AccountAuthority, AnnouncementLog, MetaAddressRegistry, ValueLedger};
use dispas_core::types::{AccountAddress, Announcement, StealthTransfer};
use dispas_core::{Address, U256};
use dispas_stealth::StealthPaymentBuilder;

use crate::retry::RetryPolicy;

/// Result of a successful stealth transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthTransferReceipt {
    /// The emitted event
    pub event: StealthTransfer,
    /// The appended announcement, with its sequence
    pub announcement: Announcement,
}

/// Routes value to registered recipients through stealth addresses.
pub struct StealthSender {
    authority: Arc<dyn AccountAuthority>,
    registry: Arc<dyn MetaAddressRegistry>,
    log: Arc<dyn AnnouncementLog>,
    ledger: Arc<dyn ValueLedger>,
    retry: RetryPolicy,
    /// Keeps transfer and announcement order identical
    submit: Mutex<()>,
    events: RwLock<Vec<StealthTransfer>>,
}

impl StealthSender {
    /// Wires a sender to its stores.
    pub fn new(
        authority: Arc<dyn AccountAuthority>,
        registry: Arc<dyn MetaAddressRegistry>,
        log: Arc<dyn AnnouncementLog>,
        ledger: Arc<dyn ValueLedger>,
    ) -> Self {
        Self {
            authority,
            registry,
            log,
            ledger,
            retry: RetryPolicy::default(),
            submit: Mutex::new(()),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Sets the ledger retry policy.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Returns the `StealthTransfer` events emitted so far, oldest first.
    pub fn events(&self) -> Vec<StealthTransfer> {
        self.events.read().clone()
    }

    /// Sends `amount` from `from` to a fresh stealth address of `to`.
    ///
    /// `metadata` defaults to the native amount hint `0xeeeeeeee || amount`.
    /// Checks run before any value moves: `caller` must control `from`, `to`
    /// must have a registered meta-address, and `amount` must be non-zero.
    /// If the announcement cannot be appended the transfer is reversed, so
    /// value never sits on an address its owner cannot discover.
    #[instrument(skip(self, metadata), fields(from = %from, to = %to))]
    pub async fn send_stealth(
        &self,
        caller: Address,
        from: AccountAddress,
        to: AccountAddress,
        amount: U256,
        metadata: Option<Vec<u8>>,
    ) -> Result<StealthTransferReceipt> {
        if !self.authority.controls(caller, &from) {
            return Err(DispasError::NotAuthorized {
                caller,
                account: from.address(),
            });
        }

        let meta = self
            .registry
            .lookup(to.address())
            .await?
            .ok_or(DispasError::RecipientNotRegistered(to.address()))?;

        if amount.is_zero() {
            return Err(DispasError::ZeroAmount { index: 0 });
        }

        let builder = StealthPaymentBuilder::new().recipient(meta).native_amount(amount);
        let builder = match metadata {
            Some(bytes) => builder.metadata(bytes),
            None => builder,
        };
        let payment = builder.build()?;
        let stealth_address = payment.stealth.address;

        let _guard = self.submit.lock().await;

        let credits = [(stealth_address, amount)];
        self.retry
            .run("stealth_transfer", || {
                self.ledger.transfer_batch(from.address(), amount, &credits)
            })
            .await?;

        let sequence = match self.log.append(payment.announcement.clone()).await {
            Ok(sequence) => sequence,
            Err(err) => {
                self.refund(stealth_address, from.address(), amount).await;
                return Err(err);
            }
        };
        let mut announcement = payment.announcement;
        announcement.sequence = sequence;

        let event = StealthTransfer {
            from,
            to,
            stealth_address,
            amount,
            sequence,
        };
        self.events.write().push(event.clone());

        info!(sequence, %amount, "Stealth transfer announced");
        Ok(StealthTransferReceipt {
            event,
            announcement,
        })
    }

    /// Moves `amount` back from an unannounced stealth address.
    async fn refund(&self, stealth_address: Address, to: Address, amount: U256) {
        let credits = [(to, amount)];
        let result = self
            .retry
            .run("stealth_refund", || {
                self.ledger.transfer_batch(stealth_address, amount, &credits)
            })
            .await;

        match result {
            Ok(()) => warn!(%stealth_address, %amount, "Announcement failed; stealth transfer reversed"),
            Err(err) => error!(
                %stealth_address,
                %amount,
                error = %err,
                "Announcement failed and reversal failed; value is stranded"
            ),
        }
    }
}

impl std::fmt::Debug for StealthSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthSender")
            .field("retry", &self.retry)
            .field("events", &self.events.read().len())
            .finish()
    }
}
