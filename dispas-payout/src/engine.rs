//! Exact-sum, all-or-nothing batch distribution.
//!
//! A payer attaches value to a batch of `{recipient, amount}` payments. The
//! caller must control the paying account, and the batch is validated in
//! full before anything moves:
//!
//! 1. no recipient is the zero address
//! 2. no amount is zero
//! 3. the attached value equals the sum of the amounts, exactly
//!
//! An empty batch carrying no value passes all three and moves nothing.
//! Then the ledger applies the whole batch in one atomic call. Value sent
//! without a batch is refused outright.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use dispas_core::error::{DispasError, Result};
use dispas_core::traits::{AccountAuthority, ValueLedger};
use dispas_core::types::{AccountAddress, DistributionBatch, DistributionReceipt, FundsDistributed, Payment, Receipt};
use dispas_core::{Address, U256};

use crate::retry::RetryPolicy;

/// Checks a batch against the attached value and returns its total.
///
/// Runs every check in the fixed order: zero recipients, zero amounts,
/// then the exact sum. Performs no I/O.
pub fn validate_batch(batch: &DistributionBatch, supplied_value: U256) -> Result<U256> {
    if let Some(index) = batch.payments().iter().position(|p| p.recipient.is_zero()) {
        return Err(DispasError::ZeroAddress { index });
    }

    if let Some(index) = batch.payments().iter().position(|p| p.amount.is_zero()) {
        return Err(DispasError::ZeroAmount { index });
    }

    let total = batch.total()?;
    if total != supplied_value {
        return Err(DispasError::InsufficientValue {
            expected: total,
            supplied: supplied_value,
        });
    }

    Ok(total)
}

/// Engine configuration.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Timeout and retry behaviour for ledger calls
    pub retry: RetryPolicy,
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ledger retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}

/// Splits one inbound value into many exact-amount payments.
pub struct DistributionEngine {
    authority: Arc<dyn AccountAuthority>,
    ledger: Arc<dyn ValueLedger>,
    config: EngineConfig,
    /// Serializes ledger submissions so distributions are totally ordered
    submit: Mutex<()>,
    /// Receipts keyed by (payer, nonce)
    receipts: DashMap<(Address, String), DistributionReceipt>,
    events: RwLock<Vec<FundsDistributed>>,
}

impl DistributionEngine {
    /// Creates an engine over `ledger` with the default configuration.
    pub fn new(authority: Arc<dyn AccountAuthority>, ledger: Arc<dyn ValueLedger>) -> Self {
        Self::with_config(authority, ledger, EngineConfig::default())
    }

    /// Creates an engine with a custom configuration.
    pub fn with_config(
        authority: Arc<dyn AccountAuthority>,
        ledger: Arc<dyn ValueLedger>,
        config: EngineConfig,
    ) -> Self {
        Self {
            authority,
            ledger,
            config,
            submit: Mutex::new(()),
            receipts: DashMap::new(),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Returns the underlying ledger.
    pub fn ledger(&self) -> &Arc<dyn ValueLedger> {
        &self.ledger
    }

    /// Returns the `FundsDistributed` events emitted so far, oldest first.
    pub fn events(&self) -> Vec<FundsDistributed> {
        self.events.read().clone()
    }

    /// Validates and applies `batch`, debiting `supplied_value` from `payer`.
    ///
    /// `caller` must control `payer`. With a `nonce`, a repeated call by the
    /// same payer returns the first call's receipt instead of paying again.
    /// Reusing a nonce for a different batch is a validation error.
    #[instrument(skip(self, batch), fields(payments = batch.len()))]
    pub async fn distribute(
        &self,
        caller: Address,
        payer: AccountAddress,
        batch: &DistributionBatch,
        supplied_value: U256,
        nonce: Option<&str>,
    ) -> Result<DistributionReceipt> {
        if !self.authority.controls(caller, &payer) {
            return Err(DispasError::NotAuthorized {
                caller,
                account: payer.address(),
            });
        }
        let payer = payer.address();

        if let Some(receipt) = self.replayed(payer, batch, supplied_value, nonce)? {
            return Ok(receipt);
        }

        let total = validate_batch(batch, supplied_value)?;
        let credits: Vec<(Address, U256)> = batch
            .payments()
            .iter()
            .map(|p| (p.recipient.address(), p.amount))
            .collect();

        let _guard = self.submit.lock().await;

        // A concurrent call with the same nonce may have finished while we waited.
        if let Some(receipt) = self.replayed(payer, batch, supplied_value, nonce)? {
            return Ok(receipt);
        }

        self.config
            .retry
            .run("transfer_batch", || {
                self.ledger.transfer_batch(payer, supplied_value, &credits)
            })
            .await?;

        let receipt = DistributionReceipt {
            batch_id: Uuid::new_v4(),
            payer,
            total_distributed: total,
            receipts: batch
                .payments()
                .iter()
                .enumerate()
                .map(|(index, p)| Receipt {
                    index,
                    recipient: p.recipient,
                    amount: p.amount,
                })
                .collect(),
            nonce: nonce.map(str::to_owned),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        };

        if let Some(nonce) = nonce {
            self.receipts
                .insert((payer, nonce.to_owned()), receipt.clone());
        }
        self.events.write().push(FundsDistributed { payer, total });

        info!(
            batch_id = %receipt.batch_id,
            %payer,
            %total,
            "Funds distributed"
        );
        Ok(receipt)
    }

    /// Pays a single recipient with the same checks as a batch.
    pub async fn send_single(
        &self,
        caller: Address,
        payer: AccountAddress,
        payment: Payment,
        supplied_value: U256,
    ) -> Result<DistributionReceipt> {
        let batch = DistributionBatch::new(vec![payment]);
        self.distribute(caller, payer, &batch, supplied_value, None).await
    }

    /// Value sent without a distribution request. Always refused.
    pub fn receive_bare(&self, sender: Address, value: U256) -> Result<()> {
        warn!(%sender, %value, "Rejected bare deposit");
        Err(DispasError::BareDepositRejected)
    }

    fn replayed(
        &self,
        payer: Address,
        batch: &DistributionBatch,
        supplied_value: U256,
        nonce: Option<&str>,
    ) -> Result<Option<DistributionReceipt>> {
        let Some(nonce) = nonce else {
            return Ok(None);
        };
        let Some(existing) = self.receipts.get(&(payer, nonce.to_owned())) else {
            return Ok(None);
        };

        let same_batch = existing.total_distributed == supplied_value
            && existing.receipts.len() == batch.len()
            && existing
                .receipts
                .iter()
                .zip(batch.payments())
                .all(|(r, p)| r.recipient == p.recipient && r.amount == p.amount);

        if !same_batch {
            return Err(DispasError::ValidationError(format!(
                "nonce {:?} was already used for a different batch",
                nonce
            )));
        }

        info!(%payer, nonce, batch_id = %existing.batch_id, "Replayed distribution");
        Ok(Some(existing.clone()))
    }
}

impl std::fmt::Debug for DistributionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionEngine")
            .field("config", &self.config)
            .field("receipts", &self.receipts.len())
            .finish()
    }
}
