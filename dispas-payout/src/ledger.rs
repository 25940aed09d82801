//! In-memory value ledger.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use dispas_core::error::{DispasError, Result};
use dispas_core::traits::ValueLedger;
use dispas_core::{Address, U256};

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, U256>,
    rejecting: HashSet<Address>,
}

/// Balances held in memory.
///
/// A batch is staged against a snapshot of the touched accounts and only
/// committed once every credit has been accepted, all under one lock.
/// Accounts can be marked as refusing inbound value to model recipients
/// whose code reverts on receipt.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the balance of `account`.
    pub fn set_balance(&self, account: Address, amount: U256) {
        self.state.lock().balances.insert(account, amount);
    }

    /// Adds `amount` to `account` out of thin air (faucet / genesis).
    pub fn mint(&self, account: Address, amount: U256) -> Result<U256> {
        let mut state = self.state.lock();
        let balance = state.balances.entry(account).or_insert(U256::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(DispasError::AmountOverflow)?;
        Ok(*balance)
    }

    /// Makes every future credit to `account` fail.
    pub fn reject_inbound(&self, account: Address) {
        self.state.lock().rejecting.insert(account);
    }

    /// Lets `account` receive value again.
    pub fn accept_inbound(&self, account: Address) {
        self.state.lock().rejecting.remove(&account);
    }

    /// Synchronous balance read.
    pub fn balance(&self, account: &Address) -> U256 {
        self.state
            .lock()
            .balances
            .get(account)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> U256 {
        self.state
            .lock()
            .balances
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryLedger")
            .field("accounts", &state.balances.len())
            .field("rejecting", &state.rejecting.len())
            .finish()
    }
}

#[async_trait]
impl ValueLedger for MemoryLedger {
    async fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.balance(&account))
    }

    #[instrument(skip(self, credits), fields(credits = credits.len()))]
    async fn transfer_batch(
        &self,
        from: Address,
        debit: U256,
        credits: &[(Address, U256)],
    ) -> Result<()> {
        let credited = credits
            .iter()
            .try_fold(U256::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(DispasError::AmountOverflow)?;
        if credited != debit {
            return Err(DispasError::ValidationError(format!(
                "credits sum to {}, debit is {}",
                credited, debit
            )));
        }

        let mut state = self.state.lock();

        let available = state.balances.get(&from).copied().unwrap_or(U256::ZERO);
        if available < debit {
            return Err(DispasError::InsufficientBalance {
                account: from,
                required: debit,
                available,
            });
        }

        let mut staged: HashMap<Address, U256> = HashMap::new();
        staged.insert(from, available - debit);

        for (recipient, amount) in credits {
            if state.rejecting.contains(recipient) {
                warn!(%recipient, "Recipient refused value; batch rolled back");
                return Err(DispasError::TransferRejected {
                    recipient: *recipient,
                });
            }
            let current = match staged.get(recipient) {
                Some(balance) => *balance,
                None => state.balances.get(recipient).copied().unwrap_or(U256::ZERO),
            };
            let updated = current
                .checked_add(*amount)
                .ok_or(DispasError::AmountOverflow)?;
            staged.insert(*recipient, updated);
        }

        state.balances.extend(staged);
        debug!(%from, %debit, "Batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18))
    }

    #[tokio::test]
    async fn test_transfer_batch_moves_exact_amounts() {
        let ledger = MemoryLedger::new();
        ledger.set_balance(addr(1), eth(10));

        ledger
            .transfer_batch(addr(1), eth(3), &[(addr(2), eth(1)), (addr(3), eth(2))])
            .await
            .unwrap();

        assert_eq!(ledger.balance(&addr(1)), eth(7));
        assert_eq!(ledger.balance(&addr(2)), eth(1));
        assert_eq!(ledger.balance(&addr(3)), eth(2));
        assert_eq!(ledger.total_supply(), eth(10));
    }

    #[tokio::test]
    async fn test_insufficient_balance_changes_nothing() {
        let ledger = MemoryLedger::new();
        ledger.set_balance(addr(1), eth(1));

        let result = ledger.transfer_batch(addr(1), eth(2), &[(addr(2), eth(2))]).await;

        assert!(matches!(result, Err(DispasError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance(&addr(1)), eth(1));
        assert_eq!(ledger.balance(&addr(2)), U256::ZERO);
    }

    #[tokio::test]
    async fn test_rejecting_recipient_rolls_back_batch() {
        let ledger = MemoryLedger::new();
        ledger.set_balance(addr(1), eth(5));
        ledger.reject_inbound(addr(3));

        let result = ledger
            .transfer_batch(addr(1), eth(2), &[(addr(2), eth(1)), (addr(3), eth(1))])
            .await;

        assert!(matches!(
            result,
            Err(DispasError::TransferRejected { recipient }) if recipient == addr(3)
        ));
        assert_eq!(ledger.balance(&addr(1)), eth(5));
        assert_eq!(ledger.balance(&addr(2)), U256::ZERO);

        ledger.accept_inbound(addr(3));
        ledger
            .transfer_batch(addr(1), eth(2), &[(addr(2), eth(1)), (addr(3), eth(1))])
            .await
            .unwrap();
        assert_eq!(ledger.balance(&addr(3)), eth(1));
    }

    #[tokio::test]
    async fn test_repeated_recipient_and_self_credit() {
        let ledger = MemoryLedger::new();
        ledger.set_balance(addr(1), eth(4));

        ledger
            .transfer_batch(
                addr(1),
                eth(4),
                &[(addr(2), eth(1)), (addr(2), eth(1)), (addr(1), eth(2))],
            )
            .await
            .unwrap();

        assert_eq!(ledger.balance(&addr(1)), eth(2));
        assert_eq!(ledger.balance(&addr(2)), eth(2));
    }

    #[tokio::test]
    async fn test_unbalanced_batch_is_refused() {
        let ledger = MemoryLedger::new();
        ledger.set_balance(addr(1), eth(4));

        let result = ledger.transfer_batch(addr(1), eth(2), &[(addr(2), eth(1))]).await;
        assert!(matches!(result, Err(DispasError::ValidationError(_))));
        assert_eq!(ledger.balance(&addr(1)), eth(4));
    }

    #[test]
    fn test_balance_of_matches_sync_read() {
        let ledger = MemoryLedger::new();
        ledger.mint(addr(7), eth(3)).unwrap();

        let async_balance = tokio_test::block_on(ledger.balance_of(addr(7))).unwrap();
        assert_eq!(async_balance, ledger.balance(&addr(7)));
        assert_eq!(tokio_test::block_on(ledger.balance_of(addr(8))).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_mint_overflow() {
        let ledger = MemoryLedger::new();
        ledger.mint(addr(1), U256::MAX).unwrap();
        assert!(matches!(ledger.mint(addr(1), U256::from(1)), Err(DispasError::AmountOverflow)));
    }
}
