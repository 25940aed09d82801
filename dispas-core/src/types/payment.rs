//! Payment, receipt and event types for batch distribution.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountAddress, StealthMetaAddress};
use crate::error::{DispasError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A single outbound payment, amount in the smallest unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Who receives the value
    pub recipient: AccountAddress,
    /// How much
    pub amount: U256,
}

impl Payment {
    /// Creates a payment.
    pub fn new(recipient: impl Into<AccountAddress>, amount: U256) -> Self {
        Self {
            recipient: recipient.into(),
            amount,
        }
    }
}

/// An ordered list of payments paid out together or not at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionBatch {
    payments: Vec<Payment>,
}

impl DistributionBatch {
    /// Creates a batch from payments in payout order.
    pub fn new(payments: Vec<Payment>) -> Self {
        Self { payments }
    }

    /// Appends a payment.
    pub fn push(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    /// Returns the payments.
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Number of payments.
    pub fn len(&self) -> usize {
        self.payments.len()
    }

    /// Returns true if the batch has no payments.
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Sum of all amounts.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the sum does not fit in 256 bits.
    pub fn total(&self) -> Result<U256> {
        self.payments.iter().try_fold(U256::ZERO, |acc, p| {
            acc.checked_add(p.amount).ok_or(DispasError::AmountOverflow)
        })
    }
}

impl FromIterator<Payment> for DistributionBatch {
    fn from_iter<I: IntoIterator<Item = Payment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECEIPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Proof that one payment of a batch was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Position of the payment in its batch
    pub index: usize,
    /// Credited account
    pub recipient: AccountAddress,
    /// Credited amount
    pub amount: U256,
}

/// Result of a successful distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReceipt {
    /// Unique id of the applied batch
    pub batch_id: Uuid,
    /// Debited account
    pub payer: Address,
    /// Exact amount debited and distributed
    pub total_distributed: U256,
    /// One entry per payment, in batch order
    pub receipts: Vec<Receipt>,
    /// Caller-supplied idempotency key, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Unix timestamp when the batch was applied
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Emitted when an identity registers or rotates its meta-address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaAddressRegistered {
    /// Account the meta-address belongs to
    pub identity: AccountAddress,
    /// Newly stored meta-address
    pub meta_address: StealthMetaAddress,
    /// Account that performed the registration
    pub caller: Address,
}

/// Emitted once per successful batch distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsDistributed {
    /// Debited account
    pub payer: Address,
    /// Sum of all payments
    pub total: U256,
}

/// Emitted once per stealth transfer between registered accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthTransfer {
    /// Sending account
    pub from: AccountAddress,
    /// Registered recipient identity
    pub to: AccountAddress,
    /// One-time address that received the value
    pub stealth_address: Address,
    /// Transferred amount
    pub amount: U256,
    /// Sequence of the matching announcement
    pub sequence: u64,
}

/// Outcome of a registration call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// First registration for the identity.
    Registered,
    /// A different meta-address replaced the previous one.
    Rotated,
    /// Same meta-address as before; nothing changed.
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    #[test]
    fn test_batch_total() {
        let batch: DistributionBatch = vec![
            Payment::new(addr(1), U256::from(100)),
            Payment::new(addr(2), U256::from(50)),
            Payment::new(addr(3), U256::from(25)),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.total().unwrap(), U256::from(175));
    }

    #[test]
    fn test_batch_total_overflow() {
        let batch = DistributionBatch::new(vec![
            Payment::new(addr(1), U256::MAX),
            Payment::new(addr(2), U256::from(1)),
        ]);
        assert!(matches!(batch.total(), Err(DispasError::AmountOverflow)));
    }

    #[test]
    fn test_empty_batch_total() {
        let batch = DistributionBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.total().unwrap(), U256::ZERO);
    }

    #[test]
    fn test_batch_serde_is_a_list() {
        let batch = DistributionBatch::new(vec![Payment::new(addr(1), U256::from(1))]);
        let json = serde_json::to_value(&batch).unwrap();
        assert!(json.is_array());
        let back: DistributionBatch = serde_json::from_value(json).unwrap();
        assert_eq!(back, batch);
    }
}
