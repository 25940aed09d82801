//! Stealth payment creation (sender side).

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use dispas_core::error::{DispasError, Result};
use dispas_core::types::{encode_native_metadata, Announcement, StealthAddress, StealthMetaAddress};
use dispas_core::U256;
use dispas_crypto::{generate_stealth_address, generate_stealth_address_with_rng};

/// Stealth payment: address to send to and announcement to append.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StealthPayment {
    /// Derived one-time address and its ephemeral key
    pub stealth: StealthAddress,
    /// The announcement to append (ephemeral key + view tag + metadata)
    pub announcement: Announcement,
    /// Off-ledger details about the payment
    #[serde(default)]
    pub details: PaymentDetails,
}

/// Off-ledger details about a stealth payment. Never announced.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Payment amount, if known at creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<U256>,
    /// Optional memo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl StealthPayment {
    fn from_stealth(stealth: StealthAddress, metadata: Vec<u8>, details: PaymentDetails) -> Self {
        let announcement = Announcement::new(
            stealth.address,
            stealth.ephemeral_public_key.clone(),
            stealth.view_tag,
            metadata,
        );
        Self {
            stealth,
            announcement,
            details,
        }
    }

    /// Checks that the announcement describes the derived address.
    pub fn verify(&self) -> Result<()> {
        self.announcement.validate()?;

        let consistent = self.announcement.stealth_address == self.stealth.address
            && self.announcement.ephemeral_public_key == self.stealth.ephemeral_public_key
            && self.announcement.view_tag == self.stealth.view_tag;

        if !consistent {
            return Err(DispasError::InvalidAnnouncement(
                "announcement does not match the derived stealth address".into(),
            ));
        }
        Ok(())
    }
}

/// Derives a fresh stealth address for `meta` and builds its announcement.
pub fn create_stealth_payment(meta: &StealthMetaAddress) -> Result<StealthPayment> {
    let stealth = generate_stealth_address(meta)?;
    Ok(StealthPayment::from_stealth(stealth, Vec::new(), PaymentDetails::default()))
}

/// Like [`create_stealth_payment`], announcing a native-asset amount hint.
pub fn create_stealth_payment_with_amount(
    meta: &StealthMetaAddress,
    amount: U256,
) -> Result<StealthPayment> {
    StealthPaymentBuilder::new().recipient(meta.clone()).native_amount(amount).build()
}

/// Builder for stealth payments with optional metadata.
#[derive(Default)]
pub struct StealthPaymentBuilder {
    meta_address: Option<StealthMetaAddress>,
    metadata: Vec<u8>,
    amount: Option<U256>,
    memo: Option<String>,
}

impl StealthPaymentBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient meta-address (required).
    pub fn recipient(mut self, meta_address: StealthMetaAddress) -> Self {
        self.meta_address = Some(meta_address);
        self
    }

    /// Announces a native-asset amount hint.
    pub fn native_amount(mut self, amount: U256) -> Self {
        self.metadata = encode_native_metadata(amount);
        self.amount = Some(amount);
        self
    }

    /// Sets raw announcement metadata, replacing any amount hint.
    pub fn metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attaches an off-ledger memo.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Builds the payment using the OS CSPRNG.
    pub fn build(self) -> Result<StealthPayment> {
        let meta = self.required_recipient()?;
        let stealth = generate_stealth_address(&meta)?;
        self.finish(stealth)
    }

    /// Builds the payment with a caller-supplied RNG.
    pub fn build_with_rng<G: RngCore + CryptoRng>(self, rng: &mut G) -> Result<StealthPayment> {
        let meta = self.required_recipient()?;
        let stealth = generate_stealth_address_with_rng(&meta, rng)?;
        self.finish(stealth)
    }

    fn required_recipient(&self) -> Result<StealthMetaAddress> {
        self.meta_address
            .clone()
            .ok_or_else(|| DispasError::ValidationError("recipient meta-address is required".into()))
    }

    fn finish(self, stealth: StealthAddress) -> Result<StealthPayment> {
        let details = PaymentDetails {
            amount: self.amount,
            memo: self.memo,
        };
        let payment = StealthPayment::from_stealth(stealth, self.metadata, details);
        payment.announcement.validate()?;
        Ok(payment)
    }
}
