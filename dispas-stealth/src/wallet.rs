//! Recipient wallet.
//!
//! The wallet owns both secrets. Scanning services get a [`ViewOnlyKeys`]
//! capability instead, which can find payments but never spend them.

use serde::{Deserialize, Serialize};

use dispas_core::error::Result;
use dispas_core::types::{Announcement, IdentityKeys, PublicKey, StealthMetaAddress, ViewingSecretKey};
use dispas_crypto::{derive_stealth_private_key, generate_identity_keys, StealthPrivateKey};

use crate::discovery::{scan_announcement, scan_announcements, MatchedPayment, ScanResult};

/// Scan capability: viewing secret plus spending public key.
#[derive(Clone, Serialize, Deserialize)]
pub struct ViewOnlyKeys {
    /// Secret used to recompute shared secrets
    pub viewing_secret: ViewingSecretKey,
    /// Public half of the recipient's spending key
    pub spending_public: PublicKey,
}

impl ViewOnlyKeys {
    /// Creates a scan capability.
    pub fn new(viewing_secret: ViewingSecretKey, spending_public: PublicKey) -> Self {
        Self {
            viewing_secret,
            spending_public,
        }
    }

    /// Tests one announcement.
    pub fn check(&self, announcement: &Announcement) -> ScanResult {
        scan_announcement(announcement, &self.viewing_secret, &self.spending_public)
    }

    /// Returns the announcements in `announcements` that pay this recipient.
    pub fn scan(&self, announcements: &[Announcement]) -> Vec<MatchedPayment> {
        scan_announcements(announcements, &self.viewing_secret, &self.spending_public)
    }
}

impl std::fmt::Debug for ViewOnlyKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewOnlyKeys")
            .field("spending_public", &self.spending_public)
            .field("viewing_secret", &"[REDACTED]")
            .finish()
    }
}

/// A discovered payment together with the key that spends it.
pub struct DiscoveredPayment {
    /// What the scan found
    pub matched: MatchedPayment,
    /// Private key of the stealth address
    pub private_key: StealthPrivateKey,
}

impl std::fmt::Debug for DiscoveredPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredPayment")
            .field("matched", &self.matched)
            .field("private_key", &self.private_key)
            .finish()
    }
}

/// A recipient's full key custody.
#[derive(Clone)]
pub struct StealthWallet {
    keys: IdentityKeys,
}

impl StealthWallet {
    /// Generates a new wallet with random keys.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use dispas_stealth::StealthWallet;
    ///
    /// let wallet = StealthWallet::generate()?;
    /// println!("Meta-address: {}", wallet.meta_address());
    /// ```
    pub fn generate() -> Result<Self> {
        Ok(Self::from_keys(generate_identity_keys()?))
    }

    /// Creates a wallet from existing keys.
    pub fn from_keys(keys: IdentityKeys) -> Self {
        Self { keys }
    }

    /// Returns the key set.
    pub fn keys(&self) -> &IdentityKeys {
        &self.keys
    }

    /// Returns the meta-address to publish.
    pub fn meta_address(&self) -> StealthMetaAddress {
        self.keys.meta_address()
    }

    /// Splits off a scan capability that cannot spend.
    pub fn view_only(&self) -> ViewOnlyKeys {
        ViewOnlyKeys::new(self.keys.viewing.secret.clone(), self.keys.spending.public.clone())
    }

    /// Returns the announcements that pay this wallet.
    pub fn scan(&self, announcements: &[Announcement]) -> Vec<MatchedPayment> {
        scan_announcements(
            announcements,
            &self.keys.viewing.secret,
            &self.keys.spending.public,
        )
    }

    /// Checks one announcement and, on a match, derives its spending key.
    ///
    /// Returns `Ok(None)` when the announcement is not ours or is invalid.
    pub fn try_discover(&self, announcement: &Announcement) -> Result<Option<DiscoveredPayment>> {
        let matched = match scan_announcement(
            announcement,
            &self.keys.viewing.secret,
            &self.keys.spending.public,
        ) {
            ScanResult::Matched(matched) => matched,
            _ => return Ok(None),
        };

        let private_key = self.spending_key_for(announcement)?;
        Ok(Some(DiscoveredPayment {
            matched,
            private_key,
        }))
    }

    /// Derives the private key for the stealth address of `announcement`.
    pub fn spending_key_for(&self, announcement: &Announcement) -> Result<StealthPrivateKey> {
        derive_stealth_private_key(
            &self.keys.spending.secret,
            &self.keys.viewing.secret,
            &announcement.ephemeral_public_key,
        )
    }
}

impl std::fmt::Debug for StealthWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthWallet")
            .field("meta_address", &self.meta_address())
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispas_core::U256;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use crate::payment::{create_stealth_payment, StealthPaymentBuilder};

    #[test]
    fn test_wallet_discovers_and_can_spend() {
        let wallet = StealthWallet::generate().unwrap();
        let payment = create_stealth_payment(&wallet.meta_address()).unwrap();

        let found = wallet.try_discover(&payment.announcement).unwrap().unwrap();
        assert_eq!(found.matched.stealth_address, payment.stealth.address);
        assert_eq!(found.private_key.address(), payment.stealth.address);
    }

    #[test]
    fn test_wallet_ignores_foreign_payment() {
        let wallet = StealthWallet::generate().unwrap();
        let other = StealthWallet::generate().unwrap();
        let payment = create_stealth_payment(&other.meta_address()).unwrap();

        assert!(wallet.try_discover(&payment.announcement).unwrap().is_none());
    }

    #[test]
    fn test_view_only_keys_find_the_same_payments() {
        let wallet = StealthWallet::generate().unwrap();
        let other = StealthWallet::generate().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        let announcements: Vec<_> = (0..6)
            .map(|i| {
                let target = if i % 2 == 0 { &wallet } else { &other };
                StealthPaymentBuilder::new()
                    .recipient(target.meta_address())
                    .native_amount(U256::from(i + 1))
                    .build_with_rng(&mut rng)
                    .unwrap()
                    .announcement
            })
            .collect();

        let full = wallet.scan(&announcements);
        let view_only = wallet.view_only().scan(&announcements);
        assert_eq!(full, view_only);
        assert_eq!(full.len(), 3);
        assert_eq!(full[1].announcement.native_amount(), Some(U256::from(3)));
    }

    #[test]
    fn test_view_only_keys_survive_serde() {
        let wallet = StealthWallet::generate().unwrap();
        let payment = create_stealth_payment(&wallet.meta_address()).unwrap();

        let json = serde_json::to_string(&wallet.view_only()).unwrap();
        let restored: ViewOnlyKeys = serde_json::from_str(&json).unwrap();
        assert!(restored.check(&payment.announcement).is_matched());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let wallet = StealthWallet::generate().unwrap();
        let view_only = wallet.view_only();
        let secret_hex = view_only.viewing_secret.to_hex();

        assert!(!format!("{:?}", wallet).contains(secret_hex.as_str()));
        assert!(!format!("{:?}", view_only).contains(secret_hex.as_str()));
    }
}
