//! Identity → stealth meta-address registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use dispas_core::error::{DispasError, Result};
use dispas_core::traits::{AccountAuthority, MetaAddressRegistry};
use dispas_core::types::{AccountAddress, MetaAddressRegistered, RegistrationOutcome, StealthMetaAddress};
use dispas_core::Address;

/// Ownership records for smart accounts.
///
/// Key-controlled accounts always control themselves. A smart account is
/// controlled only by the owner recorded here; an unknown smart account is
/// controlled by nobody.
#[derive(Debug, Default)]
pub struct AccountOwnership {
    owners: DashMap<Address, Address>,
}

impl AccountOwnership {
    /// Creates an empty ownership table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `owner` as the controller of smart account `account`.
    pub fn set_owner(&self, account: Address, owner: Address) {
        debug!(%account, %owner, "Smart account owner set");
        self.owners.insert(account, owner);
    }

    /// Returns the recorded owner of a smart account.
    pub fn owner_of(&self, account: &Address) -> Option<Address> {
        self.owners.get(account).map(|entry| *entry.value())
    }
}

impl AccountAuthority for AccountOwnership {
    fn controls(&self, caller: Address, account: &AccountAddress) -> bool {
        match account {
            AccountAddress::Eoa(address) => *address == caller,
            AccountAddress::SmartAccount(address) => self.owner_of(address) == Some(caller),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<Address, StealthMetaAddress>,
    events: Vec<MetaAddressRegistered>,
}

/// In-memory meta-address registry.
///
/// Writes are serialized by one lock, so the event log order matches the
/// order in which registrations took effect.
pub struct MemoryMetaRegistry {
    authority: Arc<dyn AccountAuthority>,
    state: RwLock<RegistryState>,
}

impl MemoryMetaRegistry {
    /// Creates an empty registry using `authority` for access checks.
    pub fn new(authority: Arc<dyn AccountAuthority>) -> Self {
        Self {
            authority,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Returns the registration events emitted so far, oldest first.
    pub fn events(&self) -> Vec<MetaAddressRegistered> {
        self.state.read().events.clone()
    }

    /// Returns the number of registered identities.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if nobody has registered.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

impl Default for MemoryMetaRegistry {
    fn default() -> Self {
        Self::new(Arc::new(AccountOwnership::new()))
    }
}

impl std::fmt::Debug for MemoryMetaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMetaRegistry")
            .field("identities", &self.len())
            .finish()
    }
}

#[async_trait]
impl MetaAddressRegistry for MemoryMetaRegistry {
    #[instrument(skip(self, meta_address), fields(identity = %identity))]
    async fn register(
        &self,
        caller: Address,
        identity: AccountAddress,
        meta_address: StealthMetaAddress,
    ) -> Result<RegistrationOutcome> {
        if !self.authority.controls(caller, &identity) {
            return Err(DispasError::NotAuthorized {
                caller,
                account: identity.address(),
            });
        }

        let mut state = self.state.write();
        let outcome = match state.entries.get(&identity.address()) {
            Some(current) if *current == meta_address => {
                debug!("Identical meta-address already registered");
                return Ok(RegistrationOutcome::Unchanged);
            }
            Some(_) => RegistrationOutcome::Rotated,
            None => RegistrationOutcome::Registered,
        };

        state.entries.insert(identity.address(), meta_address.clone());
        state.events.push(MetaAddressRegistered {
            identity,
            meta_address,
            caller,
        });

        info!(%caller, ?outcome, "Meta-address registered");
        Ok(outcome)
    }

    async fn lookup(&self, identity: Address) -> Result<Option<StealthMetaAddress>> {
        Ok(self.state.read().entries.get(&identity).cloned())
    }
}
