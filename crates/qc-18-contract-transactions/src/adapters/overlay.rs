//! # State Overlay
//!
//! Copy-on-write view over a [`LedgerBackend`]. Reads check the overlay's
//! buffered writes first, then fall back to the parent; writes never reach
//! the parent until [`StateOverlay::commit`]. Dropping the overlay discards
//! everything it buffered.
//!
//! Overlays implement [`LedgerBackend`] themselves, so a per-transaction
//! overlay can sit on top of a per-block overlay.

use crate::domain::entities::{Account, Contract};
use crate::domain::identity::UserId;
use crate::domain::value_objects::{KeyHash, RegId, TxHash, TxLocation};
use crate::errors::StoreError;
use crate::ports::outbound::{
    AccountStore, ChangeSet, ContractStore, LedgerBackend, LedgerReader,
};
use std::collections::BTreeSet;
use tracing::trace;

/// Block- or transaction-scoped state overlay.
pub struct StateOverlay<'a, B: LedgerBackend + ?Sized> {
    base: &'a mut B,
    changes: ChangeSet,
}

impl<'a, B: LedgerBackend + ?Sized> StateOverlay<'a, B> {
    /// Opens an empty overlay over `base`.
    pub fn new(base: &'a mut B) -> Self {
        Self {
            base,
            changes: ChangeSet::default(),
        }
    }

    /// Writes buffered so far.
    #[must_use]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Applies all buffered writes to the parent.
    ///
    /// # Errors
    ///
    /// Whatever the parent's `apply` returns.
    pub fn commit(self) -> Result<(), StoreError> {
        if self.changes.is_empty() {
            return Ok(());
        }
        trace!(
            accounts = self.changes.accounts.len(),
            contracts = self.changes.contracts.len(),
            "committing overlay"
        );
        self.base.apply(self.changes)
    }

    /// Drops all buffered writes.
    pub fn discard(self) {
        trace!(accounts = self.changes.accounts.len(), "discarding overlay");
    }

    fn resolve_key(&self, id: &UserId) -> Result<Option<KeyHash>, StoreError> {
        match id {
            UserId::RegId(reg_id) => self.key_hash_of(reg_id),
            other => other
                .direct_key_hash()
                .map_err(|e| StoreError::UnresolvedIdentity(format!("{other}: {e}"))),
        }
    }

    fn bind_reg_id(&mut self, reg_id: RegId, key_hash: KeyHash) -> Result<(), StoreError> {
        match self.key_hash_of(&reg_id)? {
            Some(existing) if existing != key_hash => Err(StoreError::RegIdConflict {
                reg_id,
                existing,
            }),
            Some(_) => Ok(()),
            None => {
                self.changes.reg_ids.insert(reg_id, key_hash);
                Ok(())
            }
        }
    }
}

impl<B: LedgerBackend + ?Sized> LedgerReader for StateOverlay<'_, B> {
    fn account(&self, key_hash: &KeyHash) -> Result<Option<Account>, StoreError> {
        match self.changes.accounts.get(key_hash) {
            Some(account) => Ok(Some(account.clone())),
            None => self.base.account(key_hash),
        }
    }

    fn key_hash_of(&self, reg_id: &RegId) -> Result<Option<KeyHash>, StoreError> {
        match self.changes.reg_ids.get(reg_id) {
            Some(key) => Ok(Some(*key)),
            None => self.base.key_hash_of(reg_id),
        }
    }

    fn contract(&self, reg_id: &RegId) -> Result<Option<Contract>, StoreError> {
        match self.changes.contracts.get(reg_id) {
            Some(contract) => Ok(Some(contract.clone())),
            None => self.base.contract(reg_id),
        }
    }

    fn involved(&self, tx_hash: &TxHash) -> Result<Option<BTreeSet<KeyHash>>, StoreError> {
        match self.changes.involved.get(tx_hash) {
            Some(keys) => Ok(Some(keys.clone())),
            None => self.base.involved(tx_hash),
        }
    }

    fn address_txs(&self, key_hash: &KeyHash) -> Result<Vec<TxLocation>, StoreError> {
        let mut txs = self.base.address_txs(key_hash)?;
        if let Some(pending) = self.changes.address_txs.get(key_hash) {
            txs.extend_from_slice(pending);
        }
        Ok(txs)
    }
}

impl<B: LedgerBackend + ?Sized> LedgerBackend for StateOverlay<'_, B> {
    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        let ChangeSet {
            accounts,
            reg_ids,
            contracts,
            involved,
            address_txs,
        } = changes;
        self.changes.accounts.extend(accounts);
        self.changes.reg_ids.extend(reg_ids);
        self.changes.contracts.extend(contracts);
        self.changes.involved.extend(involved);
        for (key, mut txs) in address_txs {
            self.changes.address_txs.entry(key).or_default().append(&mut txs);
        }
        Ok(())
    }
}

impl<B: LedgerBackend + ?Sized> AccountStore for StateOverlay<'_, B> {
    fn get_account(&self, id: &UserId) -> Result<Option<Account>, StoreError> {
        match self.resolve_key(id)? {
            Some(key) => self.account(&key),
            None => Ok(None),
        }
    }

    fn set_account(&mut self, id: &UserId, account: &Account) -> Result<(), StoreError> {
        let key = self
            .resolve_key(id)?
            .ok_or_else(|| StoreError::UnresolvedIdentity(id.to_string()))?;
        if key != account.key_hash {
            return Err(StoreError::IdentityMismatch {
                resolved: key,
                carried: account.key_hash,
            });
        }
        if let Some(reg_id) = account.reg_id {
            self.bind_reg_id(reg_id, key)?;
        }
        self.changes.accounts.insert(key, account.clone());
        Ok(())
    }

    fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if account.key_hash.is_null() {
            return Err(StoreError::UnresolvedIdentity("null key hash".to_string()));
        }
        if let Some(reg_id) = account.reg_id {
            self.bind_reg_id(reg_id, account.key_hash)?;
        }
        self.changes
            .accounts
            .insert(account.key_hash, account.clone());
        Ok(())
    }

    fn get_reg_id(&self, id: &UserId) -> Result<Option<RegId>, StoreError> {
        if let UserId::RegId(reg_id) = id {
            return Ok(self.key_hash_of(reg_id)?.map(|_| *reg_id));
        }
        match self.resolve_key(id)? {
            Some(key) => Ok(self.account(&key)?.and_then(|a| a.reg_id)),
            None => Ok(None),
        }
    }

    fn get_key_hash(&self, id: &UserId) -> Result<Option<KeyHash>, StoreError> {
        self.resolve_key(id)
    }
}

impl<B: LedgerBackend + ?Sized> ContractStore for StateOverlay<'_, B> {
    fn get_contract(&self, id: &RegId) -> Result<Option<Contract>, StoreError> {
        self.contract(id)
    }

    fn save_contract(&mut self, id: &RegId, contract: &Contract) -> Result<(), StoreError> {
        if self.contract(id)?.is_some() {
            return Err(StoreError::ContractExists(*id));
        }
        self.changes.contracts.insert(*id, contract.clone());
        Ok(())
    }

    fn set_involved_addresses(
        &mut self,
        tx_hash: &TxHash,
        key_hashes: &BTreeSet<KeyHash>,
    ) -> Result<(), StoreError> {
        if self.involved(tx_hash)?.is_some() {
            return Err(StoreError::InvolvementExists(*tx_hash));
        }
        self.changes.involved.insert(*tx_hash, key_hashes.clone());
        Ok(())
    }

    fn get_involved_addresses(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<BTreeSet<KeyHash>>, StoreError> {
        self.involved(tx_hash)
    }

    fn add_address_tx(
        &mut self,
        key_hash: &KeyHash,
        location: TxLocation,
    ) -> Result<(), StoreError> {
        self.changes
            .address_txs
            .entry(*key_hash)
            .or_default()
            .push(location);
        Ok(())
    }

    fn get_address_txs(&self, key_hash: &KeyHash) -> Result<Vec<TxLocation>, StoreError> {
        self.address_txs(key_hash)
    }
}
