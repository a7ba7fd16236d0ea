//! In-memory ledger backend.

use crate::domain::entities::{Account, Contract};
use crate::domain::value_objects::{KeyHash, RegId, TxHash, TxLocation};
use crate::errors::StoreError;
use crate::ports::outbound::{ChangeSet, LedgerBackend, LedgerReader};
use std::collections::{BTreeSet, HashMap};

/// In-memory persistent ledger, the bottom layer under block overlays.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: HashMap<KeyHash, Account>,
    reg_ids: HashMap<RegId, KeyHash>,
    contracts: HashMap<RegId, Contract>,
    involved: HashMap<TxHash, BTreeSet<KeyHash>>,
    address_txs: HashMap<KeyHash, Vec<TxLocation>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account (genesis or test setup), binding its registration id.
    pub fn insert_account(&mut self, account: Account) {
        if let Some(reg_id) = account.reg_id {
            self.reg_ids.insert(reg_id, account.key_hash);
        }
        self.accounts.insert(account.key_hash, account);
    }

    /// Seeds a deployed contract.
    pub fn insert_contract(&mut self, reg_id: RegId, contract: Contract) {
        self.contracts.insert(reg_id, contract);
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of deployed contracts.
    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }
}

impl LedgerReader for InMemoryLedger {
    fn account(&self, key_hash: &KeyHash) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(key_hash).cloned())
    }

    fn key_hash_of(&self, reg_id: &RegId) -> Result<Option<KeyHash>, StoreError> {
        Ok(self.reg_ids.get(reg_id).copied())
    }

    fn contract(&self, reg_id: &RegId) -> Result<Option<Contract>, StoreError> {
        Ok(self.contracts.get(reg_id).cloned())
    }

    fn involved(&self, tx_hash: &TxHash) -> Result<Option<BTreeSet<KeyHash>>, StoreError> {
        Ok(self.involved.get(tx_hash).cloned())
    }

    fn address_txs(&self, key_hash: &KeyHash) -> Result<Vec<TxLocation>, StoreError> {
        Ok(self.address_txs.get(key_hash).cloned().unwrap_or_default())
    }
}

impl LedgerBackend for InMemoryLedger {
    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        self.accounts.extend(changes.accounts);
        self.reg_ids.extend(changes.reg_ids);
        self.contracts.extend(changes.contracts);
        self.involved.extend(changes.involved);
        for (key, mut txs) in changes.address_txs {
            self.address_txs.entry(key).or_default().append(&mut txs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_account_binds_reg_id() {
        let mut ledger = InMemoryLedger::new();
        let mut acct = Account::new(KeyHash::new([1; 20]));
        acct.reg_id = Some(RegId::new(3, 2));
        ledger.insert_account(acct);

        assert_eq!(ledger.account_count(), 1);
        assert_eq!(
            ledger.key_hash_of(&RegId::new(3, 2)).unwrap(),
            Some(KeyHash::new([1; 20]))
        );
    }

    #[test]
    fn test_apply_appends_history() {
        let mut ledger = InMemoryLedger::new();
        let key = KeyHash::new([9; 20]);
        for index in 0..2u16 {
            let mut changes = ChangeSet::default();
            changes.address_txs.insert(
                key,
                vec![TxLocation {
                    height: 1,
                    index,
                    tx_hash: TxHash::ZERO,
                }],
            );
            ledger.apply(changes).unwrap();
        }
        let txs = ledger.address_txs(&key).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].index, 1);
    }
}
