//! # Involved-Address Tracker
//!
//! [`involved_key_ids`] derives the participants from the transaction alone,
//! without running the VM. For invokes this is `{sender, contract}` and can
//! miss accounts the script touched; the authoritative entry is the one
//! execution writes through `ContractStore::set_involved_addresses`.

use crate::domain::entities::ContractTx;
use crate::domain::value_objects::KeyHash;
use crate::errors::IdentityError;
use crate::ports::outbound::AccountStore;
use std::collections::BTreeSet;

/// Key hashes of the transaction's primary participants.
///
/// # Errors
///
/// If the sender or (for invokes) the contract does not resolve.
pub fn involved_key_ids<V: AccountStore + ?Sized>(
    tx: &ContractTx,
    view: &V,
) -> Result<BTreeSet<KeyHash>, IdentityError> {
    let mut keys = BTreeSet::new();
    keys.insert(tx.sender().resolve(view)?);
    if let ContractTx::Invoke(invoke) = tx {
        keys.insert(invoke.app.resolve(view)?);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryLedger, StateOverlay};
    use crate::domain::entities::{Account, ContractPayload, DeployContractTx, InvokeContractTx};
    use crate::domain::identity::UserId;
    use crate::domain::value_objects::RegId;

    fn ledger() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        let mut sender = Account::new(KeyHash::new([1; 20]));
        sender.reg_id = Some(RegId::new(1, 0));
        ledger.insert_account(sender);
        ledger.insert_account(Account::new_contract(RegId::new(2, 0)));
        ledger
    }

    #[test]
    fn test_deploy_involves_sender_only() {
        let mut ledger = ledger();
        let overlay = StateOverlay::new(&mut ledger);
        let tx: ContractTx = DeployContractTx {
            version: 1,
            sender: UserId::RegId(RegId::new(1, 0)),
            contract: ContractPayload::default(),
            fee: 1,
            valid_height: 1,
            signature: vec![],
        }
        .into();

        let keys = involved_key_ids(&tx, &overlay).unwrap();
        assert_eq!(keys, [KeyHash::new([1; 20])].into_iter().collect());
    }

    #[test]
    fn test_invoke_involves_sender_and_contract() {
        let mut ledger = ledger();
        let overlay = StateOverlay::new(&mut ledger);
        let tx: ContractTx = InvokeContractTx {
            version: 1,
            sender: UserId::RegId(RegId::new(1, 0)),
            app: UserId::RegId(RegId::new(2, 0)),
            fee: 1,
            amount: 0,
            arguments: vec![],
            valid_height: 1,
            signature: vec![],
        }
        .into();

        let keys = involved_key_ids(&tx, &overlay).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&Account::new_contract(RegId::new(2, 0)).key_hash));
    }

    #[test]
    fn test_unknown_sender_fails() {
        let mut ledger = ledger();
        let overlay = StateOverlay::new(&mut ledger);
        let tx: ContractTx = DeployContractTx {
            version: 1,
            sender: UserId::RegId(RegId::new(9, 9)),
            contract: ContractPayload::default(),
            fee: 1,
            valid_height: 1,
            signature: vec![],
        }
        .into();

        assert_eq!(
            involved_key_ids(&tx, &overlay),
            Err(IdentityError::EmptyIdentity)
        );
    }
}
