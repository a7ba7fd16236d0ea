//! # Core Domain Entities
//!
//! Accounts, contracts, the two contract transaction kinds and the transient
//! per-transaction execution result.

use crate::domain::identity::UserId;
use crate::domain::services::{contract_key_hash, payload_hash, PayloadWriter};
use crate::domain::value_objects::{Amount, KeyHash, PublicKey, RegId, TxHash};
use crate::errors::BalanceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ACCOUNT
// =============================================================================

/// Holdings of one token symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Spendable portion.
    pub free: Amount,
    /// Frozen portion, not debit-eligible.
    pub frozen: Amount,
}

/// Balance mutation kinds accepted by [`Account::operate_balance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceOp {
    /// Credit the spendable balance.
    AddFree,
    /// Debit the spendable balance.
    SubFree,
}

/// Ledger account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Canonical identifier.
    pub key_hash: KeyHash,
    /// Registration id, once registered.
    pub reg_id: Option<RegId>,
    /// Optional nickname.
    pub nickname: Option<String>,
    /// Owner key. Contract accounts never have one.
    pub owner_pubkey: Option<PublicKey>,
    /// Per-symbol holdings.
    pub balances: BTreeMap<String, TokenBalance>,
}

impl Account {
    /// Creates an empty account for a key hash.
    #[must_use]
    pub fn new(key_hash: KeyHash) -> Self {
        Self {
            key_hash,
            ..Self::default()
        }
    }

    /// Creates the account backing a contract deployed at `reg_id`.
    #[must_use]
    pub fn new_contract(reg_id: RegId) -> Self {
        Self {
            key_hash: contract_key_hash(&reg_id),
            reg_id: Some(reg_id),
            ..Self::default()
        }
    }

    /// Returns true if an owner public key is registered.
    #[must_use]
    pub fn has_owner_pubkey(&self) -> bool {
        self.owner_pubkey.is_some()
    }

    /// Spendable balance of `symbol`.
    #[must_use]
    pub fn free_balance(&self, symbol: &str) -> Amount {
        self.balances.get(symbol).map_or(0, |b| b.free)
    }

    /// Preferred identity for diagnostics: registration id, else key hash.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self.reg_id {
            Some(reg_id) => UserId::RegId(reg_id),
            None => UserId::KeyHash(self.key_hash),
        }
    }

    /// The only balance mutation primitive.
    ///
    /// All arithmetic is checked: a result below zero or above `u64::MAX` is
    /// refused and the account is left untouched.
    ///
    /// # Errors
    ///
    /// [`BalanceError::Insufficient`] or [`BalanceError::Overflow`].
    pub fn operate_balance(
        &mut self,
        symbol: &str,
        op: BalanceOp,
        amount: Amount,
    ) -> Result<(), BalanceError> {
        let current = self.balances.get(symbol).copied().unwrap_or_default();
        let insufficient = |available: Amount| BalanceError::Insufficient {
            symbol: symbol.to_string(),
            required: amount,
            available,
        };
        let overflow = || BalanceError::Overflow {
            symbol: symbol.to_string(),
        };

        let updated = match op {
            BalanceOp::AddFree => TokenBalance {
                free: current.free.checked_add(amount).ok_or_else(overflow)?,
                ..current
            },
            BalanceOp::SubFree => TokenBalance {
                free: current
                    .free
                    .checked_sub(amount)
                    .ok_or_else(|| insufficient(current.free))?,
                ..current
            },
        };

        self.balances.insert(symbol.to_string(), updated);
        Ok(())
    }
}

// =============================================================================
// CONTRACT
// =============================================================================

/// Virtual machine a contract targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmKind {
    /// Lua script VM.
    #[default]
    Lua,
    /// WebAssembly VM.
    Wasm,
}

impl VmKind {
    fn tag(self) -> u8 {
        match self {
            Self::Lua => 1,
            Self::Wasm => 2,
        }
    }
}

/// Stored contract. Immutable once deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Target VM.
    pub vm_kind: VmKind,
    /// Contract code.
    pub code: Vec<u8>,
    /// Display name.
    pub name: String,
    /// Free-form memo.
    pub memo: String,
}

/// Contract payload carried by a deploy transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPayload {
    /// Target VM.
    pub vm_kind: VmKind,
    /// Contract code.
    pub code: Vec<u8>,
    /// Free-form memo.
    pub memo: String,
}

impl ContractPayload {
    /// Code size, which is also the deploy step count.
    #[must_use]
    pub fn contract_size(&self) -> usize {
        self.code.len()
    }

    /// Builds the stored record.
    #[must_use]
    pub fn to_contract(&self) -> Contract {
        Contract {
            vm_kind: self.vm_kind,
            code: self.code.clone(),
            name: String::new(),
            memo: self.memo.clone(),
        }
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

const DEPLOY_TX_TAG: u8 = 0x09;
const INVOKE_TX_TAG: u8 = 0x0a;

/// Contract deployment transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployContractTx {
    /// Transaction format version.
    pub version: u32,
    /// Deployer.
    pub sender: UserId,
    /// Contract to store.
    pub contract: ContractPayload,
    /// Fee in the native symbol.
    pub fee: Amount,
    /// Height the transaction was built for.
    pub valid_height: u32,
    /// Compact ECDSA signature over [`Self::signing_payload`].
    pub signature: Vec<u8>,
}

impl DeployContractTx {
    /// Canonical bytes covered by the signature.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut w = PayloadWriter::new();
        w.put_u8(DEPLOY_TX_TAG)
            .put_u32(self.version)
            .put_u32(self.valid_height)
            .put_user_id(&self.sender)
            .put_u8(self.contract.vm_kind.tag())
            .put_bytes(&self.contract.code)
            .put_bytes(self.contract.memo.as_bytes())
            .put_u64(self.fee);
        w.finish()
    }
}

/// Contract invocation transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeContractTx {
    /// Transaction format version.
    pub version: u32,
    /// Caller.
    pub sender: UserId,
    /// Target contract.
    pub app: UserId,
    /// Fee in the native symbol.
    pub fee: Amount,
    /// Value moved from sender to the contract account.
    pub amount: Amount,
    /// Opaque call arguments.
    pub arguments: Vec<u8>,
    /// Height the transaction was built for.
    pub valid_height: u32,
    /// Compact ECDSA signature over [`Self::signing_payload`].
    pub signature: Vec<u8>,
}

impl InvokeContractTx {
    /// Canonical bytes covered by the signature.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut w = PayloadWriter::new();
        w.put_u8(INVOKE_TX_TAG)
            .put_u32(self.version)
            .put_u32(self.valid_height)
            .put_user_id(&self.sender)
            .put_user_id(&self.app)
            .put_u64(self.amount)
            .put_u64(self.fee)
            .put_bytes(&self.arguments);
        w.finish()
    }
}

/// A contract transaction of either kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractTx {
    /// Deployment.
    Deploy(DeployContractTx),
    /// Invocation.
    Invoke(InvokeContractTx),
}

impl ContractTx {
    /// Transaction type name.
    #[must_use]
    pub fn tx_type(&self) -> &'static str {
        match self {
            Self::Deploy(_) => "CONTRACT_DEPLOY_TX",
            Self::Invoke(_) => "CONTRACT_INVOKE_TX",
        }
    }

    /// Format version.
    #[must_use]
    pub fn version(&self) -> u32 {
        match self {
            Self::Deploy(tx) => tx.version,
            Self::Invoke(tx) => tx.version,
        }
    }

    /// Sender identity.
    #[must_use]
    pub fn sender(&self) -> &UserId {
        match self {
            Self::Deploy(tx) => &tx.sender,
            Self::Invoke(tx) => &tx.sender,
        }
    }

    /// Declared fee.
    #[must_use]
    pub fn fee(&self) -> Amount {
        match self {
            Self::Deploy(tx) => tx.fee,
            Self::Invoke(tx) => tx.fee,
        }
    }

    /// Declared valid height.
    #[must_use]
    pub fn valid_height(&self) -> u32 {
        match self {
            Self::Deploy(tx) => tx.valid_height,
            Self::Invoke(tx) => tx.valid_height,
        }
    }

    /// Signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        match self {
            Self::Deploy(tx) => &tx.signature,
            Self::Invoke(tx) => &tx.signature,
        }
    }

    /// Canonical bytes covered by the signature.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        match self {
            Self::Deploy(tx) => tx.signing_payload(),
            Self::Invoke(tx) => tx.signing_payload(),
        }
    }

    /// Transaction hash (signature excluded).
    #[must_use]
    pub fn hash(&self) -> TxHash {
        payload_hash(&self.signing_payload())
    }

    /// Serialized envelope size: payload plus length-prefixed signature.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        self.signing_payload().len() + 4 + self.signature().len()
    }
}

impl From<DeployContractTx> for ContractTx {
    fn from(tx: DeployContractTx) -> Self {
        Self::Deploy(tx)
    }
}

impl From<InvokeContractTx> for ContractTx {
    fn from(tx: InvokeContractTx) -> Self {
        Self::Invoke(tx)
    }
}

// =============================================================================
// EXECUTION RESULT
// =============================================================================

/// Outcome of one successful `execute_tx` call.
///
/// Exists only for the duration of that call; failures are reported through
/// [`ExecutionFailure`](crate::errors::ExecutionFailure) instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Hash of the executed transaction.
    pub tx_hash: TxHash,
    /// Steps consumed (contract size for deploys, VM steps for invokes).
    pub run_steps: u64,
    /// Fuel charged against the fee.
    pub fuel_consumed: u64,
    /// Registration id of a freshly deployed contract.
    pub contract_reg_id: Option<RegId>,
    /// Accounts written during execution.
    pub mutated_accounts: Vec<KeyHash>,
    /// Key hashes recorded in the involvement index.
    pub involved_key_hashes: BTreeSet<KeyHash>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYM: &str = "QC";

    fn funded(amount: Amount) -> Account {
        let mut acct = Account::new(KeyHash::new([1u8; 20]));
        acct.operate_balance(SYM, BalanceOp::AddFree, amount).unwrap();
        acct
    }

    #[test]
    fn test_debit_within_balance() {
        let mut acct = funded(1000);
        acct.operate_balance(SYM, BalanceOp::SubFree, 150).unwrap();
        assert_eq!(acct.free_balance(SYM), 850);
    }

    #[test]
    fn test_overdraw_leaves_account_unchanged() {
        let mut acct = funded(500);
        let before = acct.clone();
        let err = acct.operate_balance(SYM, BalanceOp::SubFree, 610).unwrap_err();
        assert!(matches!(
            err,
            BalanceError::Insufficient {
                required: 610,
                available: 500,
                ..
            }
        ));
        assert_eq!(acct, before);
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let mut acct = funded(u64::MAX);
        let before = acct.clone();
        assert!(matches!(
            acct.operate_balance(SYM, BalanceOp::AddFree, 1),
            Err(BalanceError::Overflow { .. })
        ));
        assert_eq!(acct, before);
    }

    #[test]
    fn test_frozen_funds_not_spendable() {
        let mut acct = funded(60);
        acct.balances.entry(SYM.to_string()).or_default().frozen = 40;
        assert!(acct.operate_balance(SYM, BalanceOp::SubFree, 61).is_err());
        acct.operate_balance(SYM, BalanceOp::SubFree, 60).unwrap();
        assert_eq!(acct.balances[SYM].frozen, 40);
    }

    #[test]
    fn test_contract_account_has_no_owner() {
        let acct = Account::new_contract(RegId::new(10, 2));
        assert!(!acct.has_owner_pubkey());
        assert_eq!(acct.reg_id, Some(RegId::new(10, 2)));
        assert_eq!(acct.key_hash, contract_key_hash(&RegId::new(10, 2)));
    }

    #[test]
    fn test_hash_excludes_signature() {
        let tx = InvokeContractTx {
            version: 1,
            sender: UserId::RegId(RegId::new(1, 0)),
            app: UserId::RegId(RegId::new(2, 0)),
            fee: 10,
            amount: 5,
            arguments: vec![1, 2, 3],
            valid_height: 3,
            signature: vec![],
        };
        let mut signed = tx.clone();
        signed.signature = vec![9u8; 64];
        let a = ContractTx::from(tx);
        let b = ContractTx::from(signed);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(b.serialized_size(), a.serialized_size() + 64);
    }
}
