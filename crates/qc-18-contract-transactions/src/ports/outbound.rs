//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the contract transaction subsystem depends on:
//! - Account and contract state (through the block overlay)
//! - The persistent ledger behind the overlay
//! - Fuel rate, signature verification and the contract VM
//!
//! ## Ownership
//!
//! The block-application layer owns the overlay for one block and lends it
//! to this subsystem by reference. This subsystem never writes the
//! persistent ledger directly.

use crate::domain::entities::{Account, Contract, InvokeContractTx};
use crate::domain::identity::UserId;
use crate::domain::value_objects::{BlockHeight, KeyHash, PublicKey, RegId, TxHash, TxLocation};
use crate::errors::StoreError;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ACCOUNT STORE
// =============================================================================

/// Account state access.
///
/// Reads must observe this transaction's own earlier writes.
pub trait AccountStore {
    /// Get an account by any identity form.
    ///
    /// Returns `None` if the identity does not map to an existing account.
    fn get_account(&self, id: &UserId) -> Result<Option<Account>, StoreError>;

    /// Write an account under an identity (update form).
    ///
    /// Creates the record if the key hash has never been seen. The identity
    /// must resolve to `account.key_hash`.
    fn set_account(&mut self, id: &UserId, account: &Account) -> Result<(), StoreError>;

    /// Write an account and bind its registration id (creation form).
    fn save_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Registration id bound to an identity, if any.
    fn get_reg_id(&self, id: &UserId) -> Result<Option<RegId>, StoreError>;

    /// Key hash an identity maps to, if any.
    fn get_key_hash(&self, id: &UserId) -> Result<Option<KeyHash>, StoreError>;
}

// =============================================================================
// CONTRACT STORE
// =============================================================================

/// Contract code and transaction relevance indexes.
pub trait ContractStore {
    /// Get a deployed contract.
    fn get_contract(&self, id: &RegId) -> Result<Option<Contract>, StoreError>;

    /// Store a contract. Fails if one already exists at `id`.
    fn save_contract(&mut self, id: &RegId, contract: &Contract) -> Result<(), StoreError>;

    /// Write the involvement entry for a transaction. Write-once.
    fn set_involved_addresses(
        &mut self,
        tx_hash: &TxHash,
        key_hashes: &BTreeSet<KeyHash>,
    ) -> Result<(), StoreError>;

    /// Read the involvement entry for a transaction.
    fn get_involved_addresses(&self, tx_hash: &TxHash)
        -> Result<Option<BTreeSet<KeyHash>>, StoreError>;

    /// Append a transaction to an account's history.
    fn add_address_tx(&mut self, key_hash: &KeyHash, location: TxLocation)
        -> Result<(), StoreError>;

    /// An account's transaction history, oldest first.
    fn get_address_txs(&self, key_hash: &KeyHash) -> Result<Vec<TxLocation>, StoreError>;
}

/// Everything a contract transaction reads and writes.
pub trait LedgerView: AccountStore + ContractStore {}

impl<T: AccountStore + ContractStore + ?Sized> LedgerView for T {}

// =============================================================================
// PERSISTENT LEDGER
// =============================================================================

/// Buffered writes of one overlay, applied to its parent on commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Accounts by key hash.
    pub accounts: BTreeMap<KeyHash, Account>,
    /// Registration id index.
    pub reg_ids: BTreeMap<RegId, KeyHash>,
    /// Newly deployed contracts.
    pub contracts: BTreeMap<RegId, Contract>,
    /// Involvement entries.
    pub involved: BTreeMap<TxHash, BTreeSet<KeyHash>>,
    /// History entries to append, per account.
    pub address_txs: BTreeMap<KeyHash, Vec<TxLocation>>,
}

impl ChangeSet {
    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.reg_ids.is_empty()
            && self.contracts.is_empty()
            && self.involved.is_empty()
            && self.address_txs.is_empty()
    }
}

/// Read side of a ledger layer, keyed by canonical identifiers only.
pub trait LedgerReader {
    /// Account by key hash.
    fn account(&self, key_hash: &KeyHash) -> Result<Option<Account>, StoreError>;

    /// Key hash bound to a registration id.
    fn key_hash_of(&self, reg_id: &RegId) -> Result<Option<KeyHash>, StoreError>;

    /// Contract by registration id.
    fn contract(&self, reg_id: &RegId) -> Result<Option<Contract>, StoreError>;

    /// Involvement entry by transaction hash.
    fn involved(&self, tx_hash: &TxHash) -> Result<Option<BTreeSet<KeyHash>>, StoreError>;

    /// Transaction history of an account.
    fn address_txs(&self, key_hash: &KeyHash) -> Result<Vec<TxLocation>, StoreError>;
}

/// A ledger layer that accepts a committed [`ChangeSet`].
pub trait LedgerBackend: LedgerReader {
    /// Apply a change set atomically.
    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError>;
}

// =============================================================================
// FUEL RATE
// =============================================================================

/// Block-scoped fuel price.
pub trait FuelRateProvider {
    /// Fuel rate in force at `height`.
    fn fuel_rate(&self, height: BlockHeight) -> u64;
}

// =============================================================================
// SIGNATURE VERIFIER
// =============================================================================

/// Signature primitive.
pub trait SignatureVerifier {
    /// Returns true if `pk` is a well-formed point on the curve.
    fn is_valid_public_key(&self, pk: &PublicKey) -> bool;

    /// Verify `signature` by `pk` over `payload`.
    fn verify(&self, pk: &PublicKey, payload: &[u8], signature: &[u8]) -> bool;
}

// =============================================================================
// CONTRACT VM
// =============================================================================

/// Everything the VM gets for one invocation.
#[derive(Debug)]
pub struct VmRequest<'a> {
    /// The invoking transaction.
    pub tx: &'a InvokeContractTx,
    /// Its hash.
    pub tx_hash: TxHash,
    /// Block height.
    pub height: BlockHeight,
    /// Registration id of the invoked contract.
    pub contract_id: RegId,
    /// Contract being run.
    pub contract: &'a Contract,
    /// Block fuel rate.
    pub fuel_rate: u64,
    /// Steps the VM may consume before failing.
    pub step_budget: u64,
}

/// What the VM reports back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmOutcome {
    /// Whether the script completed.
    pub success: bool,
    /// Steps consumed.
    pub steps_consumed: u64,
    /// Failure text when `success` is false.
    pub error: Option<String>,
    /// Accounts whose state the script changed.
    pub mutated_accounts: Vec<Account>,
    /// Raw identifiers of contract-level sub-accounts the script touched.
    pub touched_sub_accounts: Vec<Vec<u8>>,
}

impl VmOutcome {
    /// A failed run.
    #[must_use]
    pub fn failed(steps_consumed: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            steps_consumed,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Contract virtual machine. Not reentrant; invoked one transaction at a time.
///
/// Exceeding `step_budget` must surface as a failed outcome, never a hang.
pub trait VmAdapter {
    /// Run the contract against the overlay.
    fn execute(&mut self, request: &VmRequest<'_>, view: &mut dyn LedgerView) -> VmOutcome;
}
