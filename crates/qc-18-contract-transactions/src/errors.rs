//! # Error Types
//!
//! All error types for contract transaction admission and execution.
//!
//! Nothing here is thrown as control flow: every failure leaves a component
//! through an explicit `Result`.

use crate::domain::value_objects::{Amount, KeyHash, RegId, TxHash};
use thiserror::Error;

// =============================================================================
// STORE ERRORS
// =============================================================================

/// Errors raised by account/contract stores and the state overlay.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The identity used for a write resolves to a different account.
    #[error("identity resolves to {resolved} but account carries {carried}")]
    IdentityMismatch {
        /// Key hash the identity resolved to.
        resolved: KeyHash,
        /// Key hash stored in the account record.
        carried: KeyHash,
    },

    /// The identity could not be mapped to any key hash.
    #[error("identity {0} has no key hash")]
    UnresolvedIdentity(String),

    /// A registration id is already bound to another account.
    #[error("registration id {reg_id} already bound to {existing}")]
    RegIdConflict {
        /// The contested registration id.
        reg_id: RegId,
        /// Account currently holding it.
        existing: KeyHash,
    },

    /// Contracts are immutable once stored.
    #[error("contract {0} already exists")]
    ContractExists(RegId),

    /// Involvement entries are write-once.
    #[error("involvement entry for {0} already written")]
    InvolvementExists(TxHash),

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

// =============================================================================
// IDENTITY ERRORS
// =============================================================================

/// Errors from resolving an external identifier to a key hash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Identifier is neither a packed registration id nor an address.
    #[error("invalid identifier format: {len} bytes")]
    InvalidFormat {
        /// Length of the rejected identifier.
        len: usize,
    },

    /// Identifier resolved to the null key hash.
    #[error("identifier resolves to an empty key hash")]
    EmptyIdentity,

    /// Address text failed to decode.
    #[error("malformed address: {0}")]
    BadAddress(String),

    /// Lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// BALANCE ERRORS
// =============================================================================

/// Errors from the balance mutation primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// Debit would leave a negative balance.
    #[error("insufficient {symbol}: required {required}, available {available}")]
    Insufficient {
        /// Token symbol.
        symbol: String,
        /// Amount requested.
        required: Amount,
        /// Amount held.
        available: Amount,
    },

    /// Credit would overflow.
    #[error("{symbol} balance overflow")]
    Overflow {
        /// Token symbol.
        symbol: String,
    },
}

// =============================================================================
// VALIDATION REJECTIONS
// =============================================================================

/// Why an untrusted transaction was refused admission.
///
/// Raised before any state effect and never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationRejection {
    /// Valid height too far from the checking height.
    #[error("valid height {valid_height} outside window of {window} around {height}")]
    HeightOutOfWindow {
        /// Height declared by the transaction.
        valid_height: u64,
        /// Height being checked.
        height: u64,
        /// Permitted distance.
        window: u64,
    },

    /// Fee outside configured bounds.
    #[error("fee {fee} outside [{min}, {max}]")]
    FeeOutOfRange {
        /// Declared fee.
        fee: Amount,
        /// Lower bound.
        min: Amount,
        /// Upper bound.
        max: Amount,
    },

    /// Sender identity has a form not accepted for this transaction type.
    #[error("sender identity form not accepted: {0}")]
    BadIdentityForm(String),

    /// Invoke target is not a registration id.
    #[error("target identity must be a registration id, got {0}")]
    BadTargetForm(String),

    /// Invoke arguments too large.
    #[error("arguments too large: {size} > {max} bytes")]
    ArgumentsTooLarge {
        /// Payload size.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Deploy payload is empty or exceeds size limits.
    #[error("invalid contract payload: {0}")]
    InvalidContractPayload(String),

    /// Fee cannot cover fuel.
    #[error("fee too low to afford fuel (actual: {fee} vs need: {fuel})")]
    FeeTooLowForFuel {
        /// Declared fee.
        fee: Amount,
        /// Fuel cost.
        fuel: Amount,
    },

    /// Fee left after fuel is below the relay floor.
    #[error("fee per KB {fee_per_kb} below relay floor {min}")]
    FeeBelowRelayFloor {
        /// Computed fee per KB.
        fee_per_kb: u64,
        /// Configured floor.
        min: u64,
    },

    /// Sender account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Sender account has no registered owner key.
    #[error("account unregistered: {0}")]
    AccountUnregistered(String),

    /// Target contract does not exist.
    #[error("contract not found: {0}")]
    ContractNotFound(String),

    /// Signature does not verify.
    #[error("bad signature")]
    BadSignature,

    /// Transaction hash already has an involvement entry.
    #[error("duplicate transaction {0}")]
    DuplicateTx(TxHash),

    /// Store read failed while checking.
    #[error("state read failed: {0}")]
    Storage(#[from] StoreError),
}

impl ValidationRejection {
    /// Short machine-readable reject code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::HeightOutOfWindow { .. } => "height-out-of-window",
            Self::FeeOutOfRange { .. } => "fee-out-of-range",
            Self::BadIdentityForm(_) => "bad-identity-form",
            Self::BadTargetForm(_) => "bad-target-form",
            Self::ArgumentsTooLarge { .. } => "arguments-too-large",
            Self::InvalidContractPayload(_) => "invalid-contract-payload",
            Self::FeeTooLowForFuel { .. } => "fee-too-low-for-fuel",
            Self::FeeBelowRelayFloor { .. } => "fee-below-relay-floor",
            Self::AccountNotFound(_) => "account-not-found",
            Self::AccountUnregistered(_) => "account-unregistered",
            Self::ContractNotFound(_) => "contract-not-found",
            Self::BadSignature => "bad-signature",
            Self::DuplicateTx(_) => "duplicate-tx",
            Self::Storage(_) => "storage-read-failed",
        }
    }

    /// Returns true if the state could not be read.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

// =============================================================================
// EXECUTION FAILURES
// =============================================================================

/// Why executing an admitted transaction failed.
///
/// May follow partial overlay mutation, so the block-application layer must
/// discard the overlay (or exclude the transaction from a candidate block).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionFailure {
    /// An account the transaction touches does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Debit exceeds the spendable balance.
    #[error("insufficient funds in {account}: {source}")]
    InsufficientFunds {
        /// Debited account.
        account: String,
        /// Balance primitive error.
        source: BalanceError,
    },

    /// Amount arithmetic overflowed.
    #[error("amount overflow in {0}")]
    AmountOverflow(String),

    /// Contract code missing.
    #[error("contract not found: {0}")]
    ContractNotFound(RegId),

    /// VM reported failure.
    #[error("run script error: {0}")]
    ScriptError(String),

    /// Overlay write failed. Block application must abort.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),
}

impl ExecutionFailure {
    /// Returns true if the overlay can no longer be trusted.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }

    /// Maps a balance primitive error for the given account.
    #[must_use]
    pub fn from_balance(account: impl Into<String>, err: BalanceError) -> Self {
        match err {
            BalanceError::Overflow { .. } => Self::AmountOverflow(account.into()),
            insufficient @ BalanceError::Insufficient { .. } => Self::InsufficientFunds {
                account: account.into(),
                source: insufficient,
            },
        }
    }
}
