//! # QC-18 Contract Transactions - Deploy/Invoke Admission and Execution
//!
//! **Subsystem ID:** 18
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Admits contract-deployment and contract-invocation transactions into a
//! block and applies their effects to account and contract state: fee and
//! fuel metering, balance movement, contract lifecycle, VM invocation and
//! address-relevance indexing, all against a copy-on-write block overlay.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | No negative or overflowed balance | `domain/entities.rs` - `Account::operate_balance()` |
//! | Same fuel arithmetic at admission and execution | `domain/fuel.rs` |
//! | Admission is read-only | `validation.rs` - `Admission::check()` takes `&V` |
//! | Contracts are immutable | `adapters/overlay.rs` - `save_contract()` |
//! | Involvement entries are write-once | `adapters/overlay.rs` - `set_involved_addresses()` |
//! | Block atomicity | `block.rs` - `apply_block()` |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `AccountStore` / `ContractStore` | Overlay reads and writes |
//! | `LedgerBackend` | Persistent layer under the overlay |
//! | `FuelRateProvider` | Block fuel price |
//! | `SignatureVerifier` | secp256k1 ECDSA |
//! | `VmAdapter` | Contract execution |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_18_contract_transactions::prelude::*;
//!
//! let mut engine = ContractTxEngine::new(config, FixedFuelRate(1), Secp256k1Verifier, vm)?;
//! let receipt = engine.apply_block(&mut ledger, height, &txs, BlockMode::Connect)?;
//! println!("fuel: {}", receipt.total_fuel());
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod block;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod errors;
pub mod execution;
pub mod involvement;
pub mod ports;
pub mod service;
pub mod validation;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        Account, BalanceOp, Contract, ContractPayload, ContractTx, DeployContractTx,
        ExecutionResult, InvokeContractTx, TokenBalance, VmKind,
    };

    // Value objects and identity
    pub use crate::domain::identity::{
        decode_address, encode_address, resolve_user_id_bytes, UserId,
    };
    pub use crate::domain::value_objects::{
        Amount, BlockHeight, KeyHash, PublicKey, RegId, TxHash, TxIndex, TxLocation,
    };

    // Domain services
    pub use crate::domain::fuel::{deploy_fuel, invoke_fuel, invoke_step_budget};
    pub use crate::domain::services::{contract_key_hash, keccak256, public_key_hash};

    // Ports
    pub use crate::ports::inbound::ContractTxApi;
    pub use crate::ports::outbound::{
        AccountStore, ChangeSet, ContractStore, FuelRateProvider, LedgerBackend, LedgerReader,
        LedgerView, SignatureVerifier, VmAdapter, VmOutcome, VmRequest,
    };

    // Errors
    pub use crate::errors::{
        BalanceError, ExecutionFailure, IdentityError, StoreError, ValidationRejection,
    };

    // Config
    pub use crate::config::{
        ConfigError, EngineConfig, ProtocolContext, ProtocolSchedule, ProtocolVersion,
    };

    // Adapters
    pub use crate::adapters::{
        FixedFuelRate, FuelRateSchedule, InMemoryLedger, Secp256k1Verifier, StateOverlay,
    };

    // Service
    pub use crate::block::{BlockApplyError, BlockMode, BlockReceipt, ExcludedTx};
    pub use crate::service::{ContractTxEngine, EngineStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID for IPC.
pub const SUBSYSTEM_ID: u8 = 18;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Contract Transactions";

// =============================================================================
// TESTS
// =============================================================================
