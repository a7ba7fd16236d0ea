//! # Driving Ports (API - Inbound)
//!
//! The interface the block-application layer drives.

use crate::config::ProtocolContext;
use crate::domain::entities::{ContractTx, ExecutionResult};
use crate::domain::value_objects::{BlockHeight, KeyHash, TxIndex};
use crate::errors::{ExecutionFailure, IdentityError, ValidationRejection};
use crate::ports::outbound::LedgerView;
use std::collections::BTreeSet;

/// Primary API for contract transactions.
///
/// ## Usage
///
/// ```ignore
/// let ctx = config.protocol.context_at(height);
/// engine.check_tx(&tx, &ctx, &overlay)?;
/// let result = engine.execute_tx(&tx, height, index, &mut overlay)?;
/// ```
pub trait ContractTxApi {
    /// Read-only admission check. Repeated calls on unchanged state agree.
    ///
    /// # Errors
    ///
    /// The first failed check, as a [`ValidationRejection`].
    fn check_tx<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        protocol: &ProtocolContext,
        view: &V,
    ) -> Result<(), ValidationRejection>;

    /// Apply an admitted transaction to the overlay.
    ///
    /// On error the overlay may hold partial writes and must be discarded by
    /// the caller.
    ///
    /// # Errors
    ///
    /// Any [`ExecutionFailure`].
    fn execute_tx<V: LedgerView>(
        &mut self,
        tx: &ContractTx,
        height: BlockHeight,
        index: TxIndex,
        view: &mut V,
    ) -> Result<ExecutionResult, ExecutionFailure>;

    /// Key hashes a transaction involves, without running the VM.
    ///
    /// # Errors
    ///
    /// If any primary identity fails to resolve.
    fn involved_key_ids<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        view: &V,
    ) -> Result<BTreeSet<KeyHash>, IdentityError>;
}
