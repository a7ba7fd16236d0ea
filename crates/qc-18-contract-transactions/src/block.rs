//! # Block Application
//!
//! Runs a block's contract transactions in order against one block overlay
//! and decides commit or discard.
//!
//! | Mode | On a rejected or failed transaction |
//! |------|------------------------------------|
//! | `Connect` | discard the whole block overlay and return the error |
//! | `Candidate` | discard only that transaction's child overlay and exclude it |
//!
//! A state read or write failure aborts in both modes.

use crate::adapters::StateOverlay;
use crate::domain::entities::{ContractTx, ExecutionResult};
use crate::domain::value_objects::{BlockHeight, TxHash, TxIndex};
use crate::errors::{ExecutionFailure, StoreError, ValidationRejection};
use crate::ports::inbound::ContractTxApi;
use crate::ports::outbound::{FuelRateProvider, LedgerBackend, SignatureVerifier, VmAdapter};
use crate::service::ContractTxEngine;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// How failures inside a block are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockMode {
    /// Connecting a received block: all or nothing.
    Connect,
    /// Assembling a candidate block: drop what fails.
    Candidate,
}

/// A transaction left out of a candidate block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExcludedTx {
    /// Position in the input list.
    pub position: usize,
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Reject code or failure text.
    pub reason: String,
}

/// Outcome of applying a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockReceipt {
    /// Block height.
    pub height: BlockHeight,
    /// Results of included transactions, in block order.
    pub results: Vec<ExecutionResult>,
    /// Transactions excluded (candidate mode only).
    pub excluded: Vec<ExcludedTx>,
}

impl BlockReceipt {
    /// Fuel charged across included transactions.
    #[must_use]
    pub fn total_fuel(&self) -> u64 {
        self.results
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.fuel_consumed))
    }
}

/// Block application errors. Nothing was committed when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockApplyError {
    /// A transaction failed admission.
    #[error("tx {index} rejected: {source}")]
    Rejected {
        /// Block position.
        index: TxIndex,
        /// Rejection.
        source: ValidationRejection,
    },

    /// A transaction failed execution.
    #[error("tx {index} failed: {source}")]
    Failed {
        /// Block position.
        index: TxIndex,
        /// Failure.
        source: ExecutionFailure,
    },

    /// More transactions than a block position can address.
    #[error("block has {0} transactions, more than a tx index can address")]
    TooManyTransactions(usize),

    /// Committing the block overlay failed.
    #[error("commit failed: {0}")]
    Commit(#[from] StoreError),
}

impl<F: FuelRateProvider, S: SignatureVerifier, M: VmAdapter> ContractTxEngine<F, S, M> {
    /// Applies `txs` at `height` and commits to `backend` on success.
    ///
    /// # Errors
    ///
    /// See [`BlockApplyError`]. `backend` is untouched when an error is
    /// returned.
    #[instrument(skip(self, backend, txs), fields(count = txs.len()))]
    pub fn apply_block<B: LedgerBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        height: BlockHeight,
        txs: &[ContractTx],
        mode: BlockMode,
    ) -> Result<BlockReceipt, BlockApplyError> {
        if txs.len() > usize::from(TxIndex::MAX) + 1 {
            return Err(BlockApplyError::TooManyTransactions(txs.len()));
        }

        let protocol = self.protocol_at(height);
        let mut block = StateOverlay::new(backend);
        let mut receipt = BlockReceipt {
            height,
            ..BlockReceipt::default()
        };

        for (position, tx) in txs.iter().enumerate() {
            // Bounded by the length check above.
            let index = TxIndex::try_from(receipt.results.len()).unwrap_or(TxIndex::MAX);

            match mode {
                BlockMode::Connect => {
                    self.check_tx(tx, &protocol, &block)
                        .map_err(|source| BlockApplyError::Rejected { index, source })?;
                    let result = self
                        .execute_tx(tx, height, index, &mut block)
                        .map_err(|source| BlockApplyError::Failed { index, source })?;
                    receipt.results.push(result);
                }
                BlockMode::Candidate => {
                    if let Err(e) = self.check_tx(tx, &protocol, &block) {
                        if e.is_fatal() {
                            return Err(BlockApplyError::Rejected { index, source: e });
                        }
                        receipt.excluded.push(ExcludedTx {
                            position,
                            tx_hash: tx.hash(),
                            reason: e.code().to_string(),
                        });
                        continue;
                    }

                    let mut child = StateOverlay::new(&mut block);
                    match self.execute_tx(tx, height, index, &mut child) {
                        Ok(result) => {
                            child.commit()?;
                            receipt.results.push(result);
                        }
                        Err(source) if source.is_fatal() => {
                            return Err(BlockApplyError::Failed { index, source });
                        }
                        Err(e) => {
                            child.discard();
                            debug!(position, error = %e, "excluding tx from candidate block");
                            receipt.excluded.push(ExcludedTx {
                                position,
                                tx_hash: tx.hash(),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        block.commit()?;
        info!(
            included = receipt.results.len(),
            excluded = receipt.excluded.len(),
            fuel = receipt.total_fuel(),
            "block applied"
        );
        Ok(receipt)
    }
}
