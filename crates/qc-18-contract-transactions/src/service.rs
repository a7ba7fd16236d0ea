//! # Contract Transaction Engine
//!
//! Wires the validation and execution stages to their driven ports and
//! implements [`ContractTxApi`].
//!
//! ## Ownership
//!
//! The engine owns its fuel-rate provider, signature verifier and VM. It
//! never owns ledger state: every call borrows the caller's overlay.

use crate::config::{ConfigError, EngineConfig, ProtocolContext};
use crate::domain::entities::{ContractTx, ExecutionResult};
use crate::domain::value_objects::{BlockHeight, KeyHash, TxIndex};
use crate::errors::{ExecutionFailure, IdentityError, ValidationRejection};
use crate::execution::{execute_deploy, execute_invoke, ExecutionContext};
use crate::involvement;
use crate::ports::inbound::ContractTxApi;
use crate::ports::outbound::{FuelRateProvider, LedgerView, SignatureVerifier, VmAdapter};
use crate::validation::Admission;
use std::collections::BTreeSet;
use tracing::{debug, error, info, instrument, warn};

/// Execution statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Successful executions.
    pub executed: u64,
    /// Failed executions.
    pub failed: u64,
    /// Contracts deployed.
    pub deployed: u64,
    /// Total steps (deploy size plus VM steps).
    pub total_run_steps: u64,
    /// Total fuel charged.
    pub total_fuel: u64,
}

/// The contract transaction engine.
pub struct ContractTxEngine<F: FuelRateProvider, S: SignatureVerifier, M: VmAdapter> {
    config: EngineConfig,
    fuel_rates: F,
    verifier: S,
    vm: M,
    stats: EngineStats,
}

impl<F: FuelRateProvider, S: SignatureVerifier, M: VmAdapter> ContractTxEngine<F, S, M> {
    /// Creates an engine after validating `config`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, fuel_rates: F, verifier: S, vm: M) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            fuel_rates,
            verifier,
            vm,
            stats: EngineStats::default(),
        })
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Statistics so far.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Protocol context in force at `height`.
    #[must_use]
    pub fn protocol_at(&self, height: BlockHeight) -> ProtocolContext {
        self.config.protocol.context_at(height)
    }

    /// Fuel rate in force at `height`.
    #[must_use]
    pub fn fuel_rate(&self, height: BlockHeight) -> u64 {
        self.fuel_rates.fuel_rate(height)
    }

    /// The VM, for inspection by embedding code.
    pub fn vm(&self) -> &M {
        &self.vm
    }

    fn record(&mut self, result: &Result<ExecutionResult, ExecutionFailure>) {
        match result {
            Ok(r) => {
                self.stats.executed += 1;
                if r.contract_reg_id.is_some() {
                    self.stats.deployed += 1;
                }
                self.stats.total_run_steps = self.stats.total_run_steps.saturating_add(r.run_steps);
                self.stats.total_fuel = self.stats.total_fuel.saturating_add(r.fuel_consumed);
            }
            Err(_) => self.stats.failed += 1,
        }
    }
}

impl<F: FuelRateProvider, S: SignatureVerifier, M: VmAdapter> ContractTxApi
    for ContractTxEngine<F, S, M>
{
    #[instrument(skip_all, fields(tx = %tx.hash(), height = protocol.height))]
    fn check_tx<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        protocol: &ProtocolContext,
        view: &V,
    ) -> Result<(), ValidationRejection> {
        let admission = Admission {
            config: &self.config,
            protocol,
            fuel_rate: self.fuel_rates.fuel_rate(protocol.height),
            verifier: &self.verifier,
        };
        admission.check(tx, view).inspect_err(|e| {
            debug!(code = e.code(), reason = %e, "contract tx rejected");
        })
    }

    #[instrument(skip_all, fields(tx = %tx.hash(), height = height, index = index))]
    fn execute_tx<V: LedgerView>(
        &mut self,
        tx: &ContractTx,
        height: BlockHeight,
        index: TxIndex,
        view: &mut V,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        let ctx = ExecutionContext {
            config: &self.config,
            height,
            index,
            fuel_rate: self.fuel_rates.fuel_rate(height),
            tx_hash: tx.hash(),
        };
        let result = match tx {
            ContractTx::Deploy(deploy) => execute_deploy(deploy, &ctx, view),
            ContractTx::Invoke(invoke) => execute_invoke(invoke, &ctx, &mut self.vm, view),
        };

        match &result {
            Ok(r) => info!(
                tx_type = tx.tx_type(),
                run_steps = r.run_steps,
                fuel = r.fuel_consumed,
                "contract tx executed"
            ),
            Err(e) if e.is_fatal() => error!(error = %e, "overlay write failed"),
            Err(e) => warn!(error = %e, "contract tx failed"),
        }
        self.record(&result);
        result
    }

    fn involved_key_ids<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        view: &V,
    ) -> Result<BTreeSet<KeyHash>, IdentityError> {
        involvement::involved_key_ids(tx, view)
    }
}
