//! # Fee / Fuel Model
//!
//! Pure functions of transaction content and the block fuel rate. Admission
//! and execution both call into here, so a fee admitted by the fuel check is
//! charged by exactly the same arithmetic later on.
//!
//! | Kind | Fuel |
//! |------|------|
//! | Deploy | `code_len * fuel_rate` |
//! | Invoke | `invoke_base_fuel * fuel_rate` |
//!
//! Products saturate at `u64::MAX`, which no fee can cover.

use crate::config::EngineConfig;
use crate::domain::entities::{ContractTx, DeployContractTx};
use crate::domain::value_objects::Amount;

/// Fuel charged for deploying `contract_size` bytes.
#[must_use]
pub fn deploy_fuel(contract_size: usize, fuel_rate: u64) -> Amount {
    u64::try_from(contract_size)
        .unwrap_or(u64::MAX)
        .saturating_mul(fuel_rate)
}

/// Fixed fuel charged for any invocation.
#[must_use]
pub fn invoke_fuel(invoke_base_fuel: u64, fuel_rate: u64) -> Amount {
    invoke_base_fuel.saturating_mul(fuel_rate)
}

/// Fuel required by a transaction at the given rate.
#[must_use]
pub fn required_fuel(tx: &ContractTx, fuel_rate: u64, config: &EngineConfig) -> Amount {
    match tx {
        ContractTx::Deploy(deploy) => deploy_tx_fuel(deploy, fuel_rate),
        ContractTx::Invoke(_) => invoke_fuel(config.invoke_base_fuel, fuel_rate),
    }
}

/// Fuel required by a deploy.
#[must_use]
pub fn deploy_tx_fuel(tx: &DeployContractTx, fuel_rate: u64) -> Amount {
    deploy_fuel(tx.contract.contract_size(), fuel_rate)
}

/// Fee left after fuel per 1000 serialized bytes.
///
/// Integer form of `(fee - fuel) / (size / 1000)`.
#[must_use]
pub fn fee_per_kb(fee: Amount, fuel: Amount, serialized_size: usize) -> u64 {
    let spare = u128::from(fee.saturating_sub(fuel));
    let size = u128::try_from(serialized_size.max(1)).unwrap_or(u128::MAX);
    u64::try_from(spare * 1000 / size).unwrap_or(u64::MAX)
}

/// VM step budget for an invoke paying `fee`.
///
/// Whatever the fee leaves after the fixed invoke fuel buys steps at
/// `fuel_rate`, capped by `max_run_steps`. A zero rate means steps are free
/// and only the cap applies.
#[must_use]
pub fn invoke_step_budget(fee: Amount, fuel_rate: u64, config: &EngineConfig) -> u64 {
    if fuel_rate == 0 {
        return config.max_run_steps;
    }
    let spare = fee.saturating_sub(invoke_fuel(config.invoke_base_fuel, fuel_rate));
    (spare / fuel_rate).min(config.max_run_steps)
}

/// Fuel reported for an invoke that ran `steps` VM steps.
#[must_use]
pub fn invoke_fuel_consumed(steps: u64, fuel_rate: u64, config: &EngineConfig) -> u64 {
    invoke_fuel(config.invoke_base_fuel, fuel_rate).saturating_add(steps.saturating_mul(fuel_rate))
}
