//! # Execution Stage
//!
//! Applies an admitted contract transaction to the block overlay.
//!
//! No step here rolls anything back. A failure may leave earlier writes of
//! the same transaction in the overlay; the block-application layer discards
//! the overlay (or the per-transaction child overlay) on any failure.

use crate::config::EngineConfig;
use crate::domain::entities::{
    Account, BalanceOp, DeployContractTx, ExecutionResult, InvokeContractTx,
};
use crate::domain::fuel::{deploy_tx_fuel, invoke_fuel_consumed, invoke_step_budget};
use crate::domain::identity::{resolve_user_id_bytes, UserId};
use crate::domain::value_objects::{BlockHeight, KeyHash, RegId, TxHash, TxIndex, TxLocation};
use crate::errors::{ExecutionFailure, IdentityError};
use crate::ports::outbound::{LedgerView, VmAdapter, VmRequest};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::debug;

/// Where and at what price a transaction executes.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext<'a> {
    /// Engine limits.
    pub config: &'a EngineConfig,
    /// Block height.
    pub height: BlockHeight,
    /// Position in the block.
    pub index: TxIndex,
    /// Block fuel rate.
    pub fuel_rate: u64,
    /// Hash of the executing transaction.
    pub tx_hash: TxHash,
}

impl ExecutionContext<'_> {
    /// Registration id minted by the transaction at this position.
    #[must_use]
    pub fn minted_reg_id(&self) -> RegId {
        RegId::new(self.height, self.index)
    }

    fn location(&self) -> TxLocation {
        TxLocation {
            height: self.height,
            index: self.index,
            tx_hash: self.tx_hash,
        }
    }
}

// =============================================================================
// DEPLOY
// =============================================================================

/// Deploys a contract.
///
/// The sender pays `fee`; nothing moves to the contract account.
///
/// # Errors
///
/// `AccountNotFound`, `InsufficientFunds`, or `StorageFailure` when the
/// contract account or record cannot be written.
pub fn execute_deploy<V: LedgerView + ?Sized>(
    tx: &DeployContractTx,
    ctx: &ExecutionContext<'_>,
    view: &mut V,
) -> Result<ExecutionResult, ExecutionFailure> {
    let symbol = ctx.config.fee_symbol.as_str();

    let mut sender = load_account(&tx.sender, &*view)?;
    sender
        .operate_balance(symbol, BalanceOp::SubFree, tx.fee)
        .map_err(|e| ExecutionFailure::from_balance(tx.sender.to_string(), e))?;
    view.set_account(&tx.sender, &sender)?;

    let contract_id = ctx.minted_reg_id();
    let contract_account = Account::new_contract(contract_id);
    view.save_account(&contract_account)?;
    view.save_contract(&contract_id, &tx.contract.to_contract())?;

    let involved: BTreeSet<KeyHash> = [sender.key_hash].into_iter().collect();
    view.set_involved_addresses(&ctx.tx_hash, &involved)?;
    view.add_address_tx(&sender.key_hash, ctx.location())?;

    debug!(
        contract = %contract_id,
        size = tx.contract.contract_size(),
        "contract deployed"
    );

    Ok(ExecutionResult {
        tx_hash: ctx.tx_hash,
        run_steps: u64::try_from(tx.contract.contract_size()).unwrap_or(u64::MAX),
        fuel_consumed: deploy_tx_fuel(tx, ctx.fuel_rate),
        contract_reg_id: Some(contract_id),
        mutated_accounts: vec![sender.key_hash, contract_account.key_hash],
        involved_key_hashes: involved,
    })
}

// =============================================================================
// INVOKE
// =============================================================================

/// Invokes a contract.
///
/// Moves `amount` from sender to the contract account, charges `fee`, runs
/// the VM and reconciles what it reports.
///
/// # Errors
///
/// Any [`ExecutionFailure`]; `ScriptError` carries the VM's text.
pub fn execute_invoke<V: LedgerView, M: VmAdapter + ?Sized>(
    tx: &InvokeContractTx,
    ctx: &ExecutionContext<'_>,
    vm: &mut M,
    view: &mut V,
) -> Result<ExecutionResult, ExecutionFailure> {
    let symbol = ctx.config.fee_symbol.as_str();

    // 1. Sender. A pubkey sender binds its key and gets a regid on first use.
    let mut sender = load_account(&tx.sender, &*view)?;
    let mut register = false;
    if let UserId::PubKey(pk) = &tx.sender {
        if view.get_reg_id(&tx.sender)?.is_none() {
            sender.reg_id = Some(ctx.minted_reg_id());
            register = true;
        }
        sender.owner_pubkey = Some(pk.clone());
    }

    // 2-3. Debit fee plus transfer.
    let debit = tx
        .fee
        .checked_add(tx.amount)
        .ok_or_else(|| ExecutionFailure::AmountOverflow(tx.sender.to_string()))?;
    sender
        .operate_balance(symbol, BalanceOp::SubFree, debit)
        .map_err(|e| ExecutionFailure::from_balance(tx.sender.to_string(), e))?;
    if register {
        view.save_account(&sender)?;
    } else {
        view.set_account(&tx.sender, &sender)?;
    }

    // 4-5. Credit the contract account.
    let Some(app_id) = tx.app.as_reg_id().copied() else {
        return Err(ExecutionFailure::AccountNotFound(tx.app.to_string()));
    };
    let mut dest = load_account(&tx.app, &*view)?;
    dest.operate_balance(symbol, BalanceOp::AddFree, tx.amount)
        .map_err(|e| ExecutionFailure::from_balance(tx.app.to_string(), e))?;
    view.set_account(&tx.app, &dest)?;

    // 6. Code.
    let contract = view
        .get_contract(&app_id)?
        .ok_or(ExecutionFailure::ContractNotFound(app_id))?;

    // 7. VM.
    let step_budget = invoke_step_budget(tx.fee, ctx.fuel_rate, ctx.config);
    let request = VmRequest {
        tx,
        tx_hash: ctx.tx_hash,
        height: ctx.height,
        contract_id: app_id,
        contract: &contract,
        fuel_rate: ctx.fuel_rate,
        step_budget,
    };
    let started = Instant::now();
    let outcome = vm.execute(&request, &mut *view);
    debug!(
        contract = %app_id,
        steps = outcome.steps_consumed,
        elapsed_us = started.elapsed().as_micros(),
        "execute contract elapsed"
    );

    // 8. Failure leaves steps 2-5 in the overlay for the caller to discard.
    if !outcome.success {
        return Err(ExecutionFailure::ScriptError(
            outcome.error.unwrap_or_else(|| "unknown vm error".to_string()),
        ));
    }
    if outcome.steps_consumed > step_budget {
        return Err(ExecutionFailure::ScriptError(format!(
            "run steps {} exceed budget {step_budget}",
            outcome.steps_consumed
        )));
    }

    let mut involved: BTreeSet<KeyHash> = [sender.key_hash, dest.key_hash].into_iter().collect();
    let mut mutated = vec![sender.key_hash];
    if dest.key_hash != sender.key_hash {
        mutated.push(dest.key_hash);
    }

    // 9. Accounts the script changed.
    for account in &outcome.mutated_accounts {
        if account.key_hash.is_null() {
            return Err(ExecutionFailure::ScriptError(
                "vm returned an account with an empty key hash".to_string(),
            ));
        }
        view.set_account(&UserId::KeyHash(account.key_hash), account)?;
        involved.insert(account.key_hash);
        if !mutated.contains(&account.key_hash) {
            mutated.push(account.key_hash);
        }
    }

    // 10. Sub-accounts the script only touched.
    for raw in &outcome.touched_sub_accounts {
        match resolve_user_id_bytes(&*view, raw) {
            Ok(key) => {
                involved.insert(key);
            }
            Err(IdentityError::Store(e)) => return Err(e.into()),
            Err(e) => debug!(raw = %hex::encode(raw), error = %e, "skipping unresolvable sub-account"),
        }
    }

    // 11. Index.
    view.set_involved_addresses(&ctx.tx_hash, &involved)?;
    view.add_address_tx(&sender.key_hash, ctx.location())?;
    if dest.key_hash != sender.key_hash {
        view.add_address_tx(&dest.key_hash, ctx.location())?;
    }

    Ok(ExecutionResult {
        tx_hash: ctx.tx_hash,
        run_steps: outcome.steps_consumed,
        fuel_consumed: invoke_fuel_consumed(outcome.steps_consumed, ctx.fuel_rate, ctx.config),
        contract_reg_id: None,
        mutated_accounts: mutated,
        involved_key_hashes: involved,
    })
}

fn load_account<V: LedgerView + ?Sized>(
    id: &UserId,
    view: &V,
) -> Result<Account, ExecutionFailure> {
    view.get_account(id)?
        .ok_or_else(|| ExecutionFailure::AccountNotFound(id.to_string()))
}
