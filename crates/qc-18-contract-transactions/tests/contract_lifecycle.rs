//! # Contract Lifecycle Tests (qc-18)
//!
//! End-to-end admission and execution against an in-memory ledger, with
//! real secp256k1 signatures.
//!
//! ## Test Categories
//!
//! 1. **Scenarios** - deploy, underfunded invoke, VM-mutated accounts
//! 2. **Balance Safety** - conservation, no negative balances
//! 3. **Admission Purity** - `check_tx` never writes
//! 4. **Involvement** - index completeness, query gap
//! 5. **Block Atomicity** - connect vs candidate

mod common;

use common::*;
use qc_18_contract_transactions::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

const ALICE_ID: RegId = RegId::new(1, 0);
const BOB_ID: RegId = RegId::new(1, 1);
const APP_ID: RegId = RegId::new(2, 0);
const HEIGHT: u32 = 100;

fn setup(alice_balance: u64) -> (InMemoryLedger, Wallet) {
    init_tracing();
    let alice = Wallet::new(7, ALICE_ID);
    let mut ledger = InMemoryLedger::new();
    ledger.insert_account(alice.account(alice_balance));
    seed_contract(&mut ledger, APP_ID);
    (ledger, alice)
}

fn low_base_fuel() -> EngineConfig {
    EngineConfig {
        invoke_base_fuel: 1,
        ..EngineConfig::default()
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn test_scenario_deploy_charges_fee_only() {
    let (mut ledger, alice) = setup(1_000);
    let accounts_before = ledger.account_count();
    let mut engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let tx = alice.deploy(100, 150, HEIGHT);

    {
        let mut overlay = StateOverlay::new(&mut ledger);
        let ctx = engine.protocol_at(HEIGHT);
        engine.check_tx(&tx, &ctx, &overlay).unwrap();
        let result = engine.execute_tx(&tx, HEIGHT, 4, &mut overlay).unwrap();
        assert_eq!(result.contract_reg_id, Some(RegId::new(HEIGHT, 4)));
        assert_eq!(result.fuel_consumed, 100);
        overlay.commit().unwrap();
    }

    assert_eq!(free_balance(&ledger, &alice.key_hash), 850);
    assert_eq!(ledger.account_count(), accounts_before + 1);
    let contract_key = contract_key_hash(&RegId::new(HEIGHT, 4));
    assert_eq!(free_balance(&ledger, &contract_key), 0);
    assert!(ledger.contract(&RegId::new(HEIGHT, 4)).unwrap().is_some());
}

#[test]
fn test_scenario_underfunded_invoke_changes_nothing() {
    let (mut ledger, alice) = setup(500);
    let mut engine = engine(low_base_fuel(), 1, ScriptedVm::succeeding(0));
    let tx = alice.invoke(APP_ID, 10, 600, HEIGHT);
    let app_key = contract_key_hash(&APP_ID);

    let mut overlay = StateOverlay::new(&mut ledger);
    let ctx = engine.protocol_at(HEIGHT);
    engine.check_tx(&tx, &ctx, &overlay).unwrap();

    let err = engine.execute_tx(&tx, HEIGHT, 0, &mut overlay).unwrap_err();
    assert!(matches!(err, ExecutionFailure::InsufficientFunds { .. }));
    assert_eq!(free_balance(&overlay, &alice.key_hash), 500);
    assert_eq!(free_balance(&overlay, &app_key), 0);
    assert_eq!(engine.vm().calls, 0);
}

#[test]
fn test_scenario_vm_mutated_account_persists() {
    let (mut ledger, alice) = setup(1_000);
    let x_key = KeyHash::new([0x42; 20]);
    let mut x = Account::new(x_key);
    x.operate_balance(SYMBOL, BalanceOp::AddFree, 42).unwrap();
    let vm = ScriptedVm::returning(VmOutcome {
        success: true,
        steps_consumed: 5,
        mutated_accounts: vec![x],
        ..VmOutcome::default()
    });
    let mut engine = engine(EngineConfig::default(), 1, vm);
    let tx = alice.invoke(APP_ID, 200, 0, HEIGHT);

    let mut overlay = StateOverlay::new(&mut ledger);
    let result = engine.execute_tx(&tx, HEIGHT, 0, &mut overlay).unwrap();
    assert_eq!(result.fuel_consumed, 105);

    let stored = overlay.get_account(&UserId::KeyHash(x_key)).unwrap().unwrap();
    assert_eq!(stored.free_balance(SYMBOL), 42);
    let involved = overlay
        .get_involved_addresses(&tx.hash())
        .unwrap()
        .unwrap();
    assert!(involved.contains(&x_key));
}

// =============================================================================
// BALANCE SAFETY
// =============================================================================

#[test]
fn test_invoke_conserves_sender_and_destination() {
    let (mut ledger, alice) = setup(1_000);
    let bob = Wallet::new(9, BOB_ID);
    ledger.insert_account(bob.account(10));
    // The script pays bob out of nowhere; sender and contract are unaffected.
    let mut paid_bob = bob.account(10);
    paid_bob
        .operate_balance(SYMBOL, BalanceOp::AddFree, 77)
        .unwrap();
    let vm = ScriptedVm::returning(VmOutcome {
        success: true,
        mutated_accounts: vec![paid_bob],
        ..VmOutcome::default()
    });
    let mut engine = engine(EngineConfig::default(), 1, vm);
    let tx = alice.invoke(APP_ID, 150, 300, HEIGHT);
    let app_key = contract_key_hash(&APP_ID);

    let mut overlay = StateOverlay::new(&mut ledger);
    engine.execute_tx(&tx, HEIGHT, 0, &mut overlay).unwrap();

    assert_eq!(free_balance(&overlay, &alice.key_hash), 1_000 - 150 - 300);
    assert_eq!(free_balance(&overlay, &app_key), 300);
    assert_eq!(free_balance(&overlay, &bob.key_hash), 87);
}

#[test]
fn test_vm_observes_own_debit() {
    let (mut ledger, alice) = setup(1_000);
    let observed = Rc::new(Cell::new(None));
    let seen = Rc::clone(&observed);
    let vm = ScriptedVm::new(move |request, view| {
        let sender = view.get_account(&request.tx.sender).unwrap().unwrap();
        seen.set(Some(sender.free_balance(SYMBOL)));
        VmOutcome {
            success: true,
            ..VmOutcome::default()
        }
    });
    let mut engine = engine(EngineConfig::default(), 1, vm);
    let tx = alice.invoke(APP_ID, 200, 50, HEIGHT);

    let mut overlay = StateOverlay::new(&mut ledger);
    engine.execute_tx(&tx, HEIGHT, 0, &mut overlay).unwrap();
    assert_eq!(observed.get(), Some(750));
}

#[test]
fn test_overflowing_credit_is_rejected() {
    let (mut ledger, alice) = setup(u64::MAX);
    let app = ledger.account(&contract_key_hash(&APP_ID)).unwrap().unwrap();
    let mut rich_app = app.clone();
    rich_app
        .operate_balance(SYMBOL, BalanceOp::AddFree, u64::MAX)
        .unwrap();
    ledger.insert_account(rich_app);

    let mut engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let tx = alice.invoke(APP_ID, 200, 1, HEIGHT);
    let mut overlay = StateOverlay::new(&mut ledger);
    let err = engine.execute_tx(&tx, HEIGHT, 0, &mut overlay).unwrap_err();
    assert!(matches!(err, ExecutionFailure::AmountOverflow(_)));
}

// =============================================================================
// ADMISSION PURITY
// =============================================================================

#[test]
fn test_check_tx_is_pure_and_repeatable() {
    let (mut ledger, alice) = setup(1_000);
    let engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let good = alice.invoke(APP_ID, 200, 10, HEIGHT);
    let bad = alice.invoke(RegId::new(50, 50), 200, 10, HEIGHT);

    let overlay = StateOverlay::new(&mut ledger);
    let ctx = engine.protocol_at(HEIGHT);
    for _ in 0..3 {
        assert_eq!(engine.check_tx(&good, &ctx, &overlay), Ok(()));
        assert_eq!(
            engine.check_tx(&bad, &ctx, &overlay),
            Err(ValidationRejection::ContractNotFound("50-50".to_string()))
        );
    }
    assert!(overlay.changes().is_empty());
}

#[test]
fn test_signature_by_other_key_rejected() {
    let (mut ledger, alice) = setup(1_000);
    let mallory = Wallet::new(13, ALICE_ID);
    let engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let forged = mallory.invoke(APP_ID, 200, 10, HEIGHT);

    let overlay = StateOverlay::new(&mut ledger);
    let ctx = engine.protocol_at(HEIGHT);
    assert_eq!(
        engine.check_tx(&forged, &ctx, &overlay),
        Err(ValidationRejection::BadSignature)
    );
    assert_eq!(engine.check_tx(&alice.invoke(APP_ID, 200, 10, HEIGHT), &ctx, &overlay), Ok(()));
}

#[test]
fn test_pubkey_sender_registers_on_first_invoke() {
    let (mut ledger, _alice) = setup(0);
    let carol = Wallet::new(21, RegId::new(0, 0));
    // Funded and key-bound, but never assigned a regid.
    let mut unregistered = Account::new(carol.key_hash);
    unregistered.owner_pubkey = Some(carol.pk.clone());
    unregistered
        .operate_balance(SYMBOL, BalanceOp::AddFree, 1_000)
        .unwrap();
    ledger.insert_account(unregistered);

    let tx = carol.sign(
        InvokeContractTx {
            version: 1,
            sender: UserId::PubKey(carol.pk.clone()),
            app: UserId::RegId(APP_ID),
            fee: 200,
            amount: 0,
            arguments: vec![],
            valid_height: HEIGHT,
            signature: vec![],
        }
        .into(),
    );
    let mut engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let receipt = engine
        .apply_block(&mut ledger, HEIGHT, &[tx], BlockMode::Connect)
        .unwrap();
    assert_eq!(receipt.results.len(), 1);

    let registered = ledger.key_hash_of(&RegId::new(HEIGHT, 0)).unwrap();
    assert_eq!(registered, Some(carol.key_hash));
    let account = ledger.account(&carol.key_hash).unwrap().unwrap();
    assert_eq!(account.owner_pubkey, Some(carol.pk.clone()));
}

// =============================================================================
// INVOLVEMENT
// =============================================================================

#[test]
fn test_involvement_index_superset_of_query() {
    let (mut ledger, alice) = setup(1_000);
    let touched = encode_address(&KeyHash::new([0x33; 20]));
    let vm = ScriptedVm::returning(VmOutcome {
        success: true,
        touched_sub_accounts: vec![touched.into_bytes()],
        ..VmOutcome::default()
    });
    let mut engine = engine(EngineConfig::default(), 1, vm);
    let tx = alice.invoke(APP_ID, 200, 0, HEIGHT);

    let mut overlay = StateOverlay::new(&mut ledger);
    let queried = engine.involved_key_ids(&tx, &overlay).unwrap();
    engine.execute_tx(&tx, HEIGHT, 0, &mut overlay).unwrap();
    let recorded = overlay
        .get_involved_addresses(&tx.hash())
        .unwrap()
        .unwrap();

    assert_eq!(queried.len(), 2);
    assert!(recorded.is_superset(&queried));
    // the query does not run the VM
    assert!(recorded.contains(&KeyHash::new([0x33; 20])));
    assert!(!queried.contains(&KeyHash::new([0x33; 20])));
}

#[test]
fn test_address_history_records_both_sides() {
    let (mut ledger, alice) = setup(1_000);
    let mut engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let txs = [
        alice.invoke(APP_ID, 200, 1, HEIGHT),
        alice.invoke(APP_ID, 201, 1, HEIGHT),
    ];
    engine
        .apply_block(&mut ledger, HEIGHT, &txs, BlockMode::Connect)
        .unwrap();

    let history = ledger.address_txs(&alice.key_hash).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].index, 1);
    assert_eq!(history[1].tx_hash, txs[1].hash());
    assert_eq!(ledger.address_txs(&contract_key_hash(&APP_ID)).unwrap().len(), 2);
}

// =============================================================================
// BLOCK ATOMICITY
// =============================================================================

#[test]
fn test_script_error_discards_connected_block() {
    let (mut ledger, alice) = setup(1_000);
    let vm = ScriptedVm::returning(VmOutcome::failed(3, "assertion failed"));
    let mut engine = engine(EngineConfig::default(), 1, vm);
    let txs = [alice.deploy(10, 50, HEIGHT), alice.invoke(APP_ID, 200, 100, HEIGHT)];

    let err = engine
        .apply_block(&mut ledger, HEIGHT, &txs, BlockMode::Connect)
        .unwrap_err();
    match err {
        BlockApplyError::Failed { index, source } => {
            assert_eq!(index, 1);
            assert_eq!(source, ExecutionFailure::ScriptError("assertion failed".into()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(free_balance(&ledger, &alice.key_hash), 1_000);
    assert!(ledger.contract(&RegId::new(HEIGHT, 0)).unwrap().is_none());
    assert_eq!(engine.stats().failed, 1);
}

#[test]
fn test_script_error_excluded_from_candidate() {
    let (mut ledger, alice) = setup(1_000);
    let vm = ScriptedVm::returning(VmOutcome::failed(3, "assertion failed"));
    let mut engine = engine(EngineConfig::default(), 1, vm);
    let txs = [
        alice.deploy(10, 50, HEIGHT),
        alice.invoke(APP_ID, 200, 100, HEIGHT),
        alice.deploy(20, 60, HEIGHT),
    ];

    let receipt = engine
        .apply_block(&mut ledger, HEIGHT, &txs, BlockMode::Candidate)
        .unwrap();
    assert_eq!(receipt.results.len(), 2);
    assert_eq!(receipt.excluded.len(), 1);
    assert_eq!(receipt.excluded[0].position, 1);
    assert_eq!(receipt.excluded[0].reason, "run script error: assertion failed");
    // second deploy took the freed position
    assert_eq!(receipt.results[1].contract_reg_id, Some(RegId::new(HEIGHT, 1)));
    assert_eq!(free_balance(&ledger, &alice.key_hash), 1_000 - 50 - 60);
    assert_eq!(free_balance(&ledger, &contract_key_hash(&APP_ID)), 0);
}

#[test]
fn test_rejected_tx_aborts_connected_block() {
    let (mut ledger, alice) = setup(1_000);
    let mut engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let txs = [alice.deploy(10, 50, HEIGHT), alice.deploy(100, 99, HEIGHT)];

    let err = engine
        .apply_block(&mut ledger, HEIGHT, &txs, BlockMode::Connect)
        .unwrap_err();
    assert!(matches!(
        err,
        BlockApplyError::Rejected {
            index: 1,
            source: ValidationRejection::FeeTooLowForFuel { fee: 99, fuel: 100 }
        }
    ));
    assert_eq!(free_balance(&ledger, &alice.key_hash), 1_000);
}

#[test]
fn test_mined_tx_replayed_in_next_block() {
    let (mut ledger, alice) = setup(1_000);
    let mut engine = engine(EngineConfig::default(), 1, ScriptedVm::succeeding(0));
    let mined = alice.deploy(10, 50, HEIGHT);
    engine
        .apply_block(&mut ledger, HEIGHT, &[mined.clone()], BlockMode::Connect)
        .unwrap();

    let next = HEIGHT + 1;
    {
        let overlay = StateOverlay::new(&mut ledger);
        assert_eq!(
            engine.check_tx(&mined, &engine.protocol_at(next), &overlay),
            Err(ValidationRejection::DuplicateTx(mined.hash()))
        );
    }

    let other = alice.deploy(20, 60, next);
    let receipt = engine
        .apply_block(&mut ledger, next, &[mined.clone(), other], BlockMode::Candidate)
        .unwrap();
    assert_eq!(receipt.results.len(), 1);
    assert_eq!(receipt.excluded.len(), 1);
    assert_eq!(receipt.excluded[0].reason, "duplicate-tx");
    assert_eq!(receipt.results[0].contract_reg_id, Some(RegId::new(next, 0)));
    assert_eq!(free_balance(&ledger, &alice.key_hash), 1_000 - 50 - 60);

    let err = engine
        .apply_block(&mut ledger, next + 1, &[mined.clone()], BlockMode::Connect)
        .unwrap_err();
    assert!(matches!(
        err,
        BlockApplyError::Rejected {
            index: 0,
            source: ValidationRejection::DuplicateTx(_)
        }
    ));
}
