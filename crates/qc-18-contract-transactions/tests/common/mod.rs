//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use qc_18_contract_transactions::prelude::*;

pub const SYMBOL: &str = "QC";

/// A funded, registered user with a real secp256k1 key.
pub struct Wallet {
    key: SigningKey,
    pub pk: PublicKey,
    pub key_hash: KeyHash,
    pub reg_id: RegId,
}

impl Wallet {
    pub fn new(seed: u8, reg_id: RegId) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let pk = PublicKey::from_bytes(key.verifying_key().to_sec1_bytes().to_vec());
        let key_hash = public_key_hash(&pk);
        Self {
            key,
            pk,
            key_hash,
            reg_id,
        }
    }

    pub fn account(&self, balance: u64) -> Account {
        let mut account = Account::new(self.key_hash);
        account.reg_id = Some(self.reg_id);
        account.owner_pubkey = Some(self.pk.clone());
        account
            .operate_balance(SYMBOL, BalanceOp::AddFree, balance)
            .unwrap();
        account
    }

    pub fn sign(&self, mut tx: ContractTx) -> ContractTx {
        let sig: Signature = self.key.sign(&tx.signing_payload());
        let bytes = sig.to_bytes().to_vec();
        match &mut tx {
            ContractTx::Deploy(d) => d.signature = bytes,
            ContractTx::Invoke(i) => i.signature = bytes,
        }
        tx
    }

    pub fn deploy(&self, code_len: usize, fee: u64, valid_height: u32) -> ContractTx {
        self.sign(
            DeployContractTx {
                version: 1,
                sender: UserId::RegId(self.reg_id),
                contract: ContractPayload {
                    vm_kind: VmKind::Lua,
                    code: vec![0x5A; code_len],
                    memo: "test".to_string(),
                },
                fee,
                valid_height,
                signature: vec![],
            }
            .into(),
        )
    }

    pub fn invoke(&self, app: RegId, fee: u64, amount: u64, valid_height: u32) -> ContractTx {
        self.sign(
            InvokeContractTx {
                version: 1,
                sender: UserId::RegId(self.reg_id),
                app: UserId::RegId(app),
                fee,
                amount,
                arguments: b"transfer".to_vec(),
                valid_height,
                signature: vec![],
            }
            .into(),
        )
    }
}

type Script = Box<dyn FnMut(&VmRequest<'_>, &mut dyn LedgerView) -> VmOutcome>;

/// VM whose behaviour is a test-supplied closure.
pub struct ScriptedVm {
    script: Script,
    pub calls: usize,
}

impl ScriptedVm {
    pub fn new(script: impl FnMut(&VmRequest<'_>, &mut dyn LedgerView) -> VmOutcome + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: 0,
        }
    }

    pub fn succeeding(steps: u64) -> Self {
        Self::new(move |_, _| VmOutcome {
            success: true,
            steps_consumed: steps,
            ..VmOutcome::default()
        })
    }

    pub fn returning(outcome: VmOutcome) -> Self {
        Self::new(move |_, _| outcome.clone())
    }
}

impl VmAdapter for ScriptedVm {
    fn execute(&mut self, request: &VmRequest<'_>, view: &mut dyn LedgerView) -> VmOutcome {
        self.calls += 1;
        (self.script)(request, view)
    }
}

pub type Engine = ContractTxEngine<FixedFuelRate, Secp256k1Verifier, ScriptedVm>;

pub fn engine(config: EngineConfig, fuel_rate: u64, vm: ScriptedVm) -> Engine {
    ContractTxEngine::new(config, FixedFuelRate(fuel_rate), Secp256k1Verifier, vm).unwrap()
}

/// Registers a deployed contract at `reg_id`.
pub fn seed_contract(ledger: &mut InMemoryLedger, reg_id: RegId) {
    ledger.insert_account(Account::new_contract(reg_id));
    ledger.insert_contract(
        reg_id,
        Contract {
            vm_kind: VmKind::Lua,
            code: b"return 1".to_vec(),
            name: "fixture".to_string(),
            memo: String::new(),
        },
    );
}

pub fn free_balance(reader: &impl LedgerReader, key: &KeyHash) -> u64 {
    reader
        .account(key)
        .unwrap()
        .map_or(0, |a| a.free_balance(SYMBOL))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
