//! # Diagnostic Representation
//!
//! Human-readable and JSON views of a contract transaction for logs and RPC.
//! Addresses that cannot be resolved render as empty strings.

use crate::domain::entities::ContractTx;
use crate::domain::identity::{encode_address, UserId};
use crate::ports::outbound::AccountStore;
use serde_json::{json, Value};

fn address_of<V: AccountStore + ?Sized>(id: &UserId, view: &V) -> String {
    id.resolve(view)
        .map(|key| encode_address(&key))
        .unwrap_or_default()
}

/// One-line `key=value` rendering.
pub fn describe<V: AccountStore + ?Sized>(tx: &ContractTx, view: &V) -> String {
    let head = format!(
        "tx_type={}, hash={}, ver={}, tx_uid={}, addr={}",
        tx.tx_type(),
        tx.hash(),
        tx.version(),
        tx.sender(),
        address_of(tx.sender(), view),
    );
    match tx {
        ContractTx::Deploy(deploy) => format!(
            "{head}, fee={}, contract_size={}, valid_height={}",
            deploy.fee,
            deploy.contract.contract_size(),
            deploy.valid_height
        ),
        ContractTx::Invoke(invoke) => format!(
            "{head}, app_uid={}, app_addr={}, amount={}, fee={}, arguments={}, valid_height={}",
            invoke.app,
            address_of(&invoke.app, view),
            invoke.amount,
            invoke.fee,
            hex::encode(&invoke.arguments),
            invoke.valid_height
        ),
    }
}

/// Structured rendering.
pub fn to_json<V: AccountStore + ?Sized>(tx: &ContractTx, view: &V) -> Value {
    let mut obj = json!({
        "txid": tx.hash().to_hex(),
        "tx_type": tx.tx_type(),
        "ver": tx.version(),
        "tx_uid": tx.sender().to_string(),
        "addr": address_of(tx.sender(), view),
        "fees": tx.fee(),
        "valid_height": tx.valid_height(),
    });
    let extra = match tx {
        ContractTx::Deploy(deploy) => json!({
            "contract_code": hex::encode(&deploy.contract.code),
            "contract_memo": deploy.contract.memo,
        }),
        ContractTx::Invoke(invoke) => json!({
            "app_uid": invoke.app.to_string(),
            "app_addr": address_of(&invoke.app, view),
            "money": invoke.amount,
            "arguments": hex::encode(&invoke.arguments),
        }),
    };
    if let (Value::Object(map), Value::Object(more)) = (&mut obj, extra) {
        map.extend(more);
    }
    obj
}
