//! # Validation Stage
//!
//! Read-only admission checks for contract transactions. Every check
//! short-circuits with a single [`ValidationRejection`]; nothing is written.
//!
//! ## Check order
//!
//! | # | Deploy | Invoke |
//! |---|--------|--------|
//! | 1 | valid-height window | valid-height window |
//! | 2 | fee range, hash not yet indexed | fee range, hash not yet indexed |
//! | 3 | sender is a regid | sender is a regid or a valid pubkey |
//! | 4 | code/memo limits | target is a regid, argument limit |
//! | 5 | fuel, relay floor | fuel, relay floor |
//! | 6 | account exists with owner key | same, then contract exists |
//! | 7 | signature by owner key | signature by supplied or owner key |

use crate::config::{EngineConfig, ProtocolContext};
use crate::domain::entities::{Account, ContractTx, DeployContractTx, InvokeContractTx};
use crate::domain::fuel::{fee_per_kb, required_fuel};
use crate::domain::identity::UserId;
use crate::domain::value_objects::PublicKey;
use crate::errors::ValidationRejection;
use crate::ports::outbound::{LedgerView, SignatureVerifier};

/// Inputs shared by every admission check.
pub struct Admission<'a, S: SignatureVerifier + ?Sized> {
    /// Engine limits.
    pub config: &'a EngineConfig,
    /// Protocol rules at the checking height.
    pub protocol: &'a ProtocolContext,
    /// Fuel rate at the checking height.
    pub fuel_rate: u64,
    /// Signature primitive.
    pub verifier: &'a S,
}

impl<S: SignatureVerifier + ?Sized> Admission<'_, S> {
    /// Runs all checks for `tx` against `view`.
    ///
    /// # Errors
    ///
    /// The first failed check.
    pub fn check<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        view: &V,
    ) -> Result<(), ValidationRejection> {
        self.check_height_window(tx)?;
        self.check_fee_range(tx)?;
        check_not_duplicate(tx, view)?;
        match tx {
            ContractTx::Deploy(deploy) => self.check_deploy(tx, deploy, view),
            ContractTx::Invoke(invoke) => self.check_invoke(tx, invoke, view),
        }
    }

    fn check_deploy<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        deploy: &DeployContractTx,
        view: &V,
    ) -> Result<(), ValidationRejection> {
        if deploy.sender.as_reg_id().is_none() {
            return Err(ValidationRejection::BadIdentityForm(format!(
                "deploy sender must be a regid, got {}",
                deploy.sender.kind()
            )));
        }
        self.check_contract_payload(deploy)?;
        self.check_fuel(tx)?;

        let account = load_sender(&deploy.sender, view)?;
        let owner = account
            .owner_pubkey
            .as_ref()
            .ok_or_else(|| ValidationRejection::AccountUnregistered(deploy.sender.to_string()))?;

        self.check_signature(owner, tx)
    }

    fn check_invoke<V: LedgerView + ?Sized>(
        &self,
        tx: &ContractTx,
        invoke: &InvokeContractTx,
        view: &V,
    ) -> Result<(), ValidationRejection> {
        match &invoke.sender {
            UserId::RegId(_) => {}
            UserId::PubKey(pk) => {
                if !self.verifier.is_valid_public_key(pk) {
                    return Err(ValidationRejection::BadIdentityForm(format!(
                        "invalid public key {}",
                        pk.to_hex()
                    )));
                }
            }
            other => {
                return Err(ValidationRejection::BadIdentityForm(format!(
                    "invoke sender must be a regid or pubkey, got {}",
                    other.kind()
                )))
            }
        }

        let Some(app_id) = invoke.app.as_reg_id() else {
            return Err(ValidationRejection::BadTargetForm(
                invoke.app.kind().to_string(),
            ));
        };

        if invoke.arguments.len() > self.config.max_argument_bytes {
            return Err(ValidationRejection::ArgumentsTooLarge {
                size: invoke.arguments.len(),
                max: self.config.max_argument_bytes,
            });
        }

        self.check_fuel(tx)?;

        let account = load_sender(&invoke.sender, view)?;
        let Some(owner) = account.owner_pubkey else {
            return Err(ValidationRejection::AccountUnregistered(
                invoke.sender.to_string(),
            ));
        };

        if view.get_contract(app_id)?.is_none() {
            return Err(ValidationRejection::ContractNotFound(app_id.to_string()));
        }

        let signer = match &invoke.sender {
            UserId::PubKey(pk) => pk,
            _ => &owner,
        };
        self.check_signature(signer, tx)
    }

    fn check_height_window(&self, tx: &ContractTx) -> Result<(), ValidationRejection> {
        let valid_height = u64::from(tx.valid_height());
        let height = u64::from(self.protocol.height);
        let window = u64::from(self.config.valid_height_window);
        if valid_height.abs_diff(height) > window {
            return Err(ValidationRejection::HeightOutOfWindow {
                valid_height,
                height,
                window,
            });
        }
        Ok(())
    }

    fn check_fee_range(&self, tx: &ContractTx) -> Result<(), ValidationRejection> {
        let fee = tx.fee();
        if fee < self.config.min_tx_fee || fee > self.config.max_tx_fee {
            return Err(ValidationRejection::FeeOutOfRange {
                fee,
                min: self.config.min_tx_fee,
                max: self.config.max_tx_fee,
            });
        }
        Ok(())
    }

    fn check_contract_payload(&self, deploy: &DeployContractTx) -> Result<(), ValidationRejection> {
        let payload = &deploy.contract;
        if payload.code.is_empty() {
            return Err(ValidationRejection::InvalidContractPayload(
                "empty contract code".to_string(),
            ));
        }
        if payload.contract_size() > self.config.max_contract_code_size {
            return Err(ValidationRejection::InvalidContractPayload(format!(
                "code size {} exceeds {}",
                payload.contract_size(),
                self.config.max_contract_code_size
            )));
        }
        if payload.memo.len() > self.config.max_contract_memo_size {
            return Err(ValidationRejection::InvalidContractPayload(format!(
                "memo size {} exceeds {}",
                payload.memo.len(),
                self.config.max_contract_memo_size
            )));
        }
        Ok(())
    }

    fn check_fuel(&self, tx: &ContractTx) -> Result<(), ValidationRejection> {
        let fee = tx.fee();
        let fuel = required_fuel(tx, self.fuel_rate, self.config);
        if fee < fuel {
            return Err(ValidationRejection::FeeTooLowForFuel { fee, fuel });
        }

        if self.protocol.relay_floor_active() {
            let per_kb = fee_per_kb(fee, fuel, tx.serialized_size());
            if per_kb < self.config.min_relay_fee_per_kb {
                return Err(ValidationRejection::FeeBelowRelayFloor {
                    fee_per_kb: per_kb,
                    min: self.config.min_relay_fee_per_kb,
                });
            }
        }
        Ok(())
    }

    fn check_signature(&self, signer: &PublicKey, tx: &ContractTx) -> Result<(), ValidationRejection> {
        if self
            .verifier
            .verify(signer, &tx.signing_payload(), tx.signature())
        {
            Ok(())
        } else {
            Err(ValidationRejection::BadSignature)
        }
    }
}

fn check_not_duplicate<V: LedgerView + ?Sized>(
    tx: &ContractTx,
    view: &V,
) -> Result<(), ValidationRejection> {
    let hash = tx.hash();
    if view.get_involved_addresses(&hash)?.is_some() {
        return Err(ValidationRejection::DuplicateTx(hash));
    }
    Ok(())
}

fn load_sender<V: LedgerView + ?Sized>(
    sender: &UserId,
    view: &V,
) -> Result<Account, ValidationRejection> {
    view.get_account(sender)?
        .ok_or_else(|| ValidationRejection::AccountNotFound(sender.to_string()))
}
