/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The action interpreter: folds the ordered action list a callable returned into the
//! in-flight diff, verifying asset scripts for asset-touching actions and enforcing the
//! per-version limits.
//!
//! Evaluation inside one invocation is strictly left to right. Every action's diff is
//! absorbed into the shared overlay before the next action runs, so later actions (and
//! nested sync calls) observe earlier writes through the composite view. Whether a
//! misbehaving action rejects the transaction or fails it for its fee is decided by the two
//! activation heights threaded through [InvokeState].

use std::collections::BTreeSet;

use crate::blockchain::{Blockchain, CompositeBlockchain};
use crate::diff::{
    AssetInfoUpdate, AssetStaticInfo, AssetUpdate, AssetVolumeUpdate, Diff, InvokeScriptResult, LeaseDetails,
    LeaseStatus, Portfolio, ResultTransfer, Sponsorship, SyncCall,
};
use crate::error::{
    ExecutionError, FailedTransactionError, RejectError, TraceStep, ValidationError,
};
use crate::lang::{
    evaluate, EvaluationContext, EvaluationLog, EvaluationMode, LangConfig, ScriptContent, StdLibVersion, Value,
};
use crate::limits;
use crate::transaction::Transaction;
use crate::transition::ActivationHeights;
use crate::types::{Address, AssetId, ByteStr, Height, PublicKey, Recipient};

use super::actions::{issued_asset_id, lease_id, CallableAction};
use super::pseudo_tx::PseudoTx;

/// Everything one invocation carries through evaluation, action folding and nested sync
/// calls. The overlay is the transaction's diff in the making.
pub(crate) struct InvokeState<'a, B: Blockchain> {
    pub snapshot: &'a B,
    pub overlay: Diff,
    pub tx: &'a Transaction,
    pub height: Height,
    pub activation: ActivationHeights,
    pub lang_config: LangConfig,
    /// Sync-call depth; the root invocation is depth 0.
    pub depth: u32,
    pub call_stack: Vec<Address>,
    pub total_spent: u64,
    pub scripts_run: u32,
    pub trace: Vec<TraceStep>,
    pub sync_calls: Vec<SyncCall>,
    // limit counters, accumulated across nested calls
    pub non_data_actions: usize,
    pub data_entries: usize,
    pub data_bytes: usize,
    pub cancelled_leases: BTreeSet<ByteStr>,
    pub non_nft_issues: u32,
}

impl<'a, B: Blockchain> InvokeState<'a, B> {
    pub fn new(
        snapshot: &'a B,
        tx: &'a Transaction,
        activation: ActivationHeights,
        lang_config: LangConfig,
    ) -> Self {
        Self {
            snapshot,
            overlay: Diff::default(),
            tx,
            height: snapshot.height(),
            activation,
            lang_config,
            depth: 0,
            call_stack: Vec::new(),
            total_spent: 0,
            scripts_run: 0,
            trace: Vec::new(),
            sync_calls: Vec::new(),
            non_data_actions: 0,
            data_entries: 0,
            data_bytes: 0,
            cancelled_leases: BTreeSet::new(),
            non_nft_issues: 0,
        }
    }

    /// Composite view over the snapshot and everything absorbed so far.
    pub fn view(&self) -> CompositeBlockchain<'_, B> {
        CompositeBlockchain::new(self.snapshot, self.overlay.clone())
    }

    pub fn budget_remaining(&self, version: StdLibVersion) -> u64 {
        complexity_limit(version).saturating_sub(self.total_spent)
    }

    pub fn absorb(&mut self, diff: Diff) -> Result<(), ValidationError> {
        let overlay = std::mem::take(&mut self.overlay);
        self.overlay = overlay
            .combine(diff)
            .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
        Ok(())
    }

    /// Since `sync_dapp_check_transfers` a misbehaving action rejects; before it, the
    /// transaction fails for its fee.
    fn reject_or_fail(&self, reject: RejectError, message: String, log: &EvaluationLog) -> ValidationError {
        if self.height >= self.activation.sync_dapp_check_transfers {
            ValidationError::Reject(reject)
        } else {
            ValidationError::Failed(FailedTransactionError::DAppExecution {
                message,
                spent_complexity: self.total_spent,
                log: log.clone(),
            })
        }
    }

    fn fail(&self, message: String, log: &EvaluationLog) -> ValidationError {
        ValidationError::Failed(FailedTransactionError::DAppExecution {
            message,
            spent_complexity: self.total_spent,
            log: log.clone(),
        })
    }
}

/// Accumulated-complexity ceiling of one transaction: sync-call capable scripts get the
/// transaction-wide budget, older ones a single step.
pub(crate) fn complexity_limit(version: StdLibVersion) -> u64 {
    if version.supports_sync_calls() {
        limits::TOTAL_COMPLEXITY_LIMIT
    } else {
        limits::step_limit(version)
    }
}

/// Folds `actions` into the overlay. `dapp` is the account whose callable produced them;
/// `log` is that callable's evaluation log, carried into fail-for-fee errors.
pub(crate) fn fold_actions<B: Blockchain>(
    state: &mut InvokeState<'_, B>,
    dapp: Address,
    dapp_public_key: PublicKey,
    version: StdLibVersion,
    actions: &[CallableAction],
    log: &EvaluationLog,
) -> Result<InvokeScriptResult, ValidationError> {
    let mut result = InvokeScriptResult::default();

    for (index, action) in actions.iter().enumerate() {
        match action {
            CallableAction::Transfer { recipient, amount, asset } => {
                let recipient = resolve_recipient(state, recipient)?;
                if *amount < 0 {
                    return Err(state.reject_or_fail(
                        RejectError::NegativeAmount(format!("Negative transfer amount = {}", amount)),
                        "Negative amounts are forbidden in transfers".to_owned(),
                        log,
                    ));
                }
                if let AssetId::Issued(_) = asset {
                    if state.view().asset_description(asset).is_none() {
                        return Err(ValidationError::Reject(RejectError::UnissuedAsset(asset.clone())));
                    }
                    verify_asset_script(
                        state,
                        asset,
                        PseudoTx::Transfer {
                            sender: dapp_public_key,
                            sender_address: dapp,
                            recipient,
                            amount: *amount,
                            asset: asset.clone(),
                            tx_id: state.tx.id.clone(),
                            timestamp: state.tx.timestamp,
                        },
                    )?;
                }
                let diff = Diff::of_portfolios([
                    (dapp, Portfolio::asset(asset.clone(), -*amount)),
                    (recipient, Portfolio::asset(asset.clone(), *amount)),
                ])
                .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
                state.absorb(diff)?;
                state.non_data_actions += 1;
                result.transfers.push(ResultTransfer {
                    recipient,
                    amount: *amount,
                    asset: asset.clone(),
                });
            }

            CallableAction::DataOp(entry) => {
                let max_key = limits::max_key_size(version);
                if entry.key.len() > max_key {
                    return Err(state.reject_or_fail(
                        RejectError::WriteSetTooLarge(format!(
                            "Key size = {} bytes exceeds {}",
                            entry.key.len(),
                            max_key
                        )),
                        format!("Key size = {} bytes exceeds {}", entry.key.len(), max_key),
                        log,
                    ));
                }
                if entry.key.is_empty() && version >= StdLibVersion::V4 {
                    return Err(state.reject_or_fail(
                        RejectError::GenericError("Empty keys aren't allowed".to_owned()),
                        "Empty keys aren't allowed".to_owned(),
                        log,
                    ));
                }
                let value_len = entry.payload_len() - entry.key.len();
                if value_len > limits::MAX_BYTESTR_SIZE {
                    return Err(state.reject_or_fail(
                        RejectError::WriteSetTooLarge(format!(
                            "Value size = {} bytes exceeds {}",
                            value_len,
                            limits::MAX_BYTESTR_SIZE
                        )),
                        format!("Value size = {} bytes exceeds {}", value_len, limits::MAX_BYTESTR_SIZE),
                        log,
                    ));
                }
                state.data_entries += 1;
                state.data_bytes += entry.payload_len();
                state.absorb(Diff::of_data(dapp, [entry.clone()]))?;
                result.data.push(entry.clone());
            }

            CallableAction::Issue {
                name,
                description,
                quantity,
                decimals,
                reissuable,
                nonce,
            } => {
                let id = issued_asset_id(&state.tx.id, index as u32, name, description, *decimals, *reissuable, *nonce);
                let asset = AssetId::Issued(id);
                if state.view().asset_description(&asset).is_some() {
                    return Err(state.reject_or_fail(
                        RejectError::AssetAlreadyExists(asset.clone()),
                        format!("Asset {} is already issued", asset),
                        log,
                    ));
                }
                if *quantity < 0 {
                    return Err(state.reject_or_fail(
                        RejectError::NegativeAmount(format!("Negative issue quantity = {}", quantity)),
                        format!("Negative issue quantity = {}", quantity),
                        log,
                    ));
                }
                if *decimals > 8 {
                    return Err(ValidationError::Reject(RejectError::GenericError(format!(
                        "Invalid decimals = {}",
                        decimals
                    ))));
                }
                let nft = *quantity == 1 && *decimals == 0 && !reissuable;
                if !nft {
                    state.non_nft_issues += 1;
                }
                let diff = Diff {
                    issued_assets: [(
                        asset.clone(),
                        (
                            AssetStaticInfo {
                                origin_tx: state.tx.id.clone(),
                                issuer: dapp_public_key,
                                decimals: *decimals,
                                nft,
                            },
                            AssetInfoUpdate {
                                name: name.clone(),
                                description: description.clone(),
                                last_updated_height: state.height,
                            },
                            AssetVolumeUpdate {
                                reissuable: *reissuable,
                                volume: *quantity as i128,
                            },
                        ),
                    )]
                    .into(),
                    ..Default::default()
                };
                state.absorb(diff)?;
                state.absorb(Diff::of_portfolio(dapp, Portfolio::asset(asset.clone(), *quantity)))?;
                state.non_data_actions += 1;
                result.issues.push(asset);
            }

            CallableAction::Reissue { asset, quantity, reissuable } => {
                let description = state
                    .view()
                    .asset_description(asset)
                    .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(asset.clone())))?;
                if Address::from_public_key(state.tx.chain_id, &description.issuer) != dapp {
                    return Err(ValidationError::Reject(RejectError::GenericError(
                        "Asset was issued by other address".to_owned(),
                    )));
                }
                if *quantity < 0 && state.height >= state.activation.sync_dapp_check_transfers {
                    return Err(ValidationError::Reject(RejectError::NegativeAmount(format!(
                        "Negative reissue quantity = {}",
                        quantity
                    ))));
                }
                if !description.reissuable {
                    return Err(state.fail("Asset is not reissuable".to_owned(), log));
                }
                verify_asset_script(
                    state,
                    asset,
                    PseudoTx::Reissue {
                        sender: dapp_public_key,
                        sender_address: dapp,
                        asset: asset.clone(),
                        quantity: *quantity,
                        reissuable: *reissuable,
                        tx_id: state.tx.id.clone(),
                        timestamp: state.tx.timestamp,
                    },
                )?;
                let diff = Diff {
                    updated_assets: [(
                        asset.clone(),
                        AssetUpdate::Volume(AssetVolumeUpdate {
                            reissuable: *reissuable,
                            volume: *quantity as i128,
                        }),
                    )]
                    .into(),
                    ..Default::default()
                };
                state.absorb(diff)?;
                state.absorb(Diff::of_portfolio(dapp, Portfolio::asset(asset.clone(), *quantity)))?;
                state.non_data_actions += 1;
                result.reissues.push((asset.clone(), *quantity));
            }

            CallableAction::Burn { asset, quantity } => {
                let description = state
                    .view()
                    .asset_description(asset)
                    .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(asset.clone())))?;
                if *quantity < 0 && state.height >= state.activation.sync_dapp_check_transfers {
                    return Err(ValidationError::Reject(RejectError::NegativeAmount(format!(
                        "Negative burn quantity = {}",
                        quantity
                    ))));
                }
                verify_asset_script(
                    state,
                    asset,
                    PseudoTx::Burn {
                        sender: dapp_public_key,
                        sender_address: dapp,
                        asset: asset.clone(),
                        quantity: *quantity,
                        tx_id: state.tx.id.clone(),
                        timestamp: state.tx.timestamp,
                    },
                )?;
                // legacy path before the activation height applies the signed quantity as-is
                let diff = Diff {
                    updated_assets: [(
                        asset.clone(),
                        AssetUpdate::Volume(AssetVolumeUpdate {
                            reissuable: description.reissuable,
                            volume: -(*quantity as i128),
                        }),
                    )]
                    .into(),
                    ..Default::default()
                };
                state.absorb(diff)?;
                state.absorb(Diff::of_portfolio(dapp, Portfolio::asset(asset.clone(), -*quantity)))?;
                state.non_data_actions += 1;
                result.burns.push((asset.clone(), *quantity));
            }

            CallableAction::SponsorFee { asset, min_sponsored_fee } => {
                let description = state
                    .view()
                    .asset_description(asset)
                    .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(asset.clone())))?;
                if Address::from_public_key(state.tx.chain_id, &description.issuer) != dapp {
                    return Err(ValidationError::Reject(RejectError::GenericError(
                        "SponsorFee is available only to the asset issuer".to_owned(),
                    )));
                }
                if *min_sponsored_fee < 0 {
                    return Err(state.reject_or_fail(
                        RejectError::NegativeAmount(format!("Negative sponsor fee = {}", min_sponsored_fee)),
                        format!("Negative sponsor fee = {}", min_sponsored_fee),
                        log,
                    ));
                }
                verify_asset_script(
                    state,
                    asset,
                    PseudoTx::SponsorFee {
                        sender: dapp_public_key,
                        sender_address: dapp,
                        asset: asset.clone(),
                        min_sponsored_fee: *min_sponsored_fee,
                        tx_id: state.tx.id.clone(),
                        timestamp: state.tx.timestamp,
                    },
                )?;
                let diff = Diff {
                    sponsorship: [(asset.clone(), Sponsorship::Value(*min_sponsored_fee))].into(),
                    ..Default::default()
                };
                state.absorb(diff)?;
                state.non_data_actions += 1;
                result.sponsor_fees.push((asset.clone(), *min_sponsored_fee));
            }

            CallableAction::Lease { recipient, amount, nonce } => {
                let resolved = resolve_recipient(state, recipient)?;
                if resolved == dapp {
                    return Err(ValidationError::Reject(RejectError::GenericError(
                        "Cannot lease to self".to_owned(),
                    )));
                }
                if *amount < 0 {
                    return Err(state.reject_or_fail(
                        RejectError::NegativeAmount(format!("Negative lease amount = {}", amount)),
                        format!("Negative lease amount = {}", amount),
                        log,
                    ));
                }
                if *amount == 0 {
                    return Err(ValidationError::Reject(RejectError::NonPositiveAmount {
                        amount: 0,
                        of: "lease".to_owned(),
                    }));
                }
                let id = lease_id(&state.tx.id, *nonce, recipient, *amount);
                if state.view().lease_details(&id).is_some() {
                    return Err(ValidationError::Reject(RejectError::GenericError(format!(
                        "Lease with id {} already exists",
                        id
                    ))));
                }
                let diff = Diff {
                    lease_state: [(
                        id.clone(),
                        LeaseDetails {
                            sender: dapp_public_key,
                            recipient: recipient.clone(),
                            amount: *amount,
                            status: LeaseStatus::Active,
                            source_tx: state.tx.id.clone(),
                            height: state.height,
                        },
                    )]
                    .into(),
                    ..Default::default()
                };
                state.absorb(diff)?;
                let balances = Diff::of_portfolios([
                    (dapp, Portfolio::lease(0, *amount)),
                    (resolved, Portfolio::lease(*amount, 0)),
                ])
                .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
                state.absorb(balances)?;
                state.non_data_actions += 1;
                result.leases.push(id);
            }

            CallableAction::LeaseCancel { lease_id } => {
                if !state.cancelled_leases.insert(lease_id.clone()) {
                    return Err(state.fail(format!("Duplicate LeaseCancel id(s): {}", lease_id), log));
                }
                let details = state
                    .view()
                    .lease_details(lease_id)
                    .ok_or_else(|| state.fail(format!("Lease with id {} not found", lease_id), log))?;
                if !details.is_active() {
                    return Err(state.fail(format!("Cannot cancel already cancelled lease {}", lease_id), log));
                }
                if Address::from_public_key(state.tx.chain_id, &details.sender) != dapp {
                    return Err(state.fail(
                        "LeaseCancel is available only to the lease sender".to_owned(),
                        log,
                    ));
                }
                let recipient = resolve_recipient(state, &details.recipient)?;
                let diff = Diff {
                    lease_state: [(
                        lease_id.clone(),
                        LeaseDetails {
                            status: LeaseStatus::Cancelled {
                                at_height: state.height,
                                cancel_tx: state.tx.id.clone(),
                            },
                            ..details.clone()
                        },
                    )]
                    .into(),
                    ..Default::default()
                };
                state.absorb(diff)?;
                let balances = Diff::of_portfolios([
                    (dapp, Portfolio::lease(0, -details.amount)),
                    (recipient, Portfolio::lease(-details.amount, 0)),
                ])
                .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
                state.absorb(balances)?;
                state.non_data_actions += 1;
                result.lease_cancels.push(lease_id.clone());
            }
        }
    }

    check_limits(state, version, log)?;
    Ok(result)
}

fn check_limits<B: Blockchain>(
    state: &InvokeState<'_, B>,
    version: StdLibVersion,
    log: &EvaluationLog,
) -> Result<(), ValidationError> {
    let max_actions = limits::max_callable_actions(version);
    if state.non_data_actions > max_actions {
        return Err(state.fail(
            format!("Too many script actions: max {} allowed", max_actions),
            log,
        ));
    }
    let max_entries = limits::max_write_set_size(version);
    if state.data_entries > max_entries {
        return Err(state.fail(
            format!("WriteSet can't contain more than {} entries", max_entries),
            log,
        ));
    }
    // byte limit is unchecked before the first activation height, fails for fee after it,
    // and rejects after the second
    if state.data_bytes > limits::MAX_TOTAL_WRITE_SET_SIZE_IN_BYTES {
        let message = format!(
            "WriteSet size = {} bytes exceeds {}",
            state.data_bytes,
            limits::MAX_TOTAL_WRITE_SET_SIZE_IN_BYTES
        );
        if state.height >= state.activation.sync_dapp_check_transfers {
            return Err(ValidationError::Reject(RejectError::WriteSetTooLarge(message)));
        }
        if state.height >= state.activation.check_total_data_entries_bytes {
            return Err(state.fail(message, log));
        }
    }
    Ok(())
}

pub(crate) fn resolve_recipient<B: Blockchain>(
    state: &InvokeState<'_, B>,
    recipient: &Recipient,
) -> Result<Address, ValidationError> {
    match recipient {
        Recipient::Address(address) => Ok(*address),
        Recipient::Alias(alias) => state
            .view()
            .resolve_alias(alias)
            .ok_or_else(|| ValidationError::Reject(RejectError::AliasDoesNotExist(alias.clone()))),
    }
}

/// Runs the asset script of `asset` against a pseudo-transaction and accepts only `true`.
/// Consumed complexity joins the running total whatever the verdict.
pub(crate) fn verify_asset_script<B: Blockchain>(
    state: &mut InvokeState<'_, B>,
    asset: &AssetId,
    pseudo: PseudoTx,
) -> Result<(), ValidationError> {
    let Some(script_info) = state.view().asset_script(asset) else {
        return Ok(());
    };
    let expression = match &script_info.script.content {
        ScriptContent::Expression(expression) => expression.clone(),
        ScriptContent::DApp(_) => {
            return Err(ValidationError::Reject(RejectError::GenericError(
                "Asset script cannot be a dApp".to_owned(),
            )))
        }
    };
    let version = script_info.script.version;
    let mut ctx = EvaluationContext::new(version, state.lang_config)
        .with_binding("tx", pseudo.to_value())
        .with_binding("height", Value::Long(state.height as i64));
    let budget = state.budget_remaining(version);
    let evaluation = evaluate(&expression, &mut ctx, budget, EvaluationMode::Complete);

    state.total_spent = state.total_spent.saturating_add(evaluation.consumed);
    state.scripts_run += 1;

    match evaluation.result {
        Ok(Value::Bool(true)) => {
            state.trace.push(TraceStep::AssetScript {
                asset: asset.clone(),
                result: Ok(true),
                log: evaluation.log,
            });
            Ok(())
        }
        Ok(Value::Bool(false)) => {
            state.trace.push(TraceStep::AssetScript {
                asset: asset.clone(),
                result: Ok(false),
                log: evaluation.log.clone(),
            });
            Err(ValidationError::Failed(FailedTransactionError::NotAllowedByAssetInAction {
                spent_complexity: state.total_spent,
                log: evaluation.log,
                asset: asset.clone(),
            }))
        }
        Ok(other) => Err(ValidationError::Failed(FailedTransactionError::AssetExecutionInAction {
            message: format!("Asset script returned {}, expected a boolean", other.type_name()),
            spent_complexity: state.total_spent,
            log: evaluation.log,
            asset: asset.clone(),
        })),
        Err(ExecutionError::Rejected(reject)) => Err(ValidationError::Reject(*reject)),
        Err(error) => {
            state.trace.push(TraceStep::AssetScript {
                asset: asset.clone(),
                result: Err(error.to_string()),
                log: evaluation.log.clone(),
            });
            Err(ValidationError::Failed(FailedTransactionError::AssetExecutionInAction {
                message: error.to_string(),
                spent_complexity: state.total_spent,
                log: evaluation.log,
                asset: asset.clone(),
            }))
        }
    }
}
