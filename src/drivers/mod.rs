/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-transaction-kind diff assemblers. Each driver checks static preconditions, resolves
//! aliases, builds portfolio diffs and hands back `Result<Diff, ValidationError>`; this
//! module owns the steps every kind shares: sender authorization, fee conversion and the
//! final transaction binding.

pub(crate) mod alias;
pub(crate) mod data;
pub(crate) mod invoke;
pub(crate) mod issue;
pub(crate) mod lease;
pub(crate) mod script;
pub(crate) mod sponsor;
pub(crate) mod transfer;

use crate::blockchain::Blockchain;
use crate::diff::{Diff, Portfolio};
use crate::error::{RejectError, TraceStep, ValidationError};
use crate::fees::{FEE_UNIT, ISSUE_FEE_BASE, SCRIPT_EXTRA_FEE};
use crate::invoke::interpreter::complexity_limit;
use crate::invoke::pseudo_tx::transaction_value;
use crate::lang::{evaluate, EvaluationContext, EvaluationMode, LangConfig, ScriptContent, Value};
use crate::sponsorship;
use crate::transaction::{Transaction, TransactionData};
use crate::transition::ActivationHeights;
use crate::types::{Address, AssetId, Height};

/// Inputs shared by every driver.
pub(crate) struct DriverContext<'a, B: Blockchain> {
    pub blockchain: &'a B,
    pub tx: &'a Transaction,
    pub height: Height,
    pub activation: ActivationHeights,
    pub lang_config: LangConfig,
}

impl<B: Blockchain> DriverContext<'_, B> {
    pub fn sender_address(&self) -> Address {
        self.tx.sender_address()
    }
}

/// What sender authorization consumed.
pub(crate) struct Authorization {
    pub scripts_run: u32,
    pub complexity: u64,
    pub has_verifier: bool,
}

pub(crate) fn diff_for_transaction<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
) -> (Result<Diff, ValidationError>, Vec<TraceStep>) {
    let mut trace = Vec::new();
    let diff = build_diff(ctx, &mut trace);
    (diff, trace)
}

fn build_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    trace: &mut Vec<TraceStep>,
) -> Result<Diff, ValidationError> {
    if ctx.tx.fee <= 0 {
        return Err(ValidationError::Reject(RejectError::InsufficientFee(
            "fee must be positive".to_owned(),
        )));
    }

    let auth = authorize(ctx)?;
    let (fee_diff, fee_in_base) = fee_diff(ctx)?;

    let (body, spent_complexity, dapp) = match &ctx.tx.data {
        TransactionData::Transfer(data) => (transfer::transfer_diff(ctx, data)?, 0, None),
        TransactionData::Data(data) => (data::data_diff(ctx, data)?, 0, None),
        TransactionData::Lease(data) => (lease::lease_diff(ctx, data)?, 0, None),
        TransactionData::LeaseCancel(data) => (lease::lease_cancel_diff(ctx, data)?, 0, None),
        TransactionData::CreateAlias(data) => (alias::create_alias_diff(ctx, data)?, 0, None),
        TransactionData::Issue(data) => (issue::issue_diff(ctx, data)?, 0, None),
        TransactionData::Reissue(data) => (issue::reissue_diff(ctx, data)?, 0, None),
        TransactionData::Burn(data) => (issue::burn_diff(ctx, data)?, 0, None),
        TransactionData::SetScript(data) => (script::set_script_diff(ctx, data)?, 0, None),
        TransactionData::SetAssetScript(data) => (script::set_asset_script_diff(ctx, data)?, 0, None),
        TransactionData::SponsorFee(data) => (sponsor::sponsor_diff(ctx, data)?, 0, None),
        TransactionData::InvokeScript(data) => {
            let (diff, spent, dapp) = invoke::invoke_diff(ctx, data, &auth, fee_in_base, trace)?;
            (diff, spent, Some(dapp))
        }
    };

    // the invoke driver computes its own post-hoc minimum; everything else has a static one
    if !matches!(ctx.tx.data, TransactionData::InvokeScript(_)) {
        let min_fee = base_min_fee(&ctx.tx.data, auth.has_verifier);
        if fee_in_base < min_fee {
            return Err(ValidationError::Reject(RejectError::InsufficientFee(format!(
                "fee of {} base units does not exceed minimal value of {}",
                fee_in_base, min_fee
            ))));
        }
    }

    let mut diff = fee_diff
        .combine(body)
        .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
    diff.scripts_run += auth.scripts_run;
    diff.scripts_complexity += auth.complexity;
    let total_spent = spent_complexity + auth.complexity;

    Ok(diff.bind_transaction(ctx.tx, true, total_spent, dapp))
}

/// Sender authorization: the account's verifier script when there is one, the attached
/// signature otherwise. Verifier failures always reject, they never fail for the fee.
fn authorize<B: Blockchain>(ctx: &DriverContext<'_, B>) -> Result<Authorization, ValidationError> {
    let sender = ctx.sender_address();
    match ctx.blockchain.account_script(&sender) {
        Some(info) => match &info.script.content {
            ScriptContent::Expression(expression) => {
                let version = info.script.version;
                let mut eval_ctx = EvaluationContext::new(version, ctx.lang_config)
                    .with_binding("tx", transaction_value(ctx.tx))
                    .with_binding("height", Value::Long(ctx.height as i64));
                let evaluation = evaluate(
                    expression,
                    &mut eval_ctx,
                    complexity_limit(version),
                    EvaluationMode::Complete,
                );
                match evaluation.result {
                    Ok(Value::Bool(true)) => Ok(Authorization {
                        scripts_run: 1,
                        complexity: evaluation.consumed,
                        has_verifier: true,
                    }),
                    Ok(_) => Err(ValidationError::Reject(RejectError::GenericError(format!(
                        "Transaction is not allowed by account script:\n{}",
                        crate::lang::render_log(&evaluation.log)
                    )))),
                    Err(error) => Err(ValidationError::Reject(RejectError::GenericError(format!(
                        "Account script error: {}:\n{}",
                        error,
                        crate::lang::render_log(&evaluation.log)
                    )))),
                }
            }
            // a dApp account without a verifier falls back to the plain signature check
            ScriptContent::DApp(_) => signature_authorization(ctx),
        },
        None => signature_authorization(ctx),
    }
}

fn signature_authorization<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
) -> Result<Authorization, ValidationError> {
    if ctx.tx.verify_signature() {
        Ok(Authorization {
            scripts_run: 0,
            complexity: 0,
            has_verifier: false,
        })
    } else {
        Err(ValidationError::Reject(RejectError::InvalidSignature))
    }
}

/// Builds the fee leg of the diff and returns it with the base-unit equivalent of the
/// attached fee. Asset-denominated fees route through the issuer at the declared rate.
fn fee_diff<B: Blockchain>(ctx: &DriverContext<'_, B>) -> Result<(Diff, i64), ValidationError> {
    let sender = ctx.sender_address();
    match &ctx.tx.fee_asset {
        AssetId::Base => Ok((Diff::of_portfolio(sender, Portfolio::base(-ctx.tx.fee)), ctx.tx.fee)),
        asset => {
            if ctx.height < ctx.activation.sponsorship {
                return Err(ValidationError::Reject(RejectError::GenericError(
                    "Sponsorship has not been activated yet".to_owned(),
                )));
            }
            let description = ctx
                .blockchain
                .asset_description(asset)
                .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(asset.clone())))?;
            if description.sponsorship_rate == 0 {
                return Err(ValidationError::Reject(RejectError::InsufficientFee(format!(
                    "Asset {} is not sponsored, cannot be used to pay fees",
                    asset
                ))));
            }
            let fee_in_base = sponsorship::to_base(ctx.tx.fee, description.sponsorship_rate)
                .map_err(ValidationError::Reject)?;
            let issuer = Address::from_public_key(ctx.tx.chain_id, &description.issuer);
            let diff = Diff::of_portfolios([
                (sender, Portfolio::asset(asset.clone(), -ctx.tx.fee)),
                (issuer, Portfolio::asset(asset.clone(), ctx.tx.fee)),
            ])
            .and_then(|diff| diff.combine(Diff::of_portfolio(issuer, Portfolio::base(-fee_in_base))))
            .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
            Ok((diff, fee_in_base))
        }
    }
}

/// Static minimum fee of the non-invoke kinds, in base units.
fn base_min_fee(data: &TransactionData, has_verifier: bool) -> i64 {
    let base = match data {
        TransactionData::Issue(_) => ISSUE_FEE_BASE * FEE_UNIT,
        TransactionData::SetAssetScript(_) => ISSUE_FEE_BASE * FEE_UNIT,
        _ => FEE_UNIT,
    };
    if has_verifier {
        base + SCRIPT_EXTRA_FEE * FEE_UNIT
    } else {
        base
    }
}
