/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Synchronous cross-dApp invocation. The root invoke driver and the `invoke`/
//! `reentrantInvoke` builtins both enter through [invoke_callable]; nested calls execute
//! depth-first and their diffs become visible to the caller's subsequent actions through the
//! shared overlay.

use crate::blockchain::Blockchain;
use crate::diff::{Diff, InvokeScriptResult, Portfolio, SyncCall};
use crate::error::{ExecutionError, FailedTransactionError, RejectError, ValidationError};
use crate::lang::{
    evaluate, DAppDispatcher, EvaluationContext, EvaluationMode, Value,
};
use crate::limits::MAX_SYNC_DEPTH;
use crate::transaction::Payment;
use crate::types::{Address, AssetId, ByteStr, PublicKey, Recipient};

use super::actions::{actions_from_result, address_value, asset_value, recipient_from};
use super::interpreter::{fold_actions, verify_asset_script, InvokeState};
use super::pseudo_tx::PseudoTx;

/// Who calls, what they call, and what they attach.
pub(crate) struct CallableInvocation {
    pub caller: Address,
    pub caller_public_key: PublicKey,
    pub function: String,
    pub args: Vec<Value>,
    pub payments: Vec<Payment>,
}

/// Executes one callable of the dApp at `target`: moves payments, evaluates the body,
/// folds the returned actions into the overlay. Returns the callable's return value and
/// the observable result record.
pub(crate) fn invoke_callable<B: Blockchain>(
    state: &mut InvokeState<'_, B>,
    target: Address,
    invocation: CallableInvocation,
) -> Result<(Value, InvokeScriptResult), ValidationError> {
    state.call_stack.push(target);
    state.depth += 1;
    let outcome = invoke_callable_inner(state, target, invocation);
    state.depth -= 1;
    state.call_stack.pop();
    outcome
}

fn invoke_callable_inner<B: Blockchain>(
    state: &mut InvokeState<'_, B>,
    target: Address,
    invocation: CallableInvocation,
) -> Result<(Value, InvokeScriptResult), ValidationError> {
    let script_info = state.view().account_script(&target).ok_or_else(|| {
        ValidationError::Reject(RejectError::GenericError(format!("No script at address {}", target)))
    })?;
    let dapp_public_key = script_info.public_key;
    let version = script_info.script.version;
    let dapp = script_info
        .script
        .as_dapp()
        .ok_or_else(|| {
            ValidationError::Reject(RejectError::GenericError(
                "Trying to call a dApp function on an account with an expression script".to_owned(),
            ))
        })?
        .clone();
    let callable = dapp
        .callable(&invocation.function)
        .ok_or_else(|| {
            ValidationError::Reject(RejectError::GenericError(format!(
                "Callable function '{}' not found",
                invocation.function
            )))
        })?
        .clone();
    if callable.args.len() != invocation.args.len() {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Callable function '{}' takes {} args, {} given",
            invocation.function,
            callable.args.len(),
            invocation.args.len()
        ))));
    }

    apply_payments(state, &invocation, target, version)?;

    let invocation_object = Value::case(
        "Invocation",
        vec![
            ("caller".into(), address_value(&invocation.caller)),
            (
                "callerPublicKey".into(),
                Value::Bytes(ByteStr::from(invocation.caller_public_key)),
            ),
            ("payments".into(), payments_value(&invocation.payments)),
            ("transactionId".into(), Value::Bytes(state.tx.id.clone())),
            ("fee".into(), Value::Long(state.tx.fee)),
            ("feeAssetId".into(), asset_value(&state.tx.fee_asset)),
        ],
    );

    let mut ctx = EvaluationContext::new(version, state.lang_config)
        .with_chain_id(state.tx.chain_id)
        .with_binding(callable.invocation_param.clone(), invocation_object)
        .with_binding("height", Value::Long(state.height as i64))
        .with_binding("this", address_value(&target))
        .with_binding(
            crate::lang::context::INVOCATION_TX_ID_BINDING,
            Value::Bytes(state.tx.id.clone()),
        )
        .with_user_functions(dapp.user_functions.iter().cloned());
    for (parameter, value) in callable.args.iter().zip(invocation.args.iter()) {
        ctx.bindings.insert(parameter.clone(), value.clone());
    }

    let budget = state.budget_remaining(version);
    let spent_before = state.total_spent;
    let evaluation = if version.supports_sync_calls() {
        let mut dispatcher = SyncDispatcher {
            state: &mut *state,
            current: target,
            current_public_key: dapp_public_key,
        };
        let mut ctx = ctx.with_dispatcher(&mut dispatcher);
        evaluate(&callable.body, &mut ctx, budget, EvaluationMode::Complete)
    } else {
        evaluate(&callable.body, &mut ctx, budget, EvaluationMode::Complete)
    };

    // nested calls already added their share to the total; add only this frame's own cost
    let nested_spent = state.total_spent - spent_before;
    state.total_spent = state
        .total_spent
        .saturating_add(evaluation.consumed.saturating_sub(nested_spent));
    state.scripts_run += 1;

    let value = match evaluation.result {
        Ok(value) => value,
        Err(ExecutionError::Rejected(reject)) => return Err(ValidationError::Reject(*reject)),
        Err(error) => {
            return Err(ValidationError::Failed(FailedTransactionError::DAppExecution {
                message: error.to_string(),
                spent_complexity: state.total_spent,
                log: evaluation.log,
            }))
        }
    };

    let (actions, return_value) =
        actions_from_result(&value, version, state.tx.chain_id).map_err(|error| {
            ValidationError::Failed(FailedTransactionError::DAppExecution {
                message: error.to_string(),
                spent_complexity: state.total_spent,
                log: evaluation.log.clone(),
            })
        })?;

    let result = fold_actions(state, target, dapp_public_key, version, &actions, &evaluation.log)?;
    Ok((return_value, result))
}

fn apply_payments<B: Blockchain>(
    state: &mut InvokeState<'_, B>,
    invocation: &CallableInvocation,
    target: Address,
    version: crate::lang::StdLibVersion,
) -> Result<(), ValidationError> {
    for payment in &invocation.payments {
        if payment.amount < 0 {
            return Err(ValidationError::Reject(RejectError::NegativeAmount(format!(
                "Negative payment amount = {}",
                payment.amount
            ))));
        }
        if invocation.caller == target
            && state.lang_config.disallow_self_payment
            && version >= crate::lang::StdLibVersion::V4
        {
            return Err(ValidationError::Reject(RejectError::GenericError(
                "DApp self-payment is forbidden since V4".to_owned(),
            )));
        }
        if let AssetId::Issued(_) = payment.asset {
            if state.view().asset_description(&payment.asset).is_none() {
                return Err(ValidationError::Reject(RejectError::UnissuedAsset(payment.asset.clone())));
            }
            verify_asset_script(
                state,
                &payment.asset,
                PseudoTx::Transfer {
                    sender: invocation.caller_public_key,
                    sender_address: invocation.caller,
                    recipient: target,
                    amount: payment.amount,
                    asset: payment.asset.clone(),
                    tx_id: state.tx.id.clone(),
                    timestamp: state.tx.timestamp,
                },
            )?;
        }
        let diff = Diff::of_portfolios([
            (invocation.caller, Portfolio::asset(payment.asset.clone(), -payment.amount)),
            (target, Portfolio::asset(payment.asset.clone(), payment.amount)),
        ])
        .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
        state.absorb(diff)?;
    }
    Ok(())
}

fn payments_value(payments: &[Payment]) -> Value {
    Value::List(
        payments
            .iter()
            .map(|payment| {
                Value::case(
                    "AttachedPayment",
                    vec![
                        ("assetId".into(), asset_value(&payment.asset)),
                        ("amount".into(), Value::Long(payment.amount)),
                    ],
                )
            })
            .collect(),
    )
}

/// Bridges the evaluator's `invoke`/`reentrantInvoke` builtins into [invoke_callable].
pub(crate) struct SyncDispatcher<'s, 'a, B: Blockchain> {
    pub state: &'s mut InvokeState<'a, B>,
    pub current: Address,
    pub current_public_key: PublicKey,
}

impl<B: Blockchain> DAppDispatcher for SyncDispatcher<'_, '_, B> {
    fn dispatch(
        &mut self,
        reentrant: bool,
        dapp: &Value,
        function: &Value,
        args: &Value,
        payments: &Value,
        _budget_remaining: u64,
    ) -> Result<(Value, u64), ExecutionError> {
        let state = &mut *self.state;
        if state.depth >= MAX_SYNC_DEPTH {
            return Err(ExecutionError::Throw(format!(
                "DApp calls limit = {} is exceeded",
                MAX_SYNC_DEPTH
            )));
        }

        let target = match recipient_from(dapp, state.tx.chain_id)? {
            Recipient::Address(address) => address,
            Recipient::Alias(alias) => state
                .view()
                .resolve_alias(&alias)
                .ok_or_else(|| ExecutionError::Rejected(Box::new(RejectError::AliasDoesNotExist(alias))))?,
        };

        if state.call_stack.contains(&target) {
            let allows_reentrancy = state
                .view()
                .account_script(&target)
                .and_then(|info| info.script.as_dapp().map(|dapp| dapp.allow_reentrancy))
                .unwrap_or(false);
            if !(reentrant && allows_reentrancy) {
                return Err(ExecutionError::Rejected(Box::new(RejectError::ReentrancyDisallowed(target))));
            }
        }

        let function_name = function.as_str()?.to_owned();
        let call_args = args.as_list()?.to_vec();
        let call_payments = parse_payments(payments)?;

        let spent_before = state.total_spent;
        let invocation = CallableInvocation {
            caller: self.current,
            caller_public_key: self.current_public_key,
            function: function_name.clone(),
            args: call_args,
            payments: call_payments,
        };
        let (value, _result) = invoke_callable(state, target, invocation).map_err(|error| match error {
            ValidationError::Reject(reject) => ExecutionError::Rejected(Box::new(reject)),
            ValidationError::Failed(failed) => ExecutionError::Throw(failed.to_string()),
        })?;

        state.sync_calls.push(SyncCall {
            dapp: target,
            function: function_name,
        });
        let nested_spent = state.total_spent - spent_before;
        Ok((value, nested_spent))
    }
}

fn parse_payments(value: &Value) -> Result<Vec<Payment>, ExecutionError> {
    value
        .as_list()?
        .iter()
        .map(|item| {
            let object = item.as_case()?;
            let asset = match object.get("assetId") {
                Some(Value::Unit) | None => AssetId::Base,
                Some(Value::Bytes(bytes)) => AssetId::Issued(bytes.clone()),
                Some(other) => {
                    return Err(ExecutionError::TypeMismatch(format!(
                        "expected asset id or unit, got {}",
                        other.type_name()
                    )))
                }
            };
            let amount = object
                .get("amount")
                .ok_or_else(|| ExecutionError::TypeMismatch("payment has no amount".to_owned()))?
                .as_long()?;
            Ok(Payment { amount, asset })
        })
        .collect()
}
