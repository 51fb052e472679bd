/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Invoke-script driver: wires the evaluator, the action interpreter and the fee-step
//! accounting into one `Transaction -> Diff` function.
//!
//! The driver owns the outermost [InvokeState]; everything below it (nested sync calls,
//! asset-script verification) mutates the same overlay, so when control returns here the
//! overlay is the transaction's entire diff except the fee leg. Binding the transaction and
//! computing the affected-address union happen after the action fold, never before.

use crate::blockchain::Blockchain;
use crate::diff::Diff;
use crate::error::{FailedTransactionError, RejectError, TraceStep, ValidationError};
use crate::fees::min_invoke_fee;
use crate::invoke::interpreter::InvokeState;
use crate::invoke::sync::{invoke_callable, CallableInvocation};
use crate::lang::Value;
use crate::transaction::{InvokeArg, InvokeScriptData};
use crate::types::Address;

use super::transfer::resolve_recipient;
use super::{Authorization, DriverContext};

pub(crate) fn invoke_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &InvokeScriptData,
    auth: &Authorization,
    fee_in_base: i64,
    trace: &mut Vec<TraceStep>,
) -> Result<(Diff, u64, Address), ValidationError> {
    if ctx.height < ctx.activation.ride4dapps {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "dApps are not activated yet".to_owned(),
        )));
    }
    let dapp = resolve_recipient(ctx, &data.dapp)?;

    let mut state = InvokeState::new(ctx.blockchain, ctx.tx, ctx.activation, ctx.lang_config);
    let invocation = CallableInvocation {
        caller: ctx.sender_address(),
        caller_public_key: ctx.tx.sender,
        function: data.function.clone(),
        args: data.args.iter().map(value_from_arg).collect(),
        payments: data.payments.clone(),
    };
    let outcome = invoke_callable(&mut state, dapp, invocation);
    trace.append(&mut state.trace);
    let (_, mut result) = outcome?;

    // invoke_callable succeeded, so the dApp script exists; its version prices the steps
    let version = ctx
        .blockchain
        .account_script(&dapp)
        .map(|info| info.script.version)
        .ok_or_else(|| ValidationError::Reject(RejectError::GenericError(format!("No script at address {}", dapp))))?;

    let extra_script_invocations = auth.has_verifier as u32
        + data
            .payments
            .iter()
            .filter(|payment| ctx.blockchain.asset_script(&payment.asset).is_some())
            .count() as u32;
    let min_fee = min_invoke_fee(version, state.total_spent, state.non_nft_issues, extra_script_invocations);
    if fee_in_base < min_fee {
        trace.push(TraceStep::FeeAttributes { min_fee });
        return Err(ValidationError::Failed(FailedTransactionError::FeeForActions {
            message: format!(
                "Fee in {} for InvokeScriptTransaction ({} in base units) with {} invocation steps \
                 does not exceed minimal value of {}",
                ctx.tx.fee_asset,
                fee_in_base,
                crate::fees::invoke_steps(state.total_spent, version),
                min_fee
            ),
            spent_complexity: state.total_spent,
        }));
    }

    result.invokes = state.sync_calls.clone();
    let mut diff = state.overlay;
    diff.scripts_run += state.scripts_run;
    diff.scripts_complexity += state.total_spent;
    diff.script_results.insert(ctx.tx.id.clone(), result);

    Ok((diff, state.total_spent, dapp))
}

fn value_from_arg(arg: &InvokeArg) -> Value {
    match arg {
        InvokeArg::Int(value) => Value::Long(*value),
        InvokeArg::Bool(value) => Value::Bool(*value),
        InvokeArg::Binary(bytes) => Value::Bytes(bytes.clone()),
        InvokeArg::Str(string) => Value::Str(string.clone()),
        InvokeArg::List(items) => Value::List(items.iter().map(value_from_arg).collect()),
    }
}
