/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Lease and lease-cancel drivers. A lease opened by a plain transaction uses the
//! transaction id as its lease id; only invoke-script leases derive ids from nonces.

use crate::blockchain::Blockchain;
use crate::diff::{Diff, LeaseDetails, LeaseStatus, Portfolio};
use crate::error::{RejectError, ValidationError};
use crate::transaction::{LeaseCancelData, LeaseData};
use crate::types::{Address, AssetId};

use super::transfer::resolve_recipient;
use super::DriverContext;

pub(crate) fn lease_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &LeaseData,
) -> Result<Diff, ValidationError> {
    let sender = ctx.sender_address();

    if data.amount <= 0 {
        return Err(ValidationError::Reject(RejectError::NonPositiveAmount {
            amount: data.amount,
            of: "lease".to_owned(),
        }));
    }
    let recipient = resolve_recipient(ctx, &data.recipient)?;
    if recipient == sender {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Cannot lease to self".to_owned(),
        )));
    }

    // can only lease funds not already leased out and not needed for the fee
    let balance = ctx.blockchain.balance(&sender, &AssetId::Base);
    let leased_out = ctx.blockchain.lease_balance(&sender).lease_out;
    let fee = if ctx.tx.fee_asset.is_base() { ctx.tx.fee } else { 0 };
    if balance - leased_out - fee < data.amount {
        return Err(ValidationError::Reject(RejectError::AccountBalanceError(format!(
            "Cannot lease more than own: balance = {}, already leased = {}",
            balance, leased_out
        ))));
    }

    let details = LeaseDetails {
        sender: ctx.tx.sender,
        recipient: data.recipient.clone(),
        amount: data.amount,
        status: LeaseStatus::Active,
        source_tx: ctx.tx.id.clone(),
        height: ctx.height,
    };
    let diff = Diff {
        lease_state: [(ctx.tx.id.clone(), details)].into(),
        ..Default::default()
    };
    let balances = Diff::of_portfolios([
        (sender, Portfolio::lease(0, data.amount)),
        (recipient, Portfolio::lease(data.amount, 0)),
    ])
    .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
    diff.combine(balances)
        .map_err(|_| ValidationError::Reject(RejectError::OverflowError))
}

pub(crate) fn lease_cancel_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &LeaseCancelData,
) -> Result<Diff, ValidationError> {
    let sender = ctx.sender_address();

    let details = ctx.blockchain.lease_details(&data.lease_id).ok_or_else(|| {
        ValidationError::Reject(RejectError::GenericError(format!(
            "Lease with id {} not found",
            data.lease_id
        )))
    })?;
    if !details.is_active() {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Cannot cancel already cancelled lease {}",
            data.lease_id
        ))));
    }
    if Address::from_public_key(ctx.tx.chain_id, &details.sender) != sender {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "LeaseCancel can only be submitted by the lease sender".to_owned(),
        )));
    }
    let recipient = resolve_recipient(ctx, &details.recipient)?;

    let diff = Diff {
        lease_state: [(
            data.lease_id.clone(),
            LeaseDetails {
                status: LeaseStatus::Cancelled {
                    at_height: ctx.height,
                    cancel_tx: ctx.tx.id.clone(),
                },
                ..details.clone()
            },
        )]
        .into(),
        ..Default::default()
    };
    let balances = Diff::of_portfolios([
        (sender, Portfolio::lease(0, -details.amount)),
        (recipient, Portfolio::lease(-details.amount, 0)),
    ])
    .map_err(|_| ValidationError::Reject(RejectError::OverflowError))?;
    diff.combine(balances)
        .map_err(|_| ValidationError::Reject(RejectError::OverflowError))
}
