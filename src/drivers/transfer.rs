/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transfer driver.

use crate::blockchain::Blockchain;
use crate::diff::{Diff, Portfolio};
use crate::error::{RejectError, ValidationError};
use crate::transaction::TransferData;
use crate::types::{Address, AssetId, Recipient};

use super::DriverContext;

pub(crate) fn transfer_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &TransferData,
) -> Result<Diff, ValidationError> {
    let sender = ctx.sender_address();

    if data.amount <= 0 {
        return Err(ValidationError::Reject(RejectError::NonPositiveAmount {
            amount: data.amount,
            of: "transfer".to_owned(),
        }));
    }

    let recipient = resolve_recipient(ctx, &data.recipient)?;

    if let AssetId::Issued(_) = &data.asset {
        if ctx.blockchain.asset_description(&data.asset).is_none() {
            return Err(ValidationError::Reject(RejectError::UnissuedAsset(data.asset.clone())));
        }
    }

    // sponsored fees cannot be paid in a scripted asset
    if let AssetId::Issued(_) = &ctx.tx.fee_asset {
        if ctx.blockchain.asset_script(&ctx.tx.fee_asset).is_some() {
            return Err(ValidationError::Reject(RejectError::GenericError(
                "Smart assets can't participate in sponsored fees".to_owned(),
            )));
        }
    }

    // historical fee-plus-amount overflow check, retired with dApp activation
    if ctx.height < ctx.activation.ride4dapps && data.asset == ctx.tx.fee_asset {
        data.amount
            .checked_add(ctx.tx.fee)
            .ok_or(ValidationError::Reject(RejectError::OverflowError))?;
    }

    let spendable = ctx.blockchain.balance(&sender, &data.asset);
    let required = if data.asset == ctx.tx.fee_asset {
        data.amount.saturating_add(ctx.tx.fee)
    } else {
        data.amount
    };
    if spendable < required {
        return Err(ValidationError::Reject(RejectError::AccountBalanceError(format!(
            "attempt to transfer unavailable funds: balance of {} is {}, required {}",
            data.asset, spendable, required
        ))));
    }

    Diff::of_portfolios([
        (sender, Portfolio::asset(data.asset.clone(), -data.amount)),
        (recipient, Portfolio::asset(data.asset.clone(), data.amount)),
    ])
    .map_err(|_| ValidationError::Reject(RejectError::OverflowError))
}

pub(crate) fn resolve_recipient<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    recipient: &Recipient,
) -> Result<Address, ValidationError> {
    match recipient {
        Recipient::Address(address) => Ok(*address),
        Recipient::Alias(alias) => ctx
            .blockchain
            .resolve_alias(alias)
            .ok_or_else(|| ValidationError::Reject(RejectError::AliasDoesNotExist(alias.clone()))),
    }
}
