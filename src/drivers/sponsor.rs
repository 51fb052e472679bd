/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Sponsor-fee driver.

use crate::blockchain::Blockchain;
use crate::diff::{Diff, Sponsorship};
use crate::error::{RejectError, ValidationError};
use crate::transaction::SponsorFeeData;
use crate::types::Address;

use super::DriverContext;

pub(crate) fn sponsor_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &SponsorFeeData,
) -> Result<Diff, ValidationError> {
    if ctx.height < ctx.activation.sponsorship {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Sponsorship has not been activated yet".to_owned(),
        )));
    }
    let description = ctx
        .blockchain
        .asset_description(&data.asset)
        .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(data.asset.clone())))?;
    if Address::from_public_key(ctx.tx.chain_id, &description.issuer) != ctx.sender_address() {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Asset was issued by other address".to_owned(),
        )));
    }
    if description.script.is_some() {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Sponsorship of smart assets is disabled".to_owned(),
        )));
    }
    if data.min_sponsored_fee < 0 {
        return Err(ValidationError::Reject(RejectError::NegativeAmount(format!(
            "Negative sponsor fee = {}",
            data.min_sponsored_fee
        ))));
    }

    Ok(Diff {
        sponsorship: [(data.asset.clone(), Sponsorship::Value(data.min_sponsored_fee))].into(),
        ..Default::default()
    })
}
