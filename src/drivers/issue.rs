/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Issue, reissue and burn drivers. An asset issued by a plain transaction uses the
//! transaction id as its asset id.

use crate::blockchain::Blockchain;
use crate::diff::{
    AssetInfoUpdate, AssetScriptInfo, AssetStaticInfo, AssetUpdate, AssetVolumeUpdate, Diff, Portfolio,
};
use crate::error::{RejectError, ValidationError};
use crate::transaction::{BurnData, IssueData, ReissueData};
use crate::types::{Address, AssetId};

use super::DriverContext;

const MIN_NAME_LENGTH: usize = 4;
const MAX_NAME_LENGTH: usize = 16;
const MAX_DESCRIPTION_LENGTH: usize = 1000;
const MAX_DECIMALS: u8 = 8;

pub(crate) fn issue_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &IssueData,
) -> Result<Diff, ValidationError> {
    if data.name.len() < MIN_NAME_LENGTH || data.name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Asset name length must be between {} and {}",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        ))));
    }
    if data.description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Asset description length exceeds {}",
            MAX_DESCRIPTION_LENGTH
        ))));
    }
    if data.decimals > MAX_DECIMALS {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Invalid decimals = {}",
            data.decimals
        ))));
    }
    if data.quantity <= 0 {
        return Err(ValidationError::Reject(RejectError::NonPositiveAmount {
            amount: data.quantity,
            of: "issue".to_owned(),
        }));
    }

    let asset = AssetId::Issued(ctx.tx.id.clone());
    let nft = data.quantity == 1 && data.decimals == 0 && !data.reissuable;
    let mut diff = Diff {
        issued_assets: [(
            asset.clone(),
            (
                AssetStaticInfo {
                    origin_tx: ctx.tx.id.clone(),
                    issuer: ctx.tx.sender,
                    decimals: data.decimals,
                    nft,
                },
                AssetInfoUpdate {
                    name: data.name.clone(),
                    description: data.description.clone(),
                    last_updated_height: ctx.height,
                },
                AssetVolumeUpdate {
                    reissuable: data.reissuable,
                    volume: data.quantity as i128,
                },
            ),
        )]
        .into(),
        ..Default::default()
    };
    if let Some((script, complexity)) = &data.script {
        diff.asset_scripts.insert(
            asset.clone(),
            Some(AssetScriptInfo {
                script: script.clone(),
                complexity: *complexity,
            }),
        );
    }
    diff.combine(Diff::of_portfolio(
        ctx.sender_address(),
        Portfolio::asset(asset, data.quantity),
    ))
    .map_err(|_| ValidationError::Reject(RejectError::OverflowError))
}

pub(crate) fn reissue_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &ReissueData,
) -> Result<Diff, ValidationError> {
    let description = ctx
        .blockchain
        .asset_description(&data.asset)
        .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(data.asset.clone())))?;
    if Address::from_public_key(ctx.tx.chain_id, &description.issuer) != ctx.sender_address() {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Asset was issued by other address".to_owned(),
        )));
    }
    if data.quantity <= 0 {
        return Err(ValidationError::Reject(RejectError::NonPositiveAmount {
            amount: data.quantity,
            of: "reissue".to_owned(),
        }));
    }
    if !description.reissuable {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Asset is not reissuable".to_owned(),
        )));
    }

    let diff = Diff {
        updated_assets: [(
            data.asset.clone(),
            AssetUpdate::Volume(AssetVolumeUpdate {
                reissuable: data.reissuable,
                volume: data.quantity as i128,
            }),
        )]
        .into(),
        ..Default::default()
    };
    diff.combine(Diff::of_portfolio(
        ctx.sender_address(),
        Portfolio::asset(data.asset.clone(), data.quantity),
    ))
    .map_err(|_| ValidationError::Reject(RejectError::OverflowError))
}

pub(crate) fn burn_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &BurnData,
) -> Result<Diff, ValidationError> {
    let sender = ctx.sender_address();
    let description = ctx
        .blockchain
        .asset_description(&data.asset)
        .ok_or_else(|| ValidationError::Reject(RejectError::UnissuedAsset(data.asset.clone())))?;
    if data.quantity <= 0 {
        return Err(ValidationError::Reject(RejectError::NonPositiveAmount {
            amount: data.quantity,
            of: "burn".to_owned(),
        }));
    }
    let balance = ctx.blockchain.balance(&sender, &data.asset);
    if balance < data.quantity {
        return Err(ValidationError::Reject(RejectError::AccountBalanceError(format!(
            "Cannot burn {} of {}: balance is {}",
            data.quantity, data.asset, balance
        ))));
    }

    let diff = Diff {
        updated_assets: [(
            data.asset.clone(),
            AssetUpdate::Volume(AssetVolumeUpdate {
                reissuable: description.reissuable,
                volume: -(data.quantity as i128),
            }),
        )]
        .into(),
        ..Default::default()
    };
    diff.combine(Diff::of_portfolio(
        sender,
        Portfolio::asset(data.asset.clone(), -data.quantity),
    ))
    .map_err(|_| ValidationError::Reject(RejectError::OverflowError))
}
