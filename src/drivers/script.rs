/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Set-script and set-asset-script drivers. Setting an account script estimates all
//! callables with the current estimator and stores the result next to any estimates older
//! estimator versions produced, so re-estimation never happens on chain.

use std::collections::BTreeMap;

use crate::blockchain::Blockchain;
use crate::diff::{AccountScriptInfo, AssetScriptInfo, Diff};
use crate::error::{RejectError, ValidationError};
use crate::lang::estimator::{estimate, estimate_dapp, ESTIMATOR_VERSION};
use crate::lang::ScriptContent;
use crate::transaction::{SetAssetScriptData, SetScriptData};
use crate::types::Address;

use super::DriverContext;

pub(crate) fn set_script_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &SetScriptData,
) -> Result<Diff, ValidationError> {
    let sender = ctx.sender_address();
    let info = match &data.script {
        None => None,
        Some(script) => {
            let complexities = match &script.content {
                ScriptContent::DApp(dapp) => estimate_dapp(dapp, script.version),
                ScriptContent::Expression(expression) => {
                    estimate(expression, script.version, &BTreeMap::new())
                        .map(|complexity| BTreeMap::from([("verifier".to_owned(), complexity)]))
                }
            }
            .map_err(|message| ValidationError::Reject(RejectError::GenericError(message)))?;

            let mut by_estimator = ctx
                .blockchain
                .account_script(&sender)
                .map(|existing| existing.complexities_by_estimator)
                .unwrap_or_default();
            by_estimator.insert(ESTIMATOR_VERSION, complexities);

            Some(AccountScriptInfo {
                public_key: ctx.tx.sender,
                script: script.clone(),
                complexities_by_estimator: by_estimator,
            })
        }
    };
    Ok(Diff {
        scripts: [(sender, info)].into(),
        ..Default::default()
    })
}

pub(crate) fn set_asset_script_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &SetAssetScriptData,
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
    if description.script.is_none() {
        return Err(ValidationError::Reject(RejectError::GenericError(
            "Cannot set script on an asset issued without a script".to_owned(),
        )));
    }
    let info = data.script.as_ref().map(|(script, complexity)| AssetScriptInfo {
        script: script.clone(),
        complexity: *complexity,
    });
    Ok(Diff {
        asset_scripts: [(data.asset.clone(), info)].into(),
        ..Default::default()
    })
}
