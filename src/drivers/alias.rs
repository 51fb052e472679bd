/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Alias-creation driver.

use crate::blockchain::Blockchain;
use crate::diff::Diff;
use crate::error::{RejectError, ValidationError};
use crate::transaction::CreateAliasData;

use super::DriverContext;

pub(crate) fn create_alias_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &CreateAliasData,
) -> Result<Diff, ValidationError> {
    if data.alias.chain_id() != ctx.tx.chain_id {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Alias {} belongs to another chain",
            data.alias
        ))));
    }
    if ctx.blockchain.resolve_alias(&data.alias).is_some() {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Alias {} is already taken",
            data.alias
        ))));
    }
    Ok(Diff {
        aliases: [(data.alias.clone(), ctx.sender_address())].into(),
        ..Default::default()
    })
}
