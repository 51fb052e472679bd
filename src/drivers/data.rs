/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Data-transaction driver.

use std::collections::BTreeSet;

use crate::blockchain::Blockchain;
use crate::diff::Diff;
use crate::error::{RejectError, ValidationError};
use crate::limits::{DATA_TX_MAX_BYTES, DATA_TX_MAX_PROTO_BYTES, MAX_ENTRY_COUNT};
use crate::transaction::DataTxData;

use super::DriverContext;

// key size caps follow the transaction version the way the script-action caps follow the
// standard-library version
const KEY_SIZE_V1: usize = 100;
const KEY_SIZE_V2: usize = 400;

pub(crate) fn data_diff<B: Blockchain>(
    ctx: &DriverContext<'_, B>,
    data: &DataTxData,
) -> Result<Diff, ValidationError> {
    if data.entries.len() > MAX_ENTRY_COUNT {
        return Err(ValidationError::Reject(RejectError::GenericError(format!(
            "Data transaction can't contain more than {} entries",
            MAX_ENTRY_COUNT
        ))));
    }

    let modern = ctx.tx.version >= 2;
    let max_key = if modern { KEY_SIZE_V2 } else { KEY_SIZE_V1 };
    let max_bytes = if modern { DATA_TX_MAX_PROTO_BYTES } else { DATA_TX_MAX_BYTES };

    let mut keys = BTreeSet::new();
    let mut total_bytes = 0usize;
    for entry in &data.entries {
        if entry.key.is_empty() && modern {
            return Err(ValidationError::Reject(RejectError::GenericError(
                "Empty keys aren't allowed".to_owned(),
            )));
        }
        if entry.key.len() > max_key {
            return Err(ValidationError::Reject(RejectError::WriteSetTooLarge(format!(
                "Key size = {} bytes exceeds {}",
                entry.key.len(),
                max_key
            ))));
        }
        if !keys.insert(&entry.key) {
            return Err(ValidationError::Reject(RejectError::GenericError(format!(
                "Duplicate keys found: {}",
                entry.key
            ))));
        }
        total_bytes += entry.payload_len();
    }
    if total_bytes > max_bytes {
        return Err(ValidationError::Reject(RejectError::WriteSetTooLarge(format!(
            "Data transaction size = {} bytes exceeds {}",
            total_bytes, max_bytes
        ))));
    }

    Ok(Diff::of_data(ctx.sender_address(), data.entries.iter().cloned()))
}
