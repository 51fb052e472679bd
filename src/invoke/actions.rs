/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Callable actions: what a dApp entry point returns, and the conversion from the
//! evaluator's case objects into typed actions.
//!
//! Deterministic id derivation for issued assets and leases also lives here; both are pure
//! functions of the invocation transaction id and the action's own fields.

use crate::error::ExecutionError;
use crate::lang::{CaseObject, StdLibVersion, Value};
use crate::types::{blake2b256, Address, Alias, AssetId, ByteStr, DataEntry, DataValue, Recipient};

/// One element of the ordered list a callable returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallableAction {
    Transfer {
        recipient: Recipient,
        amount: i64,
        asset: AssetId,
    },
    DataOp(DataEntry),
    Issue {
        name: String,
        description: String,
        quantity: i64,
        decimals: u8,
        reissuable: bool,
        nonce: u64,
    },
    Reissue {
        asset: AssetId,
        quantity: i64,
        reissuable: bool,
    },
    Burn {
        asset: AssetId,
        quantity: i64,
    },
    SponsorFee {
        asset: AssetId,
        min_sponsored_fee: i64,
    },
    Lease {
        recipient: Recipient,
        amount: i64,
        nonce: u32,
    },
    LeaseCancel {
        lease_id: ByteStr,
    },
}

impl CallableAction {
    /// Data writes are counted against the write-set limits, everything else against the
    /// callable-action limit.
    pub fn is_data_op(&self) -> bool {
        matches!(self, CallableAction::DataOp(_))
    }
}

/// Id of an asset issued by an invocation: a hash of the invocation id, the action's index
/// in the returned list and the issue parameters.
pub fn issued_asset_id(
    tx_id: &ByteStr,
    action_index: u32,
    name: &str,
    description: &str,
    decimals: u8,
    reissuable: bool,
    nonce: u64,
) -> ByteStr {
    let mut input = Vec::with_capacity(tx_id.len() + name.len() + description.len() + 14);
    input.extend_from_slice(tx_id.as_bytes());
    input.extend_from_slice(&action_index.to_be_bytes());
    input.extend_from_slice(name.as_bytes());
    input.extend_from_slice(description.as_bytes());
    input.push(decimals);
    input.push(reissuable as u8);
    input.extend_from_slice(&nonce.to_be_bytes());
    ByteStr::from(blake2b256(&input).to_vec())
}

/// Id of a lease opened by an invocation. Byte order is protocol: little-endian nonce,
/// big-endian amount.
pub fn lease_id(tx_id: &ByteStr, nonce: u32, recipient: &Recipient, amount: i64) -> ByteStr {
    let recipient_bytes = recipient.to_id_bytes();
    let mut input = Vec::with_capacity(tx_id.len() + recipient_bytes.len() + 12);
    input.extend_from_slice(tx_id.as_bytes());
    input.extend_from_slice(&nonce.to_le_bytes());
    input.extend_from_slice(&recipient_bytes);
    input.extend_from_slice(&amount.to_be_bytes());
    ByteStr::from(blake2b256(&input).to_vec())
}

/// Splits a callable's evaluated result into its action list and the value returned to a
/// synchronous caller. A bare list returns `Unit`; a two-element tuple carries the return
/// value in its second slot (V5 scripts only).
pub fn actions_from_result(
    value: &Value,
    version: StdLibVersion,
    chain_id: u8,
) -> Result<(Vec<CallableAction>, Value), ExecutionError> {
    match value {
        Value::List(items) => Ok((actions_from_list(items, chain_id)?, Value::Unit)),
        Value::Tuple(slots) if slots.len() == 2 && version >= StdLibVersion::V5 => {
            let actions = actions_from_list(slots[0].as_list()?, chain_id)?;
            Ok((actions, slots[1].clone()))
        }
        other => Err(ExecutionError::TypeMismatch(format!(
            "callable must return a list of actions, got {}",
            other.type_name()
        ))),
    }
}

fn actions_from_list(items: &[Value], chain_id: u8) -> Result<Vec<CallableAction>, ExecutionError> {
    items.iter().map(|item| action_from_value(item, chain_id)).collect()
}

fn action_from_value(value: &Value, chain_id: u8) -> Result<CallableAction, ExecutionError> {
    let object = value.as_case()?;
    match object.type_name.as_str() {
        "ScriptTransfer" => Ok(CallableAction::Transfer {
            recipient: recipient_from(field(object, "recipient")?, chain_id)?,
            amount: field(object, "amount")?.as_long()?,
            asset: asset_from(field(object, "asset")?)?,
        }),
        "IntegerEntry" => data_entry(object, |value| Ok(DataValue::Int(value.as_long()?))),
        "BooleanEntry" => data_entry(object, |value| Ok(DataValue::Bool(value.as_bool()?))),
        "BinaryEntry" => data_entry(object, |value| Ok(DataValue::Binary(value.as_bytes()?.clone()))),
        "StringEntry" => data_entry(object, |value| Ok(DataValue::Str(value.as_str()?.to_owned()))),
        "DeleteEntry" => Ok(CallableAction::DataOp(DataEntry {
            key: field(object, "key")?.as_str()?.to_owned(),
            value: DataValue::Empty,
        })),
        "Issue" => Ok(CallableAction::Issue {
            name: field(object, "name")?.as_str()?.to_owned(),
            description: field(object, "description")?.as_str()?.to_owned(),
            quantity: field(object, "quantity")?.as_long()?,
            decimals: u8::try_from(field(object, "decimals")?.as_long()?)
                .map_err(|_| ExecutionError::TypeMismatch("decimals out of range".to_owned()))?,
            reissuable: field(object, "isReissuable")?.as_bool()?,
            nonce: field(object, "nonce")?.as_long()? as u64,
        }),
        "Reissue" => Ok(CallableAction::Reissue {
            asset: issued_from(field(object, "assetId")?)?,
            quantity: field(object, "quantity")?.as_long()?,
            reissuable: field(object, "isReissuable")?.as_bool()?,
        }),
        "Burn" => Ok(CallableAction::Burn {
            asset: issued_from(field(object, "assetId")?)?,
            quantity: field(object, "quantity")?.as_long()?,
        }),
        "SponsorFee" => {
            let rate = match field(object, "minSponsoredAssetFee")? {
                Value::Unit => 0,
                value => value.as_long()?,
            };
            Ok(CallableAction::SponsorFee {
                asset: issued_from(field(object, "assetId")?)?,
                min_sponsored_fee: rate,
            })
        }
        "Lease" => Ok(CallableAction::Lease {
            recipient: recipient_from(field(object, "recipient")?, chain_id)?,
            amount: field(object, "amount")?.as_long()?,
            nonce: u32::try_from(field(object, "nonce")?.as_long()?)
                .map_err(|_| ExecutionError::TypeMismatch("lease nonce out of range".to_owned()))?,
        }),
        "LeaseCancel" => Ok(CallableAction::LeaseCancel {
            lease_id: field(object, "leaseId")?.as_bytes()?.clone(),
        }),
        other => Err(ExecutionError::TypeMismatch(format!(
            "{} is not a callable action",
            other
        ))),
    }
}

fn data_entry(
    object: &CaseObject,
    convert: impl FnOnce(&Value) -> Result<DataValue, ExecutionError>,
) -> Result<CallableAction, ExecutionError> {
    Ok(CallableAction::DataOp(DataEntry {
        key: field(object, "key")?.as_str()?.to_owned(),
        value: convert(field(object, "value")?)?,
    }))
}

fn field<'v>(object: &'v CaseObject, name: &str) -> Result<&'v Value, ExecutionError> {
    object.get(name).ok_or_else(|| {
        ExecutionError::TypeMismatch(format!("{} has no field {}", object.type_name, name))
    })
}

/// Accepts the script-level renderings of a destination: an `Address` or `Alias` case object.
pub fn recipient_from(value: &Value, chain_id: u8) -> Result<Recipient, ExecutionError> {
    let object = value.as_case()?;
    match object.type_name.as_str() {
        "Address" => {
            let bytes = field(object, "bytes")?.as_bytes()?;
            Address::from_bytes(bytes.as_bytes())
                .map(Recipient::Address)
                .map_err(|error| ExecutionError::TypeMismatch(error.to_string()))
        }
        "Alias" => {
            let name = field(object, "alias")?.as_str()?;
            Alias::new(chain_id, name)
                .map(Recipient::Alias)
                .map_err(|error| ExecutionError::TypeMismatch(error.to_string()))
        }
        other => Err(ExecutionError::TypeMismatch(format!(
            "{} is not an address or alias",
            other
        ))),
    }
}

/// `Unit` means the base asset, bytes mean an issued asset id.
pub fn asset_from(value: &Value) -> Result<AssetId, ExecutionError> {
    match value {
        Value::Unit => Ok(AssetId::Base),
        Value::Bytes(bytes) => Ok(AssetId::Issued(bytes.clone())),
        other => Err(ExecutionError::TypeMismatch(format!(
            "expected asset id or unit, got {}",
            other.type_name()
        ))),
    }
}

fn issued_from(value: &Value) -> Result<AssetId, ExecutionError> {
    Ok(AssetId::Issued(value.as_bytes()?.clone()))
}

/// The script-level rendering of an address.
pub fn address_value(address: &Address) -> Value {
    Value::case(
        "Address",
        vec![("bytes".to_owned(), Value::Bytes(ByteStr::from(address.as_bytes())))],
    )
}

/// The script-level rendering of an asset id.
pub fn asset_value(asset: &AssetId) -> Value {
    match asset {
        AssetId::Base => Value::Unit,
        AssetId::Issued(id) => Value::Bytes(id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_id_byte_layout() {
        let tx_id = ByteStr::from(vec![7u8; 32]);
        let recipient = Recipient::Address(Address::from_public_key(b'T', &[2u8; 32]));
        let amount = 10_000_00000000_i64;

        let id = lease_id(&tx_id, 0, &recipient, amount);

        let mut expected = Vec::new();
        expected.extend_from_slice(tx_id.as_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&recipient.to_id_bytes());
        expected.extend_from_slice(&amount.to_be_bytes());
        assert_eq!(id.as_bytes(), blake2b256(&expected));
    }

    #[test]
    fn script_transfer_converts() {
        let recipient = Address::from_public_key(b'T', &[2u8; 32]);
        let value = Value::case(
            "ScriptTransfer",
            vec![
                ("recipient".into(), address_value(&recipient)),
                ("amount".into(), Value::Long(5)),
                ("asset".into(), Value::Unit),
            ],
        );
        let action = action_from_value(&value, b'T').unwrap();
        assert_eq!(
            action,
            CallableAction::Transfer {
                recipient: Recipient::Address(recipient),
                amount: 5,
                asset: AssetId::Base,
            }
        );
    }

    #[test]
    fn tuple_results_carry_a_return_value() {
        let result = Value::Tuple(vec![Value::List(vec![]), Value::Long(17)]);
        let (actions, returned) = actions_from_result(&result, StdLibVersion::V5, b'T').unwrap();
        assert!(actions.is_empty());
        assert_eq!(returned, Value::Long(17));
    }

    #[test]
    fn non_action_objects_are_type_errors() {
        let bogus = Value::case("Rainbow", vec![]);
        assert!(matches!(
            action_from_value(&bogus, b'T'),
            Err(ExecutionError::TypeMismatch(_))
        ));
    }
}
