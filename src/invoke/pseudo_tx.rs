/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pseudo-transactions: the synthetic transaction records handed to an asset script when a
//! dApp action touches a scripted asset, plus the case-object renderings of real
//! transactions for verifier scripts.
//!
//! A pseudo-transaction carries the real invocation's id and timestamp so an asset script
//! (and its evaluation log) sees a coherent transaction even though none of this was ever
//! on the wire.

use crate::lang::Value;
use crate::transaction::{Transaction, TransferData};
use crate::types::{Address, AssetId, ByteStr, PublicKey, Recipient};

use super::actions::{address_value, asset_value};

/// Synthetic transaction for one asset-touching action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoTx {
    Transfer {
        sender: PublicKey,
        sender_address: Address,
        recipient: Address,
        amount: i64,
        asset: AssetId,
        tx_id: ByteStr,
        timestamp: u64,
    },
    Reissue {
        sender: PublicKey,
        sender_address: Address,
        asset: AssetId,
        quantity: i64,
        reissuable: bool,
        tx_id: ByteStr,
        timestamp: u64,
    },
    Burn {
        sender: PublicKey,
        sender_address: Address,
        asset: AssetId,
        quantity: i64,
        tx_id: ByteStr,
        timestamp: u64,
    },
    SponsorFee {
        sender: PublicKey,
        sender_address: Address,
        asset: AssetId,
        min_sponsored_fee: i64,
        tx_id: ByteStr,
        timestamp: u64,
    },
}

impl PseudoTx {
    /// The `tx` binding an asset script evaluates against.
    pub fn to_value(&self) -> Value {
        match self {
            PseudoTx::Transfer {
                sender,
                sender_address,
                recipient,
                amount,
                asset,
                tx_id,
                timestamp,
            } => Value::case(
                "TransferTransaction",
                vec![
                    ("senderPublicKey".into(), Value::Bytes(ByteStr::from(*sender))),
                    ("amount".into(), Value::Long(*amount)),
                    ("assetId".into(), asset_value(asset)),
                    ("recipient".into(), address_value(recipient)),
                    ("feeAssetId".into(), Value::Unit),
                    ("fee".into(), Value::Long(0)),
                    ("timestamp".into(), Value::Long(*timestamp as i64)),
                    ("version".into(), Value::Long(0)),
                    ("id".into(), Value::Bytes(tx_id.clone())),
                    ("sender".into(), address_value(sender_address)),
                    ("bodyBytes".into(), Value::Bytes(ByteStr::default())),
                    ("proofs".into(), Value::List(vec![])),
                ],
            ),
            PseudoTx::Reissue {
                sender,
                sender_address,
                asset,
                quantity,
                reissuable,
                tx_id,
                timestamp,
            } => Value::case(
                "ReissueTransaction",
                vec![
                    ("senderPublicKey".into(), Value::Bytes(ByteStr::from(*sender))),
                    ("assetId".into(), asset_value(asset)),
                    ("quantity".into(), Value::Long(*quantity)),
                    ("reissuable".into(), Value::Bool(*reissuable)),
                    ("timestamp".into(), Value::Long(*timestamp as i64)),
                    ("id".into(), Value::Bytes(tx_id.clone())),
                    ("sender".into(), address_value(sender_address)),
                ],
            ),
            PseudoTx::Burn {
                sender,
                sender_address,
                asset,
                quantity,
                tx_id,
                timestamp,
            } => Value::case(
                "BurnTransaction",
                vec![
                    ("senderPublicKey".into(), Value::Bytes(ByteStr::from(*sender))),
                    ("assetId".into(), asset_value(asset)),
                    ("quantity".into(), Value::Long(*quantity)),
                    ("timestamp".into(), Value::Long(*timestamp as i64)),
                    ("id".into(), Value::Bytes(tx_id.clone())),
                    ("sender".into(), address_value(sender_address)),
                ],
            ),
            PseudoTx::SponsorFee {
                sender,
                sender_address,
                asset,
                min_sponsored_fee,
                tx_id,
                timestamp,
            } => Value::case(
                "SponsorFeeTransaction",
                vec![
                    ("senderPublicKey".into(), Value::Bytes(ByteStr::from(*sender))),
                    ("assetId".into(), asset_value(asset)),
                    (
                        "minSponsoredAssetFee".into(),
                        if *min_sponsored_fee == 0 {
                            Value::Unit
                        } else {
                            Value::Long(*min_sponsored_fee)
                        },
                    ),
                    ("timestamp".into(), Value::Long(*timestamp as i64)),
                    ("id".into(), Value::Bytes(tx_id.clone())),
                    ("sender".into(), address_value(sender_address)),
                ],
            ),
        }
    }
}

/// The `tx` binding of a verifier script for a real transfer transaction. Field order is
/// protocol surface: the rendering of this object appears verbatim in evaluation logs.
pub fn transfer_transaction_value(tx: &Transaction, data: &TransferData) -> Value {
    let recipient = match &data.recipient {
        Recipient::Address(address) => address_value(address),
        Recipient::Alias(alias) => Value::case(
            "Alias",
            vec![("alias".into(), Value::Str(alias.name().to_owned()))],
        ),
    };
    Value::case(
        "TransferTransaction",
        vec![
            ("senderPublicKey".into(), Value::Bytes(ByteStr::from(tx.sender))),
            ("amount".into(), Value::Long(data.amount)),
            ("assetId".into(), asset_value(&data.asset)),
            ("recipient".into(), recipient),
            ("feeAssetId".into(), asset_value(&tx.fee_asset)),
            ("fee".into(), Value::Long(tx.fee)),
            ("timestamp".into(), Value::Long(tx.timestamp as i64)),
            ("version".into(), Value::Long(tx.version as i64)),
            ("id".into(), Value::Bytes(tx.id.clone())),
            ("sender".into(), address_value(&tx.sender_address())),
            (
                "bodyBytes".into(),
                Value::Bytes(ByteStr::from(tx.body_bytes())),
            ),
            (
                "proofs".into(),
                Value::List(tx.proofs.iter().map(|proof| Value::Bytes(proof.clone())).collect()),
            ),
        ],
    )
}

/// The `tx` binding of a verifier script for any real transaction. Transfers get the full
/// protocol rendering; other kinds expose the envelope fields under their kind name.
pub fn transaction_value(tx: &Transaction) -> Value {
    use crate::transaction::TransactionData;

    if let TransactionData::Transfer(data) = &tx.data {
        return transfer_transaction_value(tx, data);
    }
    let type_name = match &tx.data {
        TransactionData::Issue(_) => "IssueTransaction",
        TransactionData::Transfer(_) => unreachable!(),
        TransactionData::Reissue(_) => "ReissueTransaction",
        TransactionData::Burn(_) => "BurnTransaction",
        TransactionData::Lease(_) => "LeaseTransaction",
        TransactionData::LeaseCancel(_) => "LeaseCancelTransaction",
        TransactionData::CreateAlias(_) => "CreateAliasTransaction",
        TransactionData::Data(_) => "DataTransaction",
        TransactionData::SetScript(_) => "SetScriptTransaction",
        TransactionData::SponsorFee(_) => "SponsorFeeTransaction",
        TransactionData::SetAssetScript(_) => "SetAssetScriptTransaction",
        TransactionData::InvokeScript(_) => "InvokeScriptTransaction",
    };
    Value::case(
        type_name,
        vec![
            ("senderPublicKey".into(), Value::Bytes(ByteStr::from(tx.sender))),
            ("feeAssetId".into(), asset_value(&tx.fee_asset)),
            ("fee".into(), Value::Long(tx.fee)),
            ("timestamp".into(), Value::Long(tx.timestamp as i64)),
            ("version".into(), Value::Long(tx.version as i64)),
            ("id".into(), Value::Bytes(tx.id.clone())),
            ("sender".into(), address_value(&tx.sender_address())),
            (
                "bodyBytes".into(),
                Value::Bytes(ByteStr::from(tx.body_bytes())),
            ),
            (
                "proofs".into(),
                Value::List(tx.proofs.iter().map(|proof| Value::Bytes(proof.clone())).collect()),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionData;

    #[test]
    fn transfer_rendering_has_protocol_field_order() {
        let recipient = Address::from_public_key(b'T', &[2u8; 32]);
        let data = TransferData {
            recipient: Recipient::Address(recipient),
            asset: AssetId::Base,
            amount: 7,
            attachment: ByteStr::default(),
        };
        let tx = Transaction::new(
            b'T',
            [1u8; 32],
            100_000,
            AssetId::Base,
            1_000,
            2,
            TransactionData::Transfer(data.clone()),
            vec![],
        );
        let rendered = transfer_transaction_value(&tx, &data).to_string();
        assert!(rendered.starts_with("TransferTransaction(senderPublicKey = base58'"));
        let amount_at = rendered.find("amount = 7").unwrap();
        let asset_at = rendered.find("assetId = Unit").unwrap();
        let recipient_at = rendered.find("recipient = Address(").unwrap();
        assert!(amount_at < asset_at && asset_at < recipient_at);
    }
}
