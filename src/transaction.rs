/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transaction kinds accepted by the engine, their canonical byte form and their ids.
//!
//! A [Transaction] is the common envelope (sender, fee, timestamp, proofs) around one
//! [TransactionData] body. The id is `blake2b256` of the canonical borsh serialization of the
//! envelope without proofs, so ids are stable across nodes and usable as inputs to deterministic
//! derivations (issued asset ids, lease ids).

use borsh::BorshSerialize;

use crate::types::{blake2b256, Address, Alias, AssetId, ByteStr, DataEntry, PublicKey, Recipient};

/// Attached payment of an invoke-script transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct Payment {
    pub amount: i64,
    pub asset: AssetId,
}

/// Argument of a callable, as carried on the wire. Converted into an evaluator value
/// by the invoke driver.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum InvokeArg {
    Int(i64),
    Bool(bool),
    Binary(ByteStr),
    Str(String),
    List(Vec<InvokeArg>),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct IssueData {
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub decimals: u8,
    pub reissuable: bool,
    /// Asset script, pre-compiled, with its statically estimated complexity.
    pub script: Option<(crate::lang::Script, u64)>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct TransferData {
    pub recipient: Recipient,
    pub asset: AssetId,
    pub amount: i64,
    pub attachment: ByteStr,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct ReissueData {
    pub asset: AssetId,
    pub quantity: i64,
    pub reissuable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct BurnData {
    pub asset: AssetId,
    pub quantity: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct LeaseData {
    pub recipient: Recipient,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct LeaseCancelData {
    pub lease_id: ByteStr,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct CreateAliasData {
    pub alias: Alias,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct DataTxData {
    pub entries: Vec<DataEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct SetScriptData {
    /// `None` removes the account script.
    pub script: Option<crate::lang::Script>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct SponsorFeeData {
    pub asset: AssetId,
    /// Units of the asset declared equivalent to one `FEE_UNIT` of base fee.
    /// Zero cancels sponsorship.
    pub min_sponsored_fee: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct SetAssetScriptData {
    pub asset: AssetId,
    pub script: Option<(crate::lang::Script, u64)>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct InvokeScriptData {
    pub dapp: Recipient,
    pub function: String,
    pub args: Vec<InvokeArg>,
    pub payments: Vec<Payment>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum TransactionData {
    Issue(IssueData),
    Transfer(TransferData),
    Reissue(ReissueData),
    Burn(BurnData),
    Lease(LeaseData),
    LeaseCancel(LeaseCancelData),
    CreateAlias(CreateAliasData),
    Data(DataTxData),
    SetScript(SetScriptData),
    SponsorFee(SponsorFeeData),
    SetAssetScript(SetAssetScriptData),
    InvokeScript(InvokeScriptData),
}

/// A transaction as handed to [Runtime::transition](crate::Runtime::transition).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: ByteStr,
    pub chain_id: u8,
    pub sender: PublicKey,
    pub fee: i64,
    pub fee_asset: AssetId,
    pub timestamp: u64,
    pub version: u8,
    pub proofs: Vec<ByteStr>,
    pub data: TransactionData,
}

#[derive(BorshSerialize)]
struct TransactionBody<'a> {
    chain_id: u8,
    sender: &'a PublicKey,
    fee: i64,
    fee_asset: &'a AssetId,
    timestamp: u64,
    version: u8,
    data: &'a TransactionData,
}

impl Transaction {
    pub fn new(
        chain_id: u8,
        sender: PublicKey,
        fee: i64,
        fee_asset: AssetId,
        timestamp: u64,
        version: u8,
        data: TransactionData,
        proofs: Vec<ByteStr>,
    ) -> Self {
        let mut tx = Self {
            id: ByteStr::default(),
            chain_id,
            sender,
            fee,
            fee_asset,
            timestamp,
            version,
            proofs,
            data,
        };
        tx.id = ByteStr::from(blake2b256(&tx.body_bytes()));
        tx
    }

    /// Canonical byte form, proofs excluded. Input of the id hash and of signature checks.
    pub fn body_bytes(&self) -> Vec<u8> {
        let body = TransactionBody {
            chain_id: self.chain_id,
            sender: &self.sender,
            fee: self.fee,
            fee_asset: &self.fee_asset,
            timestamp: self.timestamp,
            version: self.version,
            data: &self.data,
        };
        borsh::to_vec(&body).expect("serialization into memory never fails")
    }

    pub fn sender_address(&self) -> Address {
        Address::from_public_key(self.chain_id, &self.sender)
    }

    /// Checks the first proof as an ed25519 signature of the body by the sender key.
    pub fn verify_signature(&self) -> bool {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let Some(proof) = self.proofs.first() else {
            return false;
        };
        let Ok(signature_bytes) = <[u8; 64]>::try_from(proof.as_bytes()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.sender) else {
            return false;
        };
        verifying_key
            .verify(&self.body_bytes(), &Signature::from_bytes(&signature_bytes))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_tx(amount: i64) -> Transaction {
        Transaction::new(
            b'T',
            [1u8; 32],
            100_000,
            AssetId::Base,
            1_600_000_000_000,
            2,
            TransactionData::Transfer(TransferData {
                recipient: Recipient::Address(Address::from_public_key(b'T', &[2u8; 32])),
                asset: AssetId::Base,
                amount,
                attachment: ByteStr::default(),
            }),
            vec![],
        )
    }

    #[test]
    fn id_is_stable_and_body_sensitive() {
        let a = transfer_tx(10);
        let b = transfer_tx(10);
        let c = transfer_tx(11);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), crate::types::TX_ID_LENGTH);
    }

    #[test]
    fn proofs_do_not_change_the_id() {
        let mut a = transfer_tx(10);
        let b = transfer_tx(10);
        a.proofs.push(ByteStr::from(vec![0u8; 64]));
        assert_eq!(a.body_bytes(), b.body_bytes());
    }
}
