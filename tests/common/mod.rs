//! Shared fixtures: deterministic keys, a funded in-memory chain, signed transactions and
//! expression-building helpers.

#![allow(dead_code)]

use ed25519_dalek::{Signer, SigningKey};

use waves_runtime::diff::{AccountScriptInfo, AssetDescription};
use waves_runtime::lang::{ids, Callable, DApp, Expression, Script, StdLibVersion};
use waves_runtime::transaction::{
    InvokeArg, InvokeScriptData, Payment, TransactionData, TransferData,
};
use waves_runtime::types::{Address, AssetId, ByteStr, PublicKey, Recipient};
use waves_runtime::{InMemoryBlockchain, Transaction};

pub const CHAIN_ID: u8 = b'T';
pub const BASE_BALANCE: i64 = 10_000_000_000;
pub const INVOKE_FEE: i64 = 500_000;

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn public_key(seed: u8) -> PublicKey {
    signing_key(seed).verifying_key().to_bytes()
}

pub fn address(seed: u8) -> Address {
    Address::from_public_key(CHAIN_ID, &public_key(seed))
}

/// A transaction signed by the account derived from `seed`.
pub fn signed_tx(seed: u8, fee: i64, fee_asset: AssetId, data: TransactionData) -> Transaction {
    let mut tx = Transaction::new(
        CHAIN_ID,
        public_key(seed),
        fee,
        fee_asset,
        1_600_000_000_000,
        2,
        data,
        vec![],
    );
    let signature = signing_key(seed).sign(&tx.body_bytes());
    tx.proofs.push(ByteStr::from(signature.to_bytes().to_vec()));
    tx
}

pub fn transfer_tx(sender_seed: u8, recipient: Address, amount: i64, fee: i64) -> Transaction {
    signed_tx(
        sender_seed,
        fee,
        AssetId::Base,
        TransactionData::Transfer(TransferData {
            recipient: Recipient::Address(recipient),
            asset: AssetId::Base,
            amount,
            attachment: ByteStr::default(),
        }),
    )
}

pub fn invoke_tx(
    sender_seed: u8,
    dapp: Address,
    function: &str,
    args: Vec<InvokeArg>,
    payments: Vec<Payment>,
    fee: i64,
) -> Transaction {
    signed_tx(
        sender_seed,
        fee,
        AssetId::Base,
        TransactionData::InvokeScript(InvokeScriptData {
            dapp: Recipient::Address(dapp),
            function: function.to_owned(),
            args,
            payments,
        }),
    )
}

pub fn chain_with_accounts(height: u32, seeds: &[u8]) -> InMemoryBlockchain {
    let mut chain = InMemoryBlockchain::at_height(height);
    for seed in seeds {
        chain.set_balance(address(*seed), AssetId::Base, BASE_BALANCE);
    }
    chain
}

pub fn install_dapp(chain: &mut InMemoryBlockchain, seed: u8, dapp: DApp) {
    chain.account_scripts.insert(
        address(seed),
        AccountScriptInfo {
            public_key: public_key(seed),
            script: Script::dapp(StdLibVersion::V5, dapp),
            complexities_by_estimator: Default::default(),
        },
    );
}

pub fn install_verifier(chain: &mut InMemoryBlockchain, seed: u8, expression: Expression) {
    chain.account_scripts.insert(
        address(seed),
        AccountScriptInfo {
            public_key: public_key(seed),
            script: Script::expression(StdLibVersion::V5, expression),
            complexities_by_estimator: Default::default(),
        },
    );
}

/// Registers an issued asset and credits the issuer with the whole supply.
pub fn issue_asset(
    chain: &mut InMemoryBlockchain,
    id: [u8; 32],
    issuer_seed: u8,
    quantity: i64,
    reissuable: bool,
) -> AssetId {
    let asset = AssetId::issued(id);
    chain.assets.insert(
        asset.clone(),
        AssetDescription {
            origin_tx: ByteStr::from(id),
            issuer: public_key(issuer_seed),
            name: "coin".to_owned(),
            description: String::new(),
            decimals: 2,
            reissuable,
            total_volume: quantity as u128,
            last_updated_height: 1,
            script: None,
            sponsorship_rate: 0,
            nft: false,
        },
    );
    chain.set_balance(address(issuer_seed), asset.clone(), quantity);
    asset
}

pub fn dapp_with(callables: Vec<Callable>) -> DApp {
    DApp {
        user_functions: vec![],
        callables,
        allow_reentrancy: false,
    }
}

pub fn callable(name: &str, args: &[&str], body: Expression) -> Callable {
    Callable {
        name: name.to_owned(),
        invocation_param: "i".to_owned(),
        args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        body,
    }
}

/// `[a, b, c]` as a cons chain over `nil`.
pub fn list_expr(items: Vec<Expression>) -> Expression {
    items
        .into_iter()
        .rev()
        .fold(Expression::reference("nil"), |tail, head| {
            Expression::native(ids::CREATE_LIST, vec![head, tail])
        })
}

pub fn address_expr(address: &Address) -> Expression {
    Expression::user("Address", vec![Expression::bytes(address.as_bytes())])
}
