//! End-to-end scenarios: one committed snapshot, one transaction, one diff (or one error),
//! observed through the in-memory chain after applying the diff.

mod common;

use common::*;

use waves_runtime::diff::Sponsorship;
use waves_runtime::error::FailedTransactionError;
use waves_runtime::lang::{ids, Expression};
use waves_runtime::transaction::{DataTxData, InvokeArg, TransactionData};
use waves_runtime::types::{blake2b256, AssetId, ByteStr, DataValue, Recipient};
use waves_runtime::{ActivationHeights, Blockchain, RejectError, Runtime, TraceStep, ValidationError};

const DAPP: u8 = 1;
const INVOKER: u8 = 2;
const RECIPIENT: u8 = 3;

fn legacy_heights() -> ActivationHeights {
    // negative-amount checks not yet active at the test height
    ActivationHeights {
        ride4dapps: 0,
        sponsorship: 0,
        check_total_data_entries_bytes: 0,
        sync_dapp_check_transfers: 1_000_000,
    }
}

fn burn_dapp(asset_id: [u8; 32], quantity: i64) -> waves_runtime::lang::DApp {
    dapp_with(vec![callable(
        "burn",
        &[],
        list_expr(vec![Expression::user(
            "Burn",
            vec![Expression::bytes(asset_id.to_vec()), Expression::long(quantity)],
        )]),
    )])
}

#[test]
fn negative_burn_rejects_since_transfer_checks() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);
    let asset = issue_asset(&mut chain, [9u8; 32], DAPP, 100, true);
    install_dapp(&mut chain, DAPP, burn_dapp([9u8; 32], -1));

    let tx = invoke_tx(INVOKER, address(DAPP), "burn", vec![], vec![], INVOKE_FEE);
    let result = Runtime::new().transition(&chain, &tx);

    match result.diff {
        Err(ValidationError::Reject(RejectError::NegativeAmount(message))) => {
            assert_eq!(message, "Negative burn quantity = -1");
        }
        other => panic!("expected NegativeAmount reject, got {:?}", other),
    }
    // nothing applied: supply and balance untouched
    assert_eq!(chain.balance(&address(DAPP), &asset), 100);
    assert_eq!(chain.asset_description(&asset).unwrap().total_volume, 100);
}

#[test]
fn negative_burn_applies_before_transfer_checks() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);
    let asset = issue_asset(&mut chain, [9u8; 32], DAPP, 100, true);
    install_dapp(&mut chain, DAPP, burn_dapp([9u8; 32], -1));

    let tx = invoke_tx(INVOKER, address(DAPP), "burn", vec![], vec![], INVOKE_FEE);
    let runtime = Runtime::new().with_activation_heights(legacy_heights());
    let result = runtime.transition(&chain, &tx);

    let diff = result.diff.expect("legacy semantics apply the signed quantity");
    let entry = diff.transactions.get(&tx.id).unwrap();
    assert!(entry.applied);

    chain.apply(&diff);
    // burning -1 grows both the balance and the supply by one
    assert_eq!(chain.balance(&address(DAPP), &asset), 101);
    assert_eq!(chain.asset_description(&asset).unwrap().total_volume, 101);
}

#[test]
fn negative_lease_rejects_since_transfer_checks() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);
    install_dapp(
        &mut chain,
        DAPP,
        dapp_with(vec![callable(
            "lease",
            &[],
            list_expr(vec![Expression::user(
                "Lease",
                vec![address_expr(&address(INVOKER)), Expression::long(-1), Expression::long(0)],
            )]),
        )]),
    );

    let tx = invoke_tx(INVOKER, address(DAPP), "lease", vec![], vec![], INVOKE_FEE);
    let result = Runtime::new().transition(&chain, &tx);

    match result.diff {
        Err(ValidationError::Reject(RejectError::NegativeAmount(message))) => {
            assert_eq!(message, "Negative lease amount = -1");
        }
        other => panic!("expected NegativeAmount reject, got {:?}", other),
    }
}

#[test]
fn invoke_fee_shortage_fails_with_min_fee_attribute() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);
    install_dapp(
        &mut chain,
        DAPP,
        dapp_with(vec![callable("noop", &[], Expression::reference("nil"))]),
    );

    let tx = invoke_tx(INVOKER, address(DAPP), "noop", vec![], vec![], INVOKE_FEE - 1);
    let result = Runtime::new().transition(&chain, &tx);

    match result.diff {
        Err(ValidationError::Failed(FailedTransactionError::FeeForActions { message, .. })) => {
            assert!(message.contains("does not exceed minimal value of 500000"), "{}", message);
        }
        other => panic!("expected FeeForActions, got {:?}", other),
    }
    assert!(result
        .trace
        .iter()
        .any(|step| matches!(step, TraceStep::FeeAttributes { min_fee: 500_000 })));
}

#[test]
fn lease_lifecycle_via_invoke_script() {
    let amount: i64 = 10_000 * 100_000_000;
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER, RECIPIENT]);

    let lease_constructor = Expression::user(
        "Lease",
        vec![
            address_expr(&address(RECIPIENT)),
            Expression::long(amount),
            Expression::long(0),
        ],
    );
    let open_body = Expression::let_in(
        "lease",
        lease_constructor,
        list_expr(vec![
            Expression::reference("lease"),
            Expression::user(
                "BinaryEntry",
                vec![
                    Expression::string("leaseId"),
                    Expression::native(ids::CALCULATE_LEASE_ID, vec![Expression::reference("lease")]),
                ],
            ),
        ]),
    );
    let cancel_body = list_expr(vec![Expression::user(
        "LeaseCancel",
        vec![Expression::reference("id")],
    )]);
    install_dapp(
        &mut chain,
        DAPP,
        dapp_with(vec![
            callable("open", &[], open_body),
            callable("cancel", &["id"], cancel_body),
        ]),
    );

    // open the lease
    let open_tx = invoke_tx(INVOKER, address(DAPP), "open", vec![], vec![], INVOKE_FEE);
    let open_diff = Runtime::new().transition(&chain, &open_tx).diff.unwrap();

    // the recorded id must equal blake2b(tx_id || nonce_le || recipient_bytes || amount_be)
    let mut expected = Vec::new();
    expected.extend_from_slice(open_tx.id.as_bytes());
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(&Recipient::Address(address(RECIPIENT)).to_id_bytes());
    expected.extend_from_slice(&amount.to_be_bytes());
    let expected_id = ByteStr::from(blake2b256(&expected).to_vec());

    let recorded = open_diff
        .data_entry(&address(DAPP), "leaseId")
        .expect("leaseId entry written");
    assert_eq!(recorded.value, DataValue::Binary(expected_id.clone()));
    assert!(open_diff.lease_state.get(&expected_id).unwrap().is_active());

    chain.apply(&open_diff);
    assert_eq!(chain.active_leases(&address(DAPP)), vec![expected_id.clone()]);
    assert_eq!(chain.active_leases(&address(RECIPIENT)), vec![expected_id.clone()]);
    assert_eq!(chain.lease_balance(&address(DAPP)).lease_out, amount);
    assert_eq!(chain.lease_balance(&address(RECIPIENT)).lease_in, amount);

    // cancel it in a later block
    chain.height += 1;
    let cancel_tx = invoke_tx(
        INVOKER,
        address(DAPP),
        "cancel",
        vec![InvokeArg::Binary(expected_id.clone())],
        vec![],
        INVOKE_FEE,
    );
    let cancel_diff = Runtime::new().transition(&chain, &cancel_tx).diff.unwrap();
    chain.apply(&cancel_diff);

    assert!(!chain.lease_details(&expected_id).unwrap().is_active());
    assert!(chain.active_leases(&address(DAPP)).is_empty());
    assert!(chain.active_leases(&address(RECIPIENT)).is_empty());
    assert_eq!(chain.lease_balance(&address(DAPP)).lease_out, 0);
    assert_eq!(chain.lease_balance(&address(RECIPIENT)).lease_in, 0);
}

#[test]
fn transfer_verifier_log_rendering() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);
    // a verifier that binds a few names and then refuses the transaction, so the
    // rejection message carries the rendered log
    let verifier = Expression::let_in(
        "NETWORKBYTE",
        Expression::bytes(vec![b'W']),
        Expression::let_in(
            "$match0",
            Expression::reference("tx"),
            Expression::let_in("@p", Expression::False, Expression::reference("@p")),
        ),
    );
    install_verifier(&mut chain, DAPP, verifier);

    let tx = transfer_tx(DAPP, address(INVOKER), 7, 100_000);
    let result = Runtime::new().transition(&chain, &tx);

    let message = match result.diff {
        Err(ValidationError::Reject(RejectError::GenericError(message))) => message,
        other => panic!("expected GenericError reject, got {:?}", other),
    };
    assert!(message.contains("\tNETWORKBYTE = base58'2W'"), "{}", message);
    assert!(message.contains("\t@p = false"), "{}", message);
    assert!(
        message.contains("$match0 = TransferTransaction(senderPublicKey = base58'"),
        "{}",
        message
    );
    // field order of the record is part of the contract
    let amount_at = message.find("amount = 7").unwrap();
    let asset_at = message.find("assetId = Unit").unwrap();
    let recipient_at = message.find("recipient = Address(").unwrap();
    let fee_at = message.find("feeAssetId = Unit").unwrap();
    assert!(amount_at < asset_at && asset_at < recipient_at && recipient_at < fee_at);
}

#[test]
fn duplicate_lease_cancel_fails_for_fee() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER, RECIPIENT]);
    install_dapp(
        &mut chain,
        DAPP,
        dapp_with(vec![callable(
            "dup",
            &["id"],
            list_expr(vec![
                Expression::user("LeaseCancel", vec![Expression::reference("id")]),
                Expression::user("LeaseCancel", vec![Expression::reference("id")]),
            ]),
        )]),
    );
    // an active lease owned by the dApp, created out of band
    let lease_id = ByteStr::from(vec![5u8; 32]);
    chain.leases.insert(
        lease_id.clone(),
        waves_runtime::diff::LeaseDetails {
            sender: public_key(DAPP),
            recipient: Recipient::Address(address(RECIPIENT)),
            amount: 10,
            status: waves_runtime::diff::LeaseStatus::Active,
            source_tx: ByteStr::from(vec![1u8; 32]),
            height: 1,
        },
    );

    let tx = invoke_tx(
        INVOKER,
        address(DAPP),
        "dup",
        vec![InvokeArg::Binary(lease_id)],
        vec![],
        INVOKE_FEE,
    );
    let result = Runtime::new().transition(&chain, &tx);
    match result.diff {
        Err(ValidationError::Failed(FailedTransactionError::DAppExecution { message, .. })) => {
            assert!(message.starts_with("Duplicate LeaseCancel id(s):"), "{}", message);
        }
        other => panic!("expected DAppExecution, got {:?}", other),
    }
}

#[test]
fn sync_invoke_shares_the_overlay_and_returns_a_value() {
    const OUTER: u8 = 1;
    const INNER: u8 = 4;
    let mut chain = chain_with_accounts(100, &[OUTER, INNER, INVOKER]);

    install_dapp(
        &mut chain,
        INNER,
        dapp_with(vec![callable(
            "inner",
            &[],
            Expression::native(
                ids::CREATE_TUPLE2,
                vec![
                    list_expr(vec![Expression::user(
                        "IntegerEntry",
                        vec![Expression::string("from_inner"), Expression::long(1)],
                    )]),
                    Expression::long(42),
                ],
            ),
        )]),
    );
    install_dapp(
        &mut chain,
        OUTER,
        dapp_with(vec![callable(
            "outer",
            &[],
            Expression::let_in(
                "r",
                Expression::native(
                    ids::INVOKE,
                    vec![
                        address_expr(&address(INNER)),
                        Expression::string("inner"),
                        Expression::reference("nil"),
                        Expression::reference("nil"),
                    ],
                ),
                list_expr(vec![Expression::user(
                    "IntegerEntry",
                    vec![Expression::string("got"), Expression::reference("r")],
                )]),
            ),
        )]),
    );

    let tx = invoke_tx(INVOKER, address(OUTER), "outer", vec![], vec![], INVOKE_FEE);
    let diff = Runtime::new().transition(&chain, &tx).diff.unwrap();

    assert_eq!(
        diff.data_entry(&address(OUTER), "got").map(|e| &e.value),
        Some(&DataValue::Int(42))
    );
    assert_eq!(
        diff.data_entry(&address(INNER), "from_inner").map(|e| &e.value),
        Some(&DataValue::Int(1))
    );
    let result = diff.script_results.get(&tx.id).unwrap();
    assert!(result.invokes.iter().any(|call| call.dapp == address(INNER) && call.function == "inner"));
    // two callables ran
    assert_eq!(diff.scripts_run, 2);
}

#[test]
fn plain_reentrancy_is_disallowed() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);
    install_dapp(
        &mut chain,
        DAPP,
        dapp_with(vec![
            callable(
                "outer",
                &[],
                Expression::let_in(
                    "r",
                    Expression::native(
                        ids::INVOKE,
                        vec![
                            address_expr(&address(DAPP)),
                            Expression::string("noop"),
                            Expression::reference("nil"),
                            Expression::reference("nil"),
                        ],
                    ),
                    Expression::reference("nil"),
                ),
            ),
            callable("noop", &[], Expression::reference("nil")),
        ]),
    );

    let tx = invoke_tx(INVOKER, address(DAPP), "outer", vec![], vec![], INVOKE_FEE);
    let result = Runtime::new().transition(&chain, &tx);
    match result.diff {
        Err(ValidationError::Reject(RejectError::ReentrancyDisallowed(at))) => {
            assert_eq!(at, address(DAPP));
        }
        other => panic!("expected ReentrancyDisallowed, got {:?}", other),
    }
}

#[test]
fn transfer_and_data_transactions_round_trip() {
    let mut chain = chain_with_accounts(100, &[DAPP, INVOKER]);

    let tx = transfer_tx(DAPP, address(INVOKER), 999_999, 100_000);
    let diff = Runtime::new().transition(&chain, &tx).diff.unwrap();
    chain.apply(&diff);
    assert_eq!(chain.balance(&address(DAPP), &AssetId::Base), BASE_BALANCE - 999_999 - 100_000);
    assert_eq!(chain.balance(&address(INVOKER), &AssetId::Base), BASE_BALANCE + 999_999);

    let data_tx = signed_tx(
        INVOKER,
        100_000,
        AssetId::Base,
        TransactionData::Data(DataTxData {
            entries: vec![waves_runtime::types::DataEntry {
                key: "answer".to_owned(),
                value: DataValue::Int(42),
            }],
        }),
    );
    let diff = Runtime::new().transition(&chain, &data_tx).diff.unwrap();
    chain.apply(&diff);
    assert_eq!(
        chain.account_data(&address(INVOKER), "answer").map(|e| e.value),
        Some(DataValue::Int(42))
    );
}

#[test]
fn bad_signature_and_missing_funds_reject() {
    let chain = chain_with_accounts(100, &[DAPP, INVOKER]);

    let mut forged = transfer_tx(DAPP, address(INVOKER), 10, 100_000);
    forged.proofs[0] = ByteStr::from(vec![0u8; 64]);
    let result = Runtime::new().transition(&chain, &forged);
    assert!(matches!(
        result.diff,
        Err(ValidationError::Reject(RejectError::InvalidSignature))
    ));

    let broke = transfer_tx(DAPP, address(INVOKER), BASE_BALANCE, 100_000);
    let result = Runtime::new().transition(&chain, &broke);
    assert!(matches!(
        result.diff,
        Err(ValidationError::Reject(RejectError::AccountBalanceError(_)))
    ));
}

#[test]
fn sponsored_fee_routes_through_the_issuer() {
    const ISSUER: u8 = 5;
    let mut chain = chain_with_accounts(100, &[ISSUER, INVOKER, RECIPIENT]);
    let asset = issue_asset(&mut chain, [7u8; 32], ISSUER, 1_000_000, true);
    chain.assets.get_mut(&asset).unwrap().sponsorship_rate = 2;
    chain.set_balance(address(INVOKER), asset.clone(), 500);

    // fee of 2 asset units = 100_000 base units at rate 2
    let tx = signed_tx(
        INVOKER,
        2,
        asset.clone(),
        TransactionData::Transfer(waves_runtime::transaction::TransferData {
            recipient: Recipient::Address(address(RECIPIENT)),
            asset: AssetId::Base,
            amount: 10,
            attachment: ByteStr::default(),
        }),
    );
    let diff = Runtime::new().transition(&chain, &tx).diff.unwrap();

    let issuer_portfolio = &diff.portfolios[&address(ISSUER)];
    assert_eq!(issuer_portfolio.balance_of(&asset), 2);
    assert_eq!(issuer_portfolio.balance, -100_000);
    assert_eq!(diff.portfolios[&address(INVOKER)].balance_of(&asset), -2);
}

#[test]
fn sponsor_fee_transaction_sets_the_rate() {
    const ISSUER: u8 = 5;
    let mut chain = chain_with_accounts(100, &[ISSUER]);
    let asset = issue_asset(&mut chain, [7u8; 32], ISSUER, 1_000_000, true);

    let tx = signed_tx(
        ISSUER,
        100_000,
        AssetId::Base,
        TransactionData::SponsorFee(waves_runtime::transaction::SponsorFeeData {
            asset: asset.clone(),
            min_sponsored_fee: 3,
        }),
    );
    let diff = Runtime::new().transition(&chain, &tx).diff.unwrap();
    assert_eq!(diff.sponsorship[&asset], Sponsorship::Value(3));

    chain.apply(&diff);
    assert_eq!(chain.asset_description(&asset).unwrap().sponsorship_rate, 3);
}
