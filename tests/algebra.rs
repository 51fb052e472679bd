//! Property tests: the diff combine laws, the builtin round-trips, and budget
//! reproducibility of the evaluator.

mod common;

use proptest::prelude::*;

use common::address;
use waves_runtime::diff::{Diff, Portfolio};
use waves_runtime::lang::{
    builtins::call_native, evaluate, ids, EvaluationContext, EvaluationMode, Expression, LangConfig,
    StdLibVersion, Value,
};
use waves_runtime::types::{AssetId, ByteStr};

const V: StdLibVersion = StdLibVersion::V5;

fn call(id: u16, args: &[Value]) -> Value {
    call_native(id, args, V, &LangConfig::default()).unwrap()
}

fn diff_of(entries: &[(u8, i64, i64)]) -> Diff {
    let mut diff = Diff::default();
    for (seed, base, asset) in entries {
        let mut portfolio = Portfolio::base(*base);
        portfolio.assets.insert(AssetId::issued([42u8; 32]), *asset);
        diff = diff
            .combine(Diff::of_portfolio(address(*seed), portfolio))
            .unwrap();
    }
    diff
}

proptest! {
    #[test]
    fn base58_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..=64)) {
        let encoded = call(ids::TO_BASE58, &[Value::Bytes(ByteStr::from(bytes.clone()))]);
        let decoded = call(ids::FROM_BASE58, &[encoded]);
        prop_assert_eq!(decoded, Value::Bytes(ByteStr::from(bytes)));
    }

    #[test]
    fn base64_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..=2048)) {
        let encoded = call(ids::TO_BASE64, &[Value::Bytes(ByteStr::from(bytes.clone()))]);
        let decoded = call(ids::FROM_BASE64, &[encoded]);
        prop_assert_eq!(decoded, Value::Bytes(ByteStr::from(bytes)));
    }

    #[test]
    fn long_bytes_round_trip(n in any::<i64>()) {
        let bytes = call(ids::LONG_TO_BYTES, &[Value::Long(n)]);
        prop_assert_eq!(call(ids::BYTES_TO_LONG, &[bytes]), Value::Long(n));
    }

    #[test]
    fn utf8_round_trip(s in "\\PC{0,100}") {
        let bytes = call(ids::STRING_TO_BYTES, &[Value::Str(s.clone())]);
        prop_assert_eq!(call(ids::UTF8_STRING, &[bytes]), Value::Str(s));
    }

    #[test]
    fn combine_is_associative(
        a in proptest::collection::vec((1u8..5, -1000i64..1000, -1000i64..1000), 0..4),
        b in proptest::collection::vec((1u8..5, -1000i64..1000, -1000i64..1000), 0..4),
        c in proptest::collection::vec((1u8..5, -1000i64..1000, -1000i64..1000), 0..4),
    ) {
        let (a, b, c) = (diff_of(&a), diff_of(&b), diff_of(&c));
        let left = a.clone().combine(b.clone()).unwrap().combine(c.clone()).unwrap();
        let right = a.combine(b.combine(c).unwrap()).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn combine_with_empty_is_identity(entries in proptest::collection::vec((1u8..5, -1000i64..1000, -1000i64..1000), 0..4)) {
        let diff = diff_of(&entries);
        prop_assert_eq!(diff.clone().combine(Diff::default()).unwrap(), diff.clone());
        prop_assert_eq!(Diff::default().combine(diff.clone()).unwrap(), diff);
    }

    #[test]
    fn consumed_complexity_never_exceeds_the_limit(limit in 0u64..300) {
        let expression = Expression::let_in(
            "x",
            Expression::native(ids::TO_BASE58, vec![Expression::bytes(vec![1u8, 2, 3])]),
            Expression::native(
                ids::SUM_STRING,
                vec![Expression::reference("x"), Expression::string("!")],
            ),
        );
        let mut ctx = EvaluationContext::new(V, LangConfig::default());
        let evaluation = evaluate(&expression, &mut ctx, limit, EvaluationMode::Complete);
        prop_assert!(evaluation.consumed <= limit);

        // bit-for-bit reproducible
        let mut ctx = EvaluationContext::new(V, LangConfig::default());
        let again = evaluate(&expression, &mut ctx, limit, EvaluationMode::Complete);
        prop_assert_eq!(evaluation.result, again.result);
        prop_assert_eq!(evaluation.consumed, again.consumed);
        prop_assert_eq!(evaluation.log, again.log);
    }
}

#[test]
fn base64_round_trips_a_full_32_kib_vector() {
    let bytes: Vec<u8> = (0..32 * 1024).map(|i| (i % 251) as u8).collect();
    let encoded = call(ids::TO_BASE64, &[Value::Bytes(ByteStr::from(bytes.clone()))]);
    let decoded = call(ids::FROM_BASE64, &[encoded]);
    assert_eq!(decoded, Value::Bytes(ByteStr::from(bytes)));
}

#[test]
fn portfolio_merge_is_checked_addition_per_address() {
    let a = Diff::of_portfolio(address(1), Portfolio::base(41));
    let b = Diff::of_portfolio(address(1), Portfolio::base(1));
    assert_eq!(a.combine(b).unwrap().portfolios[&address(1)].balance, 42);

    let a = Diff::of_portfolio(address(1), Portfolio::base(i64::MAX));
    let b = Diff::of_portfolio(address(1), Portfolio::base(1));
    assert!(a.combine(b).is_err());
}
