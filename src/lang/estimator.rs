/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Static worst-case complexity estimation of a compiled expression.
//!
//! The estimate is deterministic and independent of runtime values: both branches of an `if`
//! are costed and the maximum taken, and user functions are inlined at the call site, so the
//! estimate bounds every metered run of the same expression. The estimator is versioned;
//! scripts store `{estimator_version -> {callable -> complexity}}` so the protocol can move
//! to a new estimator without re-estimating old scripts.

use std::collections::BTreeMap;

use super::costs;
use super::expr::{DApp, Expression, FunctionHeader, UserFunction};
use super::ids;
use super::version::StdLibVersion;

/// Version stamp written next to freshly computed estimates.
pub const ESTIMATOR_VERSION: u8 = 3;

/// Worst-case complexity of `expression`, or a message naming the unresolvable part.
pub fn estimate(
    expression: &Expression,
    version: StdLibVersion,
    user_functions: &BTreeMap<String, UserFunction>,
) -> Result<u64, String> {
    let mut inlining = Vec::new();
    walk(expression, version, user_functions, &mut inlining)
}

/// Per-callable complexities of a dApp, keyed by callable name.
pub fn estimate_dapp(dapp: &DApp, version: StdLibVersion) -> Result<BTreeMap<String, u64>, String> {
    let user_functions: BTreeMap<String, UserFunction> = dapp
        .user_functions
        .iter()
        .map(|function| (function.name.clone(), function.clone()))
        .collect();

    dapp.callables
        .iter()
        .map(|callable| {
            estimate(&callable.body, version, &user_functions)
                .map(|complexity| (callable.name.clone(), complexity))
        })
        .collect()
}

fn walk(
    expression: &Expression,
    version: StdLibVersion,
    user_functions: &BTreeMap<String, UserFunction>,
    inlining: &mut Vec<String>,
) -> Result<u64, String> {
    match expression {
        Expression::ConstLong(_)
        | Expression::ConstByteStr(..)
        | Expression::ConstString(..)
        | Expression::True
        | Expression::False => Ok(costs::CONST_COST),

        Expression::Ref(_) => Ok(costs::ref_cost(version)),

        Expression::Block(binding, body) => {
            let value = walk(&binding.value, version, user_functions, inlining)?;
            let body = walk(body, version, user_functions, inlining)?;
            Ok(costs::let_cost(version) + value + body)
        }

        Expression::If(condition, then, otherwise) => {
            let condition = walk(condition, version, user_functions, inlining)?;
            let then = walk(then, version, user_functions, inlining)?;
            let otherwise = walk(otherwise, version, user_functions, inlining)?;
            Ok(costs::IF_COST + condition + then.max(otherwise))
        }

        Expression::GetField(target, _) => {
            Ok(costs::GETTER_COST + walk(target, version, user_functions, inlining)?)
        }

        Expression::FunctionCall(FunctionHeader::Native(id), args) => {
            ids::function(*id, version).ok_or_else(|| format!("unknown native function {}", id))?;
            let mut total = costs::native_cost(*id, version);
            for arg in args {
                total += walk(arg, version, user_functions, inlining)?;
            }
            Ok(total)
        }

        Expression::FunctionCall(FunctionHeader::User(name), args) => {
            if inlining.iter().any(|inlined| inlined == name) {
                return Err(format!("function '{}' is recursive", name));
            }
            let base = match user_functions.get(name) {
                Some(function) => {
                    inlining.push(name.clone());
                    let body = walk(&function.body, version, user_functions, inlining)?;
                    inlining.pop();
                    costs::USER_CALL_COST + body
                }
                None if super::builtins::constructor_fields(name).is_some() => costs::CONSTRUCTOR_COST,
                None => return Err(format!("user function '{}' not found", name)),
            };
            let mut total = base;
            for arg in args {
                total += walk(arg, version, user_functions, inlining)?;
            }
            Ok(total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: StdLibVersion = StdLibVersion::V5;

    #[test]
    fn if_takes_the_heavier_branch() {
        // if (true) then sigVerify-heavy else const
        let expression = Expression::if_else(
            Expression::True,
            Expression::native(
                ids::SIG_VERIFY,
                vec![
                    Expression::bytes(vec![0u8]),
                    Expression::bytes(vec![0u8]),
                    Expression::bytes(vec![0u8]),
                ],
            ),
            Expression::long(1),
        );
        let cost = estimate(&expression, V, &BTreeMap::new()).unwrap();
        // if + cond + (sigVerify + 3 consts)
        assert_eq!(cost, 1 + 1 + (200 + 3));
    }

    #[test]
    fn user_functions_inline_once_per_call_site() {
        let double = UserFunction {
            name: "double".into(),
            args: vec!["x".into()],
            body: Expression::native(
                ids::SUM_LONG,
                vec![Expression::reference("x"), Expression::reference("x")],
            ),
        };
        let user_functions = BTreeMap::from([(double.name.clone(), double)]);
        let call = Expression::user("double", vec![Expression::long(3)]);
        let cost = estimate(&call, V, &user_functions).unwrap();
        // user call + (sum + 2 refs) + const arg
        assert_eq!(cost, 1 + (1 + 2) + 1);
    }

    #[test]
    fn recursion_is_an_error() {
        let looping = UserFunction {
            name: "looping".into(),
            args: vec![],
            body: Expression::user("looping", vec![]),
        };
        let user_functions = BTreeMap::from([(looping.name.clone(), looping)]);
        let call = Expression::user("looping", vec![]);
        assert!(estimate(&call, V, &user_functions).is_err());
    }

    #[test]
    fn unknown_native_is_an_error() {
        let call = Expression::native(9999, vec![]);
        assert!(estimate(&call, V, &BTreeMap::new()).is_err());
    }
}
