/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The environment an expression evaluates in: version, semantic switches, named bindings
//! from the host (`tx`, `height`, `this`), the script's own user functions, and — for dApp
//! callables only — the dispatcher that executes synchronous dApp calls.

use std::collections::BTreeMap;

use crate::error::ExecutionError;

use super::expr::UserFunction;
use super::value::Value;
use super::version::{LangConfig, StdLibVersion};

/// Executes `invoke`/`reentrantInvoke` on behalf of the evaluator. Implemented by the invoke
/// machinery, which owns the in-flight diff overlay; plain verifier and asset-script
/// evaluations run without one, and a sync call there is an execution error.
pub trait DAppDispatcher {
    /// Runs the callable and returns its return value together with the complexity the whole
    /// nested execution consumed.
    fn dispatch(
        &mut self,
        reentrant: bool,
        dapp: &Value,
        function: &Value,
        args: &Value,
        payments: &Value,
        budget_remaining: u64,
    ) -> Result<(Value, u64), ExecutionError>;
}

/// Reserved binding carrying the invocation transaction id into builtins that derive ids.
/// The `@` prefix keeps it out of the namespace scripts can reference.
pub const INVOCATION_TX_ID_BINDING: &str = "@invocationTransactionId";

pub struct EvaluationContext<'d> {
    pub version: StdLibVersion,
    pub config: LangConfig,
    /// Chain id used when scripts name aliases and addresses.
    pub chain_id: u8,
    /// Host bindings visible to `Ref` nodes that no `let` shadows.
    pub bindings: BTreeMap<String, Value>,
    pub user_functions: BTreeMap<String, UserFunction>,
    pub dispatcher: Option<&'d mut dyn DAppDispatcher>,
}

impl<'d> EvaluationContext<'d> {
    pub fn new(version: StdLibVersion, config: LangConfig) -> Self {
        Self {
            version,
            config,
            chain_id: 0,
            bindings: BTreeMap::from([
                ("unit".to_owned(), Value::Unit),
                ("nil".to_owned(), Value::List(Vec::new())),
            ]),
            user_functions: BTreeMap::new(),
            dispatcher: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u8) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn with_user_functions(mut self, functions: impl IntoIterator<Item = UserFunction>) -> Self {
        for function in functions {
            self.user_functions.insert(function.name.clone(), function);
        }
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: &'d mut dyn DAppDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }
}
