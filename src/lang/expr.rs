/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The compiled expression tree the engine consumes. Parsing and type checking happen
//! upstream; an [Expression] handed to the evaluator is assumed well-typed, and type
//! confusion at runtime is still caught and reported as an execution error.

use borsh::BorshSerialize;

use crate::types::ByteStr;

use super::version::StdLibVersion;

/// Size-check mode of a byte constant. `NoLimit` exists for engine-built constants such as
/// transaction body bytes, which legitimately exceed the script-facing cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize)]
pub enum ByteStrLimit {
    Limited,
    NoLimit,
}

/// Size-check mode of a string constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize)]
pub enum StringLimit {
    Reduced,
    NoLimit,
}

/// Builtin functions are addressed by stable numeric id, user functions by name.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum FunctionHeader {
    Native(u16),
    User(String),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct LetBinding {
    pub name: String,
    pub value: Box<Expression>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum Expression {
    ConstLong(i64),
    ConstByteStr(ByteStr, ByteStrLimit),
    ConstString(String, StringLimit),
    True,
    False,
    Ref(String),
    Block(LetBinding, Box<Expression>),
    If(Box<Expression>, Box<Expression>, Box<Expression>),
    FunctionCall(FunctionHeader, Vec<Expression>),
    GetField(Box<Expression>, String),
}

impl Expression {
    pub fn long(value: i64) -> Self {
        Expression::ConstLong(value)
    }

    pub fn bytes(bytes: impl Into<ByteStr>) -> Self {
        Expression::ConstByteStr(bytes.into(), ByteStrLimit::Limited)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::ConstString(value.into(), StringLimit::Reduced)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Expression::Ref(name.into())
    }

    pub fn let_in(name: impl Into<String>, value: Expression, body: Expression) -> Self {
        Expression::Block(
            LetBinding {
                name: name.into(),
                value: Box::new(value),
            },
            Box::new(body),
        )
    }

    pub fn if_else(condition: Expression, then: Expression, otherwise: Expression) -> Self {
        Expression::If(Box::new(condition), Box::new(then), Box::new(otherwise))
    }

    pub fn native(id: u16, args: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionHeader::Native(id), args)
    }

    pub fn user(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall(FunctionHeader::User(name.into()), args)
    }

    pub fn get_field(target: Expression, field: impl Into<String>) -> Self {
        Expression::GetField(Box::new(target), field.into())
    }
}

/// A named function declared by a dApp script, callable from expressions of the same script.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct UserFunction {
    pub name: String,
    pub args: Vec<String>,
    pub body: Expression,
}

/// An entry point of a dApp. The invocation object binds to `invocation_param`, the wire
/// arguments to `args`, in that order, before the body evaluates.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct Callable {
    pub name: String,
    pub invocation_param: String,
    pub args: Vec<String>,
    pub body: Expression,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct DApp {
    pub user_functions: Vec<UserFunction>,
    pub callables: Vec<Callable>,
    /// Script-header switch allowing `reentrantInvoke` back into this dApp.
    pub allow_reentrancy: bool,
}

impl DApp {
    pub fn callable(&self, name: &str) -> Option<&Callable> {
        self.callables.iter().find(|callable| callable.name == name)
    }
}

/// A compiled account or asset script: either a plain expression (verifier, asset script)
/// or a dApp with callable entry points.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum ScriptContent {
    Expression(Expression),
    DApp(DApp),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct Script {
    pub version: StdLibVersion,
    pub content: ScriptContent,
}

impl Script {
    pub fn expression(version: StdLibVersion, expression: Expression) -> Self {
        Self {
            version,
            content: ScriptContent::Expression(expression),
        }
    }

    pub fn dapp(version: StdLibVersion, dapp: DApp) -> Self {
        Self {
            version,
            content: ScriptContent::DApp(dapp),
        }
    }

    pub fn as_dapp(&self) -> Option<&DApp> {
        match &self.content {
            ScriptContent::DApp(dapp) => Some(dapp),
            ScriptContent::Expression(_) => None,
        }
    }
}
