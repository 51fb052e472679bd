/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The expression evaluator: pure, deterministic, budget-bounded.
//!
//! Every step charges against the complexity budget before it runs; exhausting the budget
//! stops evaluation with [ExecutionError::ComplexityLimitExceeded] and a consumed complexity
//! equal to the limit. Bindings evaluate eagerly and append to the log in evaluation order;
//! the log survives failure. No wall clock, no randomness, no floating point anywhere below
//! this line.

use std::rc::Rc;

use crate::error::ExecutionError;
use crate::limits::MAX_CALL_DEPTH;

use super::builtins;
use super::context::{EvaluationContext, INVOCATION_TX_ID_BINDING};
use super::costs;
use super::expr::{ByteStrLimit, Expression, FunctionHeader, StringLimit};
use super::ids;
use super::value::{EvaluationLog, Value};

/// Whether the caller requires the evaluation to finish inside the budget.
/// `Complete` enforces the limit; `Incomplete` only measures, for dry runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationMode {
    Complete,
    Incomplete,
}

/// What an evaluation produced: the binding log, the consumed complexity, and the value or
/// the error. All three are meaningful on failure too.
#[derive(Debug)]
pub struct Evaluation {
    pub log: EvaluationLog,
    pub consumed: u64,
    pub result: Result<Value, ExecutionError>,
}

pub fn evaluate(
    expression: &Expression,
    ctx: &mut EvaluationContext,
    limit: u64,
    mode: EvaluationMode,
) -> Evaluation {
    let mut machine = Machine {
        ctx,
        limit,
        mode,
        spent: 0,
        log: Vec::new(),
    };
    let result = machine.eval(expression, &Env::default(), 0);
    let consumed = match &result {
        Err(ExecutionError::ComplexityLimitExceeded) => limit,
        _ => machine.spent,
    };
    Evaluation {
        log: machine.log,
        consumed,
        result,
    }
}

/// Immutable chain of `let` and parameter bindings. Extending clones nothing but one `Rc`.
#[derive(Clone, Default)]
struct Env(Option<Rc<EnvNode>>);

struct EnvNode {
    name: String,
    value: Value,
    next: Env,
}

impl Env {
    fn bind(&self, name: String, value: Value) -> Env {
        Env(Some(Rc::new(EnvNode {
            name,
            value,
            next: self.clone(),
        })))
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self;
        while let Some(node) = &current.0 {
            if node.name == name {
                return Some(node.value.clone());
            }
            current = &node.next;
        }
        None
    }
}

struct Machine<'c, 'd> {
    ctx: &'c mut EvaluationContext<'d>,
    limit: u64,
    mode: EvaluationMode,
    spent: u64,
    log: EvaluationLog,
}

impl Machine<'_, '_> {
    fn charge(&mut self, cost: u64) -> Result<(), ExecutionError> {
        let next = self.spent.saturating_add(cost);
        if next > self.limit && self.mode == EvaluationMode::Complete {
            self.spent = self.limit;
            return Err(ExecutionError::ComplexityLimitExceeded);
        }
        self.spent = next;
        Ok(())
    }

    fn eval(&mut self, expression: &Expression, env: &Env, depth: u32) -> Result<Value, ExecutionError> {
        if depth > MAX_CALL_DEPTH {
            return Err(ExecutionError::StackOverflow);
        }
        match expression {
            Expression::ConstLong(value) => {
                self.charge(costs::CONST_COST)?;
                Ok(Value::Long(*value))
            }
            Expression::ConstByteStr(bytes, limit) => {
                self.charge(costs::CONST_COST)?;
                match limit {
                    ByteStrLimit::Limited => Value::bytes(bytes.clone()),
                    ByteStrLimit::NoLimit => Ok(Value::Bytes(bytes.clone())),
                }
            }
            Expression::ConstString(string, limit) => {
                self.charge(costs::CONST_COST)?;
                match limit {
                    StringLimit::Reduced => Value::string(string.clone()),
                    StringLimit::NoLimit => Ok(Value::Str(string.clone())),
                }
            }
            Expression::True => {
                self.charge(costs::CONST_COST)?;
                Ok(Value::Bool(true))
            }
            Expression::False => {
                self.charge(costs::CONST_COST)?;
                Ok(Value::Bool(false))
            }

            Expression::Ref(name) => {
                self.charge(costs::ref_cost(self.ctx.version))?;
                env.lookup(name)
                    .or_else(|| self.ctx.bindings.get(name).cloned())
                    .ok_or_else(|| ExecutionError::RefNotFound(name.clone()))
            }

            Expression::Block(binding, body) => {
                self.charge(costs::let_cost(self.ctx.version))?;
                let value = self.eval(&binding.value, env, depth + 1)?;
                self.log.push((binding.name.clone(), value.clone()));
                let extended = env.bind(binding.name.clone(), value);
                self.eval(body, &extended, depth + 1)
            }

            Expression::If(condition, then, otherwise) => {
                self.charge(costs::IF_COST)?;
                if self.eval(condition, env, depth + 1)?.as_bool()? {
                    self.eval(then, env, depth + 1)
                } else {
                    self.eval(otherwise, env, depth + 1)
                }
            }

            Expression::GetField(target, field) => {
                self.charge(costs::GETTER_COST)?;
                let target = self.eval(target, env, depth + 1)?;
                let object = target.as_case()?;
                object.get(field).cloned().ok_or_else(|| {
                    ExecutionError::TypeMismatch(format!("{} has no field {}", object.type_name, field))
                })
            }

            Expression::FunctionCall(FunctionHeader::Native(id), args) => {
                let function = ids::function(*id, self.ctx.version)
                    .ok_or_else(|| ExecutionError::FunctionNotFound(format!("native {}", id)))?;
                if args.len() != function.arity {
                    return Err(ExecutionError::TypeMismatch(format!(
                        "{} takes {} arguments, got {}",
                        function.name,
                        function.arity,
                        args.len()
                    )));
                }
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, env, depth + 1)?);
                }
                self.charge(costs::native_cost(*id, self.ctx.version))?;

                match *id {
                    ids::INVOKE | ids::REENTRANT_INVOKE => {
                        self.dispatch_invoke(*id == ids::REENTRANT_INVOKE, &values)
                    }
                    ids::CREATE_TUPLE2 => Ok(Value::Tuple(values)),
                    ids::CALCULATE_LEASE_ID => self.calculate_lease_id(&values[0]),
                    _ => builtins::call_native(*id, &values, self.ctx.version, &self.ctx.config),
                }
            }

            Expression::FunctionCall(FunctionHeader::User(name), args) => {
                if let Some(function) = self.ctx.user_functions.get(name).cloned() {
                    if args.len() != function.args.len() {
                        return Err(ExecutionError::TypeMismatch(format!(
                            "{} takes {} arguments, got {}",
                            name,
                            function.args.len(),
                            args.len()
                        )));
                    }
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg, env, depth + 1)?);
                    }
                    self.charge(costs::USER_CALL_COST)?;

                    // user functions close over the script's global scope, not the caller's lets
                    let mut body_env = Env::default();
                    for (parameter, value) in function.args.iter().zip(values) {
                        body_env = body_env.bind(parameter.clone(), value);
                    }
                    self.eval(&function.body, &body_env, depth + 1)
                } else if let Some(fields) = builtins::constructor_fields(name) {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg, env, depth + 1)?);
                    }
                    self.charge(costs::CONSTRUCTOR_COST)?;
                    builtins::construct(name, fields, &values)
                } else {
                    Err(ExecutionError::FunctionNotFound(name.clone()))
                }
            }
        }
    }

    // needs the invocation transaction id, which the invoke machinery exposes as a
    // reserved binding invisible to scripts
    fn calculate_lease_id(&self, lease: &Value) -> Result<Value, ExecutionError> {
        let object = lease.as_case()?;
        if object.type_name != "Lease" {
            return Err(ExecutionError::TypeMismatch(format!(
                "calculateLeaseId expects a Lease, got {}",
                object.type_name
            )));
        }
        let recipient_value = object
            .get("recipient")
            .ok_or_else(|| ExecutionError::TypeMismatch("Lease has no recipient".to_owned()))?;
        let recipient = crate::invoke::actions::recipient_from(recipient_value, self.ctx.chain_id)?;
        let amount = object
            .get("amount")
            .ok_or_else(|| ExecutionError::TypeMismatch("Lease has no amount".to_owned()))?
            .as_long()?;
        let nonce = object
            .get("nonce")
            .ok_or_else(|| ExecutionError::TypeMismatch("Lease has no nonce".to_owned()))?
            .as_long()?;
        let nonce = u32::try_from(nonce)
            .map_err(|_| ExecutionError::TypeMismatch("lease nonce out of range".to_owned()))?;
        let tx_id = match self.ctx.bindings.get(INVOCATION_TX_ID_BINDING) {
            Some(Value::Bytes(bytes)) => bytes.clone(),
            _ => {
                return Err(ExecutionError::FunctionNotFound(
                    "calculateLeaseId is only available to dApp callables".to_owned(),
                ))
            }
        };
        Ok(Value::Bytes(crate::invoke::actions::lease_id(&tx_id, nonce, &recipient, amount)))
    }

    fn dispatch_invoke(&mut self, reentrant: bool, values: &[Value]) -> Result<Value, ExecutionError> {
        let budget_remaining = self.limit.saturating_sub(self.spent);
        let dispatcher = self.ctx.dispatcher.as_deref_mut().ok_or_else(|| {
            ExecutionError::FunctionNotFound("invoke is only available to dApp callables".to_owned())
        })?;
        let (value, nested_spent) =
            dispatcher.dispatch(reentrant, &values[0], &values[1], &values[2], &values[3], budget_remaining)?;
        self.charge(nested_spent)?;
        Ok(value)
    }
}
