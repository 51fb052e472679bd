/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Evaluated values, their protocol size caps and their canonical textual rendering.
//!
//! The rendering is part of the protocol surface: validation-error messages embed the
//! evaluation log, and every node must produce the same text for the same log.

use std::fmt;

use crate::error::ExecutionError;
use crate::limits::{MAX_BYTESTR_SIZE, MAX_LIST_SIZE, MAX_STRING_SIZE};
use crate::types::ByteStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseObject {
    pub type_name: String,
    /// Declared field order. Rendering and `GetField` both follow it.
    pub fields: Vec<(String, Value)>,
}

impl CaseObject {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Long(i64),
    Bool(bool),
    Bytes(ByteStr),
    Str(String),
    Unit,
    Tuple(Vec<Value>),
    List(Vec<Value>),
    CaseObject(CaseObject),
}

impl Value {
    /// Checked constructor for byte values; the cap is version-independent.
    pub fn bytes(bytes: impl Into<ByteStr>) -> Result<Self, ExecutionError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_BYTESTR_SIZE {
            return Err(ExecutionError::LimitExceeded(format!(
                "byte vector size = {} bytes exceeds {}",
                bytes.len(),
                MAX_BYTESTR_SIZE
            )));
        }
        Ok(Value::Bytes(bytes))
    }

    /// Checked constructor for string values.
    pub fn string(string: impl Into<String>) -> Result<Self, ExecutionError> {
        let string = string.into();
        if string.len() > MAX_STRING_SIZE {
            return Err(ExecutionError::LimitExceeded(format!(
                "string size = {} bytes exceeds {}",
                string.len(),
                MAX_STRING_SIZE
            )));
        }
        Ok(Value::Str(string))
    }

    /// Checked constructor for lists.
    pub fn list(items: Vec<Value>) -> Result<Self, ExecutionError> {
        if items.len() > MAX_LIST_SIZE {
            return Err(ExecutionError::LimitExceeded(format!(
                "list size = {} exceeds {}",
                items.len(),
                MAX_LIST_SIZE
            )));
        }
        Ok(Value::List(items))
    }

    pub fn case(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Value::CaseObject(CaseObject::new(type_name, fields))
    }

    /// Type name used by `_isInstanceOf` and by type-mismatch messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Long(_) => "Int",
            Value::Bool(_) => "Boolean",
            Value::Bytes(_) => "ByteVector",
            Value::Str(_) => "String",
            Value::Unit => "Unit",
            Value::Tuple(_) => "Tuple",
            Value::List(_) => "List",
            Value::CaseObject(object) => &object.type_name,
        }
    }

    pub fn as_long(&self) -> Result<i64, ExecutionError> {
        match self {
            Value::Long(value) => Ok(*value),
            other => Err(type_mismatch("Int", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ExecutionError> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(type_mismatch("Boolean", other)),
        }
    }

    pub fn as_bytes(&self) -> Result<&ByteStr, ExecutionError> {
        match self {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(type_mismatch("ByteVector", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, ExecutionError> {
        match self {
            Value::Str(string) => Ok(string),
            other => Err(type_mismatch("String", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ExecutionError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(type_mismatch("List", other)),
        }
    }

    pub fn as_case(&self) -> Result<&CaseObject, ExecutionError> {
        match self {
            Value::CaseObject(object) => Ok(object),
            other => Err(type_mismatch("CaseObject", other)),
        }
    }
}

fn type_mismatch(expected: &str, got: &Value) -> ExecutionError {
    ExecutionError::TypeMismatch(format!("expected {}, got {}", expected, got.type_name()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Long(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Bytes(bytes) => write!(f, "{}", bytes),
            Value::Str(string) => write!(f, "\"{}\"", string),
            Value::Unit => write!(f, "Unit"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                render_separated(f, items)?;
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                render_separated(f, items)?;
                write!(f, "]")
            }
            Value::CaseObject(object) => {
                write!(f, "{}(", object.type_name)?;
                for (index, (name, value)) in object.fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, value)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn render_separated(f: &mut fmt::Formatter, items: &[Value]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Bindings produced during evaluation, in evaluation order. Part of the evaluator result
/// even on failure.
pub type EvaluationLog = Vec<(String, Value)>;

/// Deterministic textual form of a log, as embedded in validation-error messages:
/// one `\t<name> = <value>` line per entry.
pub fn render_log(log: &EvaluationLog) -> String {
    log.iter()
        .map(|(name, value)| format!("\t{} = {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_caps_are_enforced_on_construction() {
        assert!(Value::bytes(vec![0u8; MAX_BYTESTR_SIZE]).is_ok());
        assert!(matches!(
            Value::bytes(vec![0u8; MAX_BYTESTR_SIZE + 1]),
            Err(ExecutionError::LimitExceeded(_))
        ));
        assert!(matches!(
            Value::string("a".repeat(MAX_STRING_SIZE + 1)),
            Err(ExecutionError::LimitExceeded(_))
        ));
        assert!(matches!(
            Value::list(vec![Value::Unit; MAX_LIST_SIZE + 1]),
            Err(ExecutionError::LimitExceeded(_))
        ));
    }

    #[test]
    fn rendering_is_canonical() {
        let object = Value::case(
            "Pair",
            vec![
                ("first".into(), Value::Long(1)),
                ("second".into(), Value::Bytes(ByteStr::from(vec![b'W']))),
            ],
        );
        assert_eq!(object.to_string(), "Pair(first = 1, second = base58'2W')");

        let log = vec![
            ("@p".to_owned(), Value::Bool(false)),
            ("NETWORKBYTE".to_owned(), Value::Bytes(ByteStr::from(vec![b'W']))),
        ];
        assert_eq!(render_log(&log), "\t@p = false\n\tNETWORKBYTE = base58'2W'");
    }
}
