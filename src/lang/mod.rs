/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The embedded script language: compiled expressions, values, the complexity schedule, the
//! static estimator and the budget-bounded evaluator. Parsing and type checking live
//! upstream; this module starts at the compiled tree.

pub mod builtins;
pub mod context;
pub mod costs;
pub mod estimator;
pub mod evaluator;
pub mod expr;
pub mod ids;
pub mod value;
pub mod version;

pub use context::{DAppDispatcher, EvaluationContext};
pub use evaluator::{evaluate, Evaluation, EvaluationMode};
pub use expr::{
    ByteStrLimit, Callable, DApp, Expression, FunctionHeader, LetBinding, Script, ScriptContent, StringLimit,
    UserFunction,
};
pub use value::{render_log, CaseObject, EvaluationLog, Value};
pub use version::{LangConfig, StdLibVersion};
