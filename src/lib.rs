/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! waves-runtime is the **transaction-diff engine** of an account-model blockchain: given a
//! committed chain snapshot and one transaction, it produces a deterministic, composable
//! [Diff] of every state mutation the transaction causes, or a structured validation error.
//!
//! ```text
//! f(B, TX) -> Result<Diff, Error> + Trace
//!
//! B    = read-only snapshot of committed chain state
//! TX   = transaction (transfer, data, lease, invoke-script, ...)
//! Diff = balance changes, asset lifecycle, leases, aliases, data writes,
//!        sponsorship, script-invocation results
//! ```
//!
//! ### Example
//!
//! ```rust,ignore
//! // prepare a snapshot (anything implementing Blockchain) and a transaction,
//! // then compute the diff.
//! let result = waves_runtime::Runtime::new().transition(&blockchain, &tx);
//! ```
//!
//! The core is the invoke-script path: a typed expression [evaluator](lang::evaluate), a
//! static [complexity estimator](lang::estimator), a chained [action
//! interpreter](invoke), synchronous cross-dApp calls, and fee-step accounting — all pure,
//! single-threaded and deterministic. Validation outcomes split into two classes
//! ([error::RejectError] never enters a block, [error::FailedTransactionError] enters it
//! and consumes the fee), with the split height-gated through
//! [ActivationHeights](transition::ActivationHeights).

pub mod blockchain;
pub mod diff;
pub mod error;
pub mod fees;
pub mod invoke;
pub mod lang;
pub mod limits;
pub mod sponsorship;
pub mod transaction;
pub mod transition;
pub mod types;

mod drivers;

pub use blockchain::{Blockchain, CompositeBlockchain, InMemoryBlockchain};
pub use diff::Diff;
pub use error::{FailedTransactionError, RejectError, TraceStep, ValidationError};
pub use transaction::Transaction;
pub use transition::{ActivationHeights, Runtime, TransitionResult};
