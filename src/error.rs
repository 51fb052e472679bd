/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines sets of error definitions in the entire lifetime of diff computation.
//!
//! Two classes exist at the top level. A [RejectError] means the transaction never enters a
//! block. A [FailedTransactionError] means the transaction enters the block and its fee is
//! consumed, but no state mutation besides the fee is applied. Which class a given misbehaviour
//! falls into is in several cases gated by activation height; drivers decide, this module only
//! defines the vocabulary.

use thiserror::Error;

use crate::lang::EvaluationLog;
use crate::types::{Address, Alias, AssetId};

/// Validation outcome that keeps the transaction out of the block entirely.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RejectError {
    /// Proof does not verify against the sender key.
    #[error("invalid signature")]
    InvalidSignature,

    /// Malformed address bytes: length, version or checksum.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Balance arithmetic left the i64 range.
    #[error("overflow while summing amounts")]
    OverflowError,

    #[error("{0}")]
    GenericError(String),

    /// Attached fee below the statically-known minimum.
    #[error("insufficient fee: {0}")]
    InsufficientFee(String),

    /// Amount fields that must be strictly positive.
    #[error("non-positive amount: {amount} of {of}")]
    NonPositiveAmount { amount: i64, of: String },

    /// Reference to an asset id the chain has never seen.
    #[error("asset {0} is not issued")]
    UnissuedAsset(AssetId),

    #[error("alias {0} does not exist")]
    AliasDoesNotExist(Alias),

    /// Sender cannot cover amount plus fee.
    #[error("account balance error: {0}")]
    AccountBalanceError(String),

    /// A dApp on the call stack was invoked again without `reentrantInvoke`.
    #[error("the invocation stack contains multiple invocations of the dApp at address {0}")]
    ReentrancyDisallowed(Address),

    /// Since `sync_dapp_check_transfers` height: negative action amounts reject.
    #[error("{0}")]
    NegativeAmount(String),

    /// Since `sync_dapp_check_transfers` height: issuing an existing asset rejects.
    #[error("asset {0} is already issued")]
    AssetAlreadyExists(AssetId),

    /// Since `sync_dapp_check_transfers` height: oversized write sets reject.
    #[error("{0}")]
    WriteSetTooLarge(String),
}

/// Validation outcome that lets the transaction into the block with its fee consumed
/// and all other state mutations discarded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FailedTransactionError {
    /// Runtime error inside the dApp callable itself.
    #[error("dApp execution failed: {message}")]
    DAppExecution {
        message: String,
        spent_complexity: u64,
        log: EvaluationLog,
    },

    /// Runtime error inside an asset script called for one of the actions.
    #[error("asset script of {asset} failed in action: {message}")]
    AssetExecutionInAction {
        message: String,
        spent_complexity: u64,
        log: EvaluationLog,
        asset: AssetId,
    },

    /// Asset script evaluated to `false` for one of the actions.
    #[error("transaction is not allowed by asset script of {asset}")]
    NotAllowedByAssetInAction {
        spent_complexity: u64,
        log: EvaluationLog,
        asset: AssetId,
    },

    /// Attached fee below the minimum computed after the action fold.
    #[error("fee for actions: {message}")]
    FeeForActions { message: String, spent_complexity: u64 },
}

impl FailedTransactionError {
    pub fn spent_complexity(&self) -> u64 {
        match self {
            FailedTransactionError::DAppExecution { spent_complexity, .. }
            | FailedTransactionError::AssetExecutionInAction { spent_complexity, .. }
            | FailedTransactionError::NotAllowedByAssetInAction { spent_complexity, .. }
            | FailedTransactionError::FeeForActions { spent_complexity, .. } => *spent_complexity,
        }
    }

    /// Errors met later in the action fold add their local cost to the running total,
    /// so the block records all complexity actually spent.
    pub fn with_added_complexity(mut self, extra: u64) -> Self {
        match &mut self {
            FailedTransactionError::DAppExecution { spent_complexity, .. }
            | FailedTransactionError::AssetExecutionInAction { spent_complexity, .. }
            | FailedTransactionError::NotAllowedByAssetInAction { spent_complexity, .. }
            | FailedTransactionError::FeeForActions { spent_complexity, .. } => {
                *spent_complexity = spent_complexity.saturating_add(extra);
            }
        }
        self
    }
}

/// Any outcome of `Transaction -> Diff` that is not a successfully applied diff.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Reject(RejectError),
    #[error(transparent)]
    Failed(FailedTransactionError),
}

impl From<RejectError> for ValidationError {
    fn from(error: RejectError) -> Self {
        ValidationError::Reject(error)
    }
}

impl From<FailedTransactionError> for ValidationError {
    fn from(error: FailedTransactionError) -> Self {
        ValidationError::Failed(error)
    }
}

impl From<BalanceOverflow> for RejectError {
    fn from(_: BalanceOverflow) -> Self {
        RejectError::OverflowError
    }
}

/// Evaluator-internal error. Drivers translate it into the two public classes; the
/// [Rejected](ExecutionError::Rejected) variant is rejection control flow that must never be
/// converted into a fail-for-fee outcome.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Budget exhausted; consumed complexity equals the limit.
    #[error("evaluation complexity limit reached")]
    ComplexityLimitExceeded,

    /// Call depth cap exceeded.
    #[error("evaluation stack overflow")]
    StackOverflow,

    /// A value violated a protocol size cap on construction.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("function {0} not found")]
    FunctionNotFound(String),

    #[error("reference {0} not found")]
    RefNotFound(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Script called `throw`.
    #[error("{0}")]
    Throw(String),

    /// A nested action demanded rejection at the current height. Must bypass the
    /// fail-for-fee handler on the way out of the evaluator.
    #[error(transparent)]
    Rejected(Box<RejectError>),
}

/// Signals checked-addition overflow during diff combination. The caller decides
/// whether to surface it as a [RejectError] or a [FailedTransactionError].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceOverflow {
    pub address: Address,
    pub asset: AssetId,
}

/// Per-step diagnostic record accumulated while a driver runs. Returned alongside the diff
/// or the error so callers can explain a verdict without re-executing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceStep {
    /// One asset-script verification inside the action fold.
    AssetScript {
        asset: AssetId,
        result: Result<bool, String>,
        log: EvaluationLog,
    },
    /// Min-fee attributes attached when fee checking decides the outcome.
    FeeAttributes { min_fee: i64 },
}
