/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Entry point of diff computation.
//!
//! The struct [Runtime] turns one [Transaction] plus a committed [Blockchain] snapshot into
//! a [TransitionResult]: a [Diff] describing every state mutation the transaction causes, or
//! a structured validation error, plus per-step trace records.
//!
//! ```text
//! f(B, TX) -> Result<Diff, Error> + Trace
//!
//! B    = read-only snapshot of committed chain state
//! TX   = one transaction
//! Diff = deterministic, composable description of the state mutations
//! ```
//!
//! Instances of [Runtime] share the same execution logic but differ in configuration: the
//! activation heights of protocol rules and the language semantic switches. Both are plain
//! values threaded through pure functions; the runtime holds no mutable state and a single
//! instance may serve any number of threads each with its own snapshot.

use crate::blockchain::Blockchain;
use crate::diff::Diff;
use crate::drivers;
use crate::error::{TraceStep, ValidationError};
use crate::lang::LangConfig;
use crate::transaction::Transaction;
use crate::types::Height;

/// Heights at which protocol rules activate. Heights are inclusive: a rule is active at
/// every height `>=` its threshold. The defaults activate everything from genesis, which is
/// what fresh chains and most tests want; mainnet replay injects the historical values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationHeights {
    /// dApps and the invoke-script transaction. Before this height the fee-plus-amount
    /// overflow check of the transfer driver is still active.
    pub ride4dapps: Height,
    /// Sponsored fees.
    pub sponsorship: Height,
    /// Write-set total byte size causes fail-for-fee.
    pub check_total_data_entries_bytes: Height,
    /// Misbehaving actions (negative amounts, existing assets, oversized write sets)
    /// reject instead of failing for the fee.
    pub sync_dapp_check_transfers: Height,
}

impl Default for ActivationHeights {
    fn default() -> Self {
        Self {
            ride4dapps: 0,
            sponsorship: 0,
            check_total_data_entries_bytes: 0,
            sync_dapp_check_transfers: 0,
        }
    }
}

/// Result of one diff computation. The trace is populated on both success and failure.
#[derive(Clone, Debug)]
pub struct TransitionResult {
    pub diff: Result<Diff, ValidationError>,
    pub trace: Vec<TraceStep>,
}

impl TransitionResult {
    pub fn is_applied(&self) -> bool {
        self.diff.is_ok()
    }
}

/// A runtime for diff computation.
pub struct Runtime {
    activation: ActivationHeights,
    lang_config: LangConfig,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            activation: ActivationHeights::default(),
            lang_config: LangConfig::default(),
        }
    }

    /// Overrides the activation heights, e.g. for historical replay.
    pub fn with_activation_heights(mut self, activation: ActivationHeights) -> Self {
        self.activation = activation;
        self
    }

    /// Overrides the language semantic switches.
    pub fn with_lang_config(mut self, lang_config: LangConfig) -> Self {
        self.lang_config = lang_config;
        self
    }

    /// Computes the diff of `tx` against `blockchain`. The snapshot must stay consistent
    /// for the duration of the call; the runtime itself never writes.
    pub fn transition<B: Blockchain>(&self, blockchain: &B, tx: &Transaction) -> TransitionResult {
        let ctx = drivers::DriverContext {
            blockchain,
            tx,
            height: blockchain.height(),
            activation: self.activation,
            lang_config: self.lang_config,
        };
        let (diff, trace) = drivers::diff_for_transaction(&ctx);
        if let Err(error) = &diff {
            log::debug!("transaction {} not applied: {}", tx.id, error);
        }
        TransitionResult { diff, trace }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
