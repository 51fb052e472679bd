/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The invoke-script machinery: callable actions, the action interpreter, pseudo-transaction
//! verification of asset scripts, and synchronous cross-dApp calls.

pub mod actions;
pub mod interpreter;
pub mod pseudo_tx;
pub mod sync;

pub use actions::{issued_asset_id, lease_id, CallableAction};
pub use pseudo_tx::PseudoTx;
