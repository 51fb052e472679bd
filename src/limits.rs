/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Protocol limit tables. Everything here is a process-wide read-only constant or a pure
//! per-version lookup; the tables never change after initialisation.

use crate::lang::StdLibVersion;

/// Serialized size cap of a data transaction (binary format).
pub const DATA_TX_MAX_BYTES: usize = 153_600;

/// Serialized size cap of a data transaction (protobuf format, tx version 2+).
pub const DATA_TX_MAX_PROTO_BYTES: usize = 165_890;

/// Entry-count cap of a data transaction.
pub const MAX_ENTRY_COUNT: usize = 100;

/// Byte cap of the whole write set produced by one invocation.
pub const MAX_TOTAL_WRITE_SET_SIZE_IN_BYTES: usize = 15_360;

/// Input cap of the base58 decoder, in characters.
pub const MAX_BASE58_STRING: usize = 100;

/// Size cap of the base64 codec, counted over the decoded bytes.
pub const MAX_BASE64_STRING: usize = 32 * 1024;

/// Value size caps of the evaluator's string and byte values.
pub const MAX_STRING_SIZE: usize = 32_767;
pub const MAX_BYTESTR_SIZE: usize = 32_767;
pub const MAX_LIST_SIZE: usize = 1_000;

/// Evaluator call-depth cap.
pub const MAX_CALL_DEPTH: u32 = 100;

/// Synchronous dApp-call depth cap.
pub const MAX_SYNC_DEPTH: u32 = 100;

/// Accumulated complexity cap across one transaction, sync calls included.
pub const TOTAL_COMPLEXITY_LIMIT: u64 = 26_000;

/// Data-entry key size cap, UTF-8 bytes.
pub fn max_key_size(version: StdLibVersion) -> usize {
    match version {
        StdLibVersion::V3 => 100,
        StdLibVersion::V4 | StdLibVersion::V5 => 400,
    }
}

/// Data-op count cap of one invocation.
pub fn max_write_set_size(_version: StdLibVersion) -> usize {
    100
}

/// Non-data action count cap of one invocation.
pub fn max_callable_actions(version: StdLibVersion) -> usize {
    match version {
        StdLibVersion::V3 | StdLibVersion::V4 => 10,
        StdLibVersion::V5 => 30,
    }
}

/// Complexity budget of one fee step.
pub fn step_limit(version: StdLibVersion) -> u64 {
    match version {
        StdLibVersion::V3 | StdLibVersion::V4 => 4_000,
        StdLibVersion::V5 => 10_000,
    }
}
