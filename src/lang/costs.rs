/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The complexity schedule: structural step costs of the evaluator and the documented
//! per-version cost of every builtin.
//!
//! These numbers are protocol, not tuning. The estimator and the evaluator read the same
//! tables, which is what makes a static estimate an upper bound of the metered run.

use super::ids;
use super::version::StdLibVersion;

/// Cost of materialising any constant.
pub const CONST_COST: u64 = 1;

/// Cost of an `if` node, on top of the taken branch.
pub const IF_COST: u64 = 1;

/// Cost of reading a case-object field.
pub const GETTER_COST: u64 = 2;

/// Overhead of calling a user function, on top of its inlined body.
pub const USER_CALL_COST: u64 = 1;

/// Cost of building a case object through a globally-available constructor.
pub const CONSTRUCTOR_COST: u64 = 1;

/// Cost of resolving a reference.
pub fn ref_cost(version: StdLibVersion) -> u64 {
    match version {
        StdLibVersion::V3 => 2,
        StdLibVersion::V4 | StdLibVersion::V5 => 1,
    }
}

/// Cost of a `let` declaration, charged once when the binding evaluates.
pub fn let_cost(version: StdLibVersion) -> u64 {
    match version {
        StdLibVersion::V3 => 5,
        StdLibVersion::V4 | StdLibVersion::V5 => 1,
    }
}

/// Documented cost of a builtin for `version`. Ids unknown to the table cost nothing to ask
/// about; resolution failures are the evaluator's concern.
pub fn native_cost(id: u16, version: StdLibVersion) -> u64 {
    use ids::*;
    let v4plus = version >= StdLibVersion::V4;
    match id {
        EQ | IS_INSTANCE_OF | THROW => 1,

        TO_BASE58 => tiered(version, 10, 3),
        FROM_BASE58 => tiered(version, 10, 1),
        TO_BASE64 => tiered(version, 10, 35),
        FROM_BASE64 => tiered(version, 10, 40),

        SUM_STRING => tiered(version, 10, 20),
        TAKE_STRING | DROP_STRING => tiered(version, 1, 20),
        SIZE_STRING => 1,
        INDEX_OF => 3,
        SPLIT_STR => tiered(version, 1, 75),
        PARSE_INT_VALUE => tiered(version, 20, 2),

        TAKE_BYTES | DROP_BYTES => tiered(version, 1, 6),
        SIZE_BYTES => 1,
        SUM_BYTES => tiered(version, 10, 2),

        SUM_LONG | SUB_LONG | MUL_LONG | DIV_LONG | MOD_LONG | GT_LONG | GE_LONG => 1,
        FRACTION => tiered(version, 1, 14),
        POW => 100,

        KECCAK256 => tiered(version, 10, 195),
        BLAKE2B256 => tiered(version, 10, 136),
        SHA256 => tiered(version, 10, 118),
        SIG_VERIFY => tiered(version, 100, 200),

        LONG_TO_BYTES | BYTES_TO_LONG | LONG_TO_STRING => 1,
        STRING_TO_BYTES => if v4plus { 8 } else { 1 },
        UTF8_STRING => if v4plus { 7 } else { 1 },

        INVOKE | REENTRANT_INVOKE => 75,

        CREATE_LIST => 1,
        GET_LIST | SIZE_LIST => 2,
        APPEND_LIST => 3,
        CONCAT_LIST => 4,
        CREATE_TUPLE2 | CALCULATE_LEASE_ID => 1,

        _ => 1,
    }
}

fn tiered(version: StdLibVersion, v3: u64, v4plus: u64) -> u64 {
    match version {
        StdLibVersion::V3 => v3,
        StdLibVersion::V4 | StdLibVersion::V5 => v4plus,
    }
}
