/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The stable `u16 -> builtin` table. Ids are wire format: a compiled script referencing
//! id 100 must resolve to the same function on every node, for every protocol version that
//! knows the id. Ids are grouped in bands by domain and never reassigned.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use super::version::StdLibVersion;

// general
pub const EQ: u16 = 0;
pub const IS_INSTANCE_OF: u16 = 1;
pub const THROW: u16 = 2;

// codecs
pub const TO_BASE58: u16 = 100;
pub const FROM_BASE58: u16 = 101;
pub const TO_BASE64: u16 = 102;
pub const FROM_BASE64: u16 = 103;

// strings
pub const SUM_STRING: u16 = 202;
pub const TAKE_STRING: u16 = 203;
pub const DROP_STRING: u16 = 204;
pub const SIZE_STRING: u16 = 205;
pub const INDEX_OF: u16 = 206;
pub const SPLIT_STR: u16 = 207;
pub const PARSE_INT_VALUE: u16 = 208;

// bytes
pub const TAKE_BYTES: u16 = 300;
pub const DROP_BYTES: u16 = 301;
pub const SIZE_BYTES: u16 = 302;
pub const SUM_BYTES: u16 = 303;

// integers
pub const SUM_LONG: u16 = 400;
pub const SUB_LONG: u16 = 401;
pub const MUL_LONG: u16 = 402;
pub const DIV_LONG: u16 = 403;
pub const MOD_LONG: u16 = 404;
pub const FRACTION: u16 = 405;
pub const POW: u16 = 406;
pub const GT_LONG: u16 = 407;
pub const GE_LONG: u16 = 408;

// crypto
pub const KECCAK256: u16 = 500;
pub const BLAKE2B256: u16 = 501;
pub const SHA256: u16 = 502;
pub const SIG_VERIFY: u16 = 503;

// conversions
pub const LONG_TO_BYTES: u16 = 600;
pub const BYTES_TO_LONG: u16 = 601;
pub const STRING_TO_BYTES: u16 = 602;
pub const UTF8_STRING: u16 = 603;
pub const LONG_TO_STRING: u16 = 604;

// synchronous dApp calls
pub const INVOKE: u16 = 1020;
pub const REENTRANT_INVOKE: u16 = 1021;

// lists
pub const CREATE_LIST: u16 = 1100;
pub const GET_LIST: u16 = 1101;
pub const APPEND_LIST: u16 = 1102;
pub const CONCAT_LIST: u16 = 1103;
pub const SIZE_LIST: u16 = 1104;

// tuples and action helpers
pub const CREATE_TUPLE2: u16 = 1200;
pub const CALCULATE_LEASE_ID: u16 = 1201;

pub struct NativeFunction {
    pub id: u16,
    pub name: &'static str,
    pub arity: usize,
    pub min_version: StdLibVersion,
}

/// Every builtin the engine knows, keyed by id.
pub static FUNCTION_TABLE: Lazy<BTreeMap<u16, NativeFunction>> = Lazy::new(|| {
    use StdLibVersion::*;

    let entries = [
        (EQ, "==", 2, V3),
        (IS_INSTANCE_OF, "_isInstanceOf", 2, V3),
        (THROW, "throw", 1, V3),
        (TO_BASE58, "toBase58String", 1, V3),
        (FROM_BASE58, "fromBase58String", 1, V3),
        (TO_BASE64, "toBase64String", 1, V3),
        (FROM_BASE64, "fromBase64String", 1, V3),
        (SUM_STRING, "+", 2, V3),
        (TAKE_STRING, "takeString", 2, V3),
        (DROP_STRING, "dropString", 2, V3),
        (SIZE_STRING, "sizeString", 1, V3),
        (INDEX_OF, "indexOf", 2, V3),
        (SPLIT_STR, "split", 2, V3),
        (PARSE_INT_VALUE, "parseIntValue", 1, V3),
        (TAKE_BYTES, "takeBytes", 2, V3),
        (DROP_BYTES, "dropBytes", 2, V3),
        (SIZE_BYTES, "sizeBytes", 1, V3),
        (SUM_BYTES, "++", 2, V3),
        (SUM_LONG, "+", 2, V3),
        (SUB_LONG, "-", 2, V3),
        (MUL_LONG, "*", 2, V3),
        (DIV_LONG, "/", 2, V3),
        (MOD_LONG, "%", 2, V3),
        (FRACTION, "fraction", 3, V3),
        (POW, "pow", 2, V3),
        (GT_LONG, ">", 2, V3),
        (GE_LONG, ">=", 2, V3),
        (KECCAK256, "keccak256", 1, V3),
        (BLAKE2B256, "blake2b256", 1, V3),
        (SHA256, "sha256", 1, V3),
        (SIG_VERIFY, "sigVerify", 3, V3),
        (LONG_TO_BYTES, "toBytes", 1, V3),
        (BYTES_TO_LONG, "toInt", 1, V3),
        (STRING_TO_BYTES, "toBytes", 1, V3),
        (UTF8_STRING, "toUtf8String", 1, V3),
        (LONG_TO_STRING, "toString", 1, V3),
        (INVOKE, "invoke", 4, V5),
        (REENTRANT_INVOKE, "reentrantInvoke", 4, V5),
        (CREATE_LIST, "cons", 2, V3),
        (GET_LIST, "getElement", 2, V3),
        (APPEND_LIST, ":+", 2, V4),
        (CONCAT_LIST, "++", 2, V4),
        (SIZE_LIST, "size", 1, V3),
        (CREATE_TUPLE2, "tuple2", 2, V5),
        (CALCULATE_LEASE_ID, "calculateLeaseId", 1, V5),
    ];

    entries
        .into_iter()
        .map(|(id, name, arity, min_version)| {
            (
                id,
                NativeFunction {
                    id,
                    name,
                    arity,
                    min_version,
                },
            )
        })
        .collect()
});

/// Looks a builtin up, respecting the version it appeared in.
pub fn function(id: u16, version: StdLibVersion) -> Option<&'static NativeFunction> {
    FUNCTION_TABLE.get(&id).filter(|f| version >= f.min_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_fixed_ids_hold() {
        assert_eq!(FUNCTION_TABLE[&100].name, "toBase58String");
        assert_eq!(FUNCTION_TABLE[&101].name, "fromBase58String");
        assert_eq!(FUNCTION_TABLE[&202].name, "+");
        assert_eq!(FUNCTION_TABLE[&1100].name, "cons");
        assert_eq!(FUNCTION_TABLE[&1101].name, "getElement");
        assert_eq!(FUNCTION_TABLE[&1102].name, ":+");
        assert_eq!(FUNCTION_TABLE[&1103].name, "++");
    }

    #[test]
    fn version_gating() {
        assert!(function(INVOKE, StdLibVersion::V4).is_none());
        assert!(function(INVOKE, StdLibVersion::V5).is_some());
        assert!(function(APPEND_LIST, StdLibVersion::V3).is_none());
        assert!(function(APPEND_LIST, StdLibVersion::V4).is_some());
    }
}
