/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Native implementations of the builtin functions.
//!
//! Each builtin has an exact semantic contract: same arguments, same result, on every node.
//! Historically sloppy edge cases (slicing past the end, byte-based string indexing,
//! saturating exponentiation) are kept bug-for-bug and only fixed behind the explicit
//! [LangConfig] switches or a `V5` version gate.

use crate::error::ExecutionError;
use crate::limits::{MAX_BASE58_STRING, MAX_BASE64_STRING};
use crate::types::{blake2b256, keccak256, ByteStr};

use super::ids;
use super::value::Value;
use super::version::{LangConfig, StdLibVersion};

/// Dispatches one builtin call. `INVOKE`/`REENTRANT_INVOKE` never reach this function;
/// the evaluator intercepts them.
pub fn call_native(
    id: u16,
    args: &[Value],
    version: StdLibVersion,
    config: &LangConfig,
) -> Result<Value, ExecutionError> {
    use ids::*;
    match id {
        EQ => Ok(Value::Bool(args[0] == args[1])),
        IS_INSTANCE_OF => Ok(Value::Bool(args[0].type_name() == args[1].as_str()?)),
        THROW => Err(ExecutionError::Throw(args[0].as_str()?.to_owned())),

        TO_BASE58 => Value::string(bs58::encode(args[0].as_bytes()?.as_bytes()).into_string()),
        FROM_BASE58 => from_base58(args[0].as_str()?, version),
        // codec output sizes are bounded by the codec input caps, not the value caps:
        // a full 32 KiB vector must survive the base64 round trip
        TO_BASE64 => Ok(Value::Str(base64::encode(args[0].as_bytes()?.as_bytes()))),
        FROM_BASE64 => from_base64(args[0].as_str()?),

        SUM_STRING => {
            let mut combined = args[0].as_str()?.to_owned();
            combined.push_str(args[1].as_str()?);
            Value::string(combined)
        }
        TAKE_STRING => take_string(args[0].as_str()?, args[1].as_long()?, config),
        DROP_STRING => drop_string(args[0].as_str()?, args[1].as_long()?, config),
        SIZE_STRING => {
            let string = args[0].as_str()?;
            let size = if config.fix_unicode_functions {
                string.chars().count()
            } else {
                string.len()
            };
            Ok(Value::Long(size as i64))
        }
        INDEX_OF => index_of(args[0].as_str()?, args[1].as_str()?, config),
        SPLIT_STR => {
            let parts: Result<Vec<Value>, ExecutionError> = args[0]
                .as_str()?
                .split(args[1].as_str()?)
                .map(Value::string)
                .collect();
            Value::list(parts?)
        }
        PARSE_INT_VALUE => args[0]
            .as_str()?
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|_| ExecutionError::Throw(format!("could not parse '{}' as Int", args[0].as_str().unwrap_or("")))),

        TAKE_BYTES => {
            let bytes = args[0].as_bytes()?.as_bytes();
            let n = clamp_index(args[1].as_long()?, bytes.len());
            Value::bytes(&bytes[..n])
        }
        DROP_BYTES => {
            let bytes = args[0].as_bytes()?.as_bytes();
            let n = clamp_index(args[1].as_long()?, bytes.len());
            Value::bytes(&bytes[n..])
        }
        SIZE_BYTES => Ok(Value::Long(args[0].as_bytes()?.len() as i64)),
        SUM_BYTES => {
            let mut combined = args[0].as_bytes()?.as_bytes().to_vec();
            combined.extend_from_slice(args[1].as_bytes()?.as_bytes());
            Value::bytes(combined)
        }

        SUM_LONG => checked_arithmetic(args[0].as_long()?.checked_add(args[1].as_long()?)),
        SUB_LONG => checked_arithmetic(args[0].as_long()?.checked_sub(args[1].as_long()?)),
        MUL_LONG => checked_arithmetic(args[0].as_long()?.checked_mul(args[1].as_long()?)),
        DIV_LONG => floor_div(args[0].as_long()?, args[1].as_long()?).map(Value::Long),
        MOD_LONG => floor_mod(args[0].as_long()?, args[1].as_long()?).map(Value::Long),
        FRACTION => fraction(args[0].as_long()?, args[1].as_long()?, args[2].as_long()?),
        POW => pow(args[0].as_long()?, args[1].as_long()?, config),
        GT_LONG => Ok(Value::Bool(args[0].as_long()? > args[1].as_long()?)),
        GE_LONG => Ok(Value::Bool(args[0].as_long()? >= args[1].as_long()?)),

        KECCAK256 => Value::bytes(keccak256(args[0].as_bytes()?.as_bytes()).to_vec()),
        BLAKE2B256 => Value::bytes(blake2b256(args[0].as_bytes()?.as_bytes()).to_vec()),
        SHA256 => {
            use sha2::{Digest, Sha256};
            Value::bytes(Sha256::digest(args[0].as_bytes()?.as_bytes()).to_vec())
        }
        SIG_VERIFY => sig_verify(args[0].as_bytes()?, args[1].as_bytes()?, args[2].as_bytes()?),

        LONG_TO_BYTES => Value::bytes(args[0].as_long()?.to_be_bytes().to_vec()),
        BYTES_TO_LONG => bytes_to_long(args[0].as_bytes()?),
        STRING_TO_BYTES => Value::bytes(args[0].as_str()?.as_bytes().to_vec()),
        UTF8_STRING => utf8_string(args[0].as_bytes()?),
        LONG_TO_STRING => Value::string(args[0].as_long()?.to_string()),

        CREATE_LIST => {
            let mut items = vec![args[0].clone()];
            items.extend_from_slice(args[1].as_list()?);
            Value::list(items)
        }
        GET_LIST => {
            let items = args[0].as_list()?;
            let index = args[1].as_long()?;
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| {
                    ExecutionError::Throw(format!("index {} out of bounds for list of size {}", index, items.len()))
                })
        }
        APPEND_LIST => {
            let mut items = args[0].as_list()?.to_vec();
            items.push(args[1].clone());
            Value::list(items)
        }
        CONCAT_LIST => {
            let mut items = args[0].as_list()?.to_vec();
            items.extend_from_slice(args[1].as_list()?);
            Value::list(items)
        }
        SIZE_LIST => Ok(Value::Long(args[0].as_list()?.len() as i64)),

        other => Err(ExecutionError::FunctionNotFound(format!("native {}", other))),
    }
}

fn checked_arithmetic(result: Option<i64>) -> Result<Value, ExecutionError> {
    result
        .map(Value::Long)
        .ok_or_else(|| ExecutionError::Throw("long overflow".to_owned()))
}

// floorDiv semantics: quotient rounds toward negative infinity.
fn floor_div(a: i64, b: i64) -> Result<i64, ExecutionError> {
    if b == 0 {
        return Err(ExecutionError::Throw("division by zero".to_owned()));
    }
    let quotient = a
        .checked_div(b)
        .ok_or_else(|| ExecutionError::Throw("long overflow".to_owned()))?;
    let remainder = a % b;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn floor_mod(a: i64, b: i64) -> Result<i64, ExecutionError> {
    let quotient = floor_div(a, b)?;
    Ok(a - quotient * b)
}

fn fraction(value: i64, numerator: i64, denominator: i64) -> Result<Value, ExecutionError> {
    if denominator == 0 {
        return Err(ExecutionError::Throw("fraction: division by zero".to_owned()));
    }
    let wide = (value as i128) * (numerator as i128) / (denominator as i128);
    i64::try_from(wide)
        .map(Value::Long)
        .map_err(|_| ExecutionError::Throw("long overflow".to_owned()))
}

// Exponentiation kept the way it historically behaved: saturating on overflow. The new
// precision switch makes overflow an error instead.
fn pow(base: i64, exponent: i64, config: &LangConfig) -> Result<Value, ExecutionError> {
    let exponent = u32::try_from(exponent)
        .map_err(|_| ExecutionError::Throw(format!("pow: invalid exponent {}", exponent)))?;
    if config.use_new_pow_precision {
        base.checked_pow(exponent)
            .map(Value::Long)
            .ok_or_else(|| ExecutionError::Throw("long overflow".to_owned()))
    } else {
        Ok(Value::Long(base.saturating_pow(exponent)))
    }
}

fn from_base58(input: &str, version: StdLibVersion) -> Result<Value, ExecutionError> {
    // the input-length check is a V5 fix; older versions decoded any length
    if version >= StdLibVersion::V5 && input.len() > MAX_BASE58_STRING {
        return Err(ExecutionError::LimitExceeded(format!(
            "base58 input length = {} exceeds {}",
            input.len(),
            MAX_BASE58_STRING
        )));
    }
    let decoded = bs58::decode(input)
        .into_vec()
        .map_err(|_| ExecutionError::Throw(format!("can't parse '{}' as base58 string", input)))?;
    Value::bytes(decoded)
}

fn from_base64(input: &str) -> Result<Value, ExecutionError> {
    let stripped = input.strip_prefix("base64:").unwrap_or(input);
    let decoded = base64::decode(stripped)
        .map_err(|_| ExecutionError::Throw("can't parse the input as a base64 string".to_owned()))?;
    if decoded.len() > MAX_BASE64_STRING {
        return Err(ExecutionError::LimitExceeded(format!(
            "base64 decoded size = {} bytes exceeds {}",
            decoded.len(),
            MAX_BASE64_STRING
        )));
    }
    Ok(Value::Bytes(ByteStr::from(decoded)))
}

// take/drop saturate at both ends per historical behaviour; negative counts mean zero.
fn clamp_index(n: i64, len: usize) -> usize {
    usize::try_from(n).unwrap_or(0).min(len)
}

fn take_string(string: &str, n: i64, config: &LangConfig) -> Result<Value, ExecutionError> {
    if config.fix_unicode_functions {
        let count = clamp_index(n, string.chars().count());
        Value::string(string.chars().take(count).collect::<String>())
    } else {
        let count = clamp_index(n, string.len());
        Value::string(String::from_utf8_lossy(&string.as_bytes()[..count]).into_owned())
    }
}

fn drop_string(string: &str, n: i64, config: &LangConfig) -> Result<Value, ExecutionError> {
    if config.fix_unicode_functions {
        let count = clamp_index(n, string.chars().count());
        Value::string(string.chars().skip(count).collect::<String>())
    } else {
        let count = clamp_index(n, string.len());
        Value::string(String::from_utf8_lossy(&string.as_bytes()[count..]).into_owned())
    }
}

fn index_of(haystack: &str, needle: &str, config: &LangConfig) -> Result<Value, ExecutionError> {
    match haystack.find(needle) {
        None => Ok(Value::Unit),
        Some(byte_index) => {
            let index = if config.fix_unicode_functions {
                haystack[..byte_index].chars().count()
            } else {
                byte_index
            };
            Ok(Value::Long(index as i64))
        }
    }
}

fn sig_verify(message: &ByteStr, signature: &ByteStr, public_key: &ByteStr) -> Result<Value, ExecutionError> {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key.as_bytes()) else {
        return Ok(Value::Bool(false));
    };
    let Ok(signature_bytes) = <[u8; 64]>::try_from(signature.as_bytes()) else {
        return Ok(Value::Bool(false));
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return Ok(Value::Bool(false));
    };
    let verified = verifying_key
        .verify(message.as_bytes(), &Signature::from_bytes(&signature_bytes))
        .is_ok();
    Ok(Value::Bool(verified))
}

fn bytes_to_long(bytes: &ByteStr) -> Result<Value, ExecutionError> {
    let slice = bytes.as_bytes();
    if slice.len() < 8 {
        return Err(ExecutionError::Throw(format!(
            "toInt: expected at least 8 bytes, got {}",
            slice.len()
        )));
    }
    let mut fixed = [0u8; 8];
    fixed.copy_from_slice(&slice[..8]);
    Ok(Value::Long(i64::from_be_bytes(fixed)))
}

fn utf8_string(bytes: &ByteStr) -> Result<Value, ExecutionError> {
    match std::str::from_utf8(bytes.as_bytes()) {
        Ok(string) => Value::string(string),
        Err(_) => Err(ExecutionError::Throw("invalid UTF-8 sequence".to_owned())),
    }
}

/// Field layout of the globally-available case-object constructors. Scripts call these by
/// name like user functions; the compiler leaves them unresolved and the evaluator binds
/// them here. Field order is the declared order actions and renderings rely on.
pub fn constructor_fields(name: &str) -> Option<&'static [&'static str]> {
    Some(match name {
        "ScriptTransfer" => &["recipient", "amount", "asset"],
        "IntegerEntry" | "BooleanEntry" | "BinaryEntry" | "StringEntry" => &["key", "value"],
        "DeleteEntry" => &["key"],
        "Issue" => &["name", "description", "quantity", "decimals", "isReissuable", "nonce"],
        "Reissue" => &["assetId", "quantity", "isReissuable"],
        "Burn" => &["assetId", "quantity"],
        "SponsorFee" => &["assetId", "minSponsoredAssetFee"],
        "Lease" => &["recipient", "amount", "nonce"],
        "LeaseCancel" => &["leaseId"],
        "Address" => &["bytes"],
        "Alias" => &["alias"],
        "AttachedPayment" => &["assetId", "amount"],
        _ => return None,
    })
}

pub fn construct(name: &str, fields: &[&'static str], args: &[Value]) -> Result<Value, ExecutionError> {
    if args.len() != fields.len() {
        return Err(ExecutionError::TypeMismatch(format!(
            "{} takes {} arguments, got {}",
            name,
            fields.len(),
            args.len()
        )));
    }
    Ok(Value::case(
        name,
        fields
            .iter()
            .zip(args.iter())
            .map(|(field, value)| ((*field).to_owned(), value.clone()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(fixed: bool) -> LangConfig {
        LangConfig {
            fix_unicode_functions: fixed,
            use_new_pow_precision: fixed,
            disallow_self_payment: true,
        }
    }

    fn call(id: u16, args: &[Value]) -> Result<Value, ExecutionError> {
        call_native(id, args, StdLibVersion::V5, &cfg(true))
    }

    #[test]
    fn base58_roundtrip() {
        let bytes = Value::Bytes(ByteStr::from(vec![0, 1, 2, 250, 251, 252]));
        let encoded = call(ids::TO_BASE58, &[bytes.clone()]).unwrap();
        let decoded = call(ids::FROM_BASE58, &[encoded]).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn base64_roundtrip_and_prefix() {
        let bytes = Value::Bytes(ByteStr::from(vec![9u8; 100]));
        let encoded = call(ids::TO_BASE64, &[bytes.clone()]).unwrap();
        assert_eq!(call(ids::FROM_BASE64, &[encoded.clone()]).unwrap(), bytes);

        let prefixed = Value::Str(format!("base64:{}", encoded.as_str().unwrap()));
        assert_eq!(call(ids::FROM_BASE64, &[prefixed]).unwrap(), bytes);
    }

    #[test]
    fn long_bytes_roundtrip() {
        for n in [0i64, 1, -1, i64::MAX, i64::MIN, 42] {
            let bytes = call(ids::LONG_TO_BYTES, &[Value::Long(n)]).unwrap();
            assert_eq!(call(ids::BYTES_TO_LONG, &[bytes]).unwrap(), Value::Long(n));
        }
    }

    #[test]
    fn take_saturates_past_the_end() {
        let bytes = Value::Bytes(ByteStr::from(vec![1, 2, 3]));
        assert_eq!(
            call(ids::TAKE_BYTES, &[bytes.clone(), Value::Long(10)]).unwrap(),
            bytes
        );
        assert_eq!(
            call(ids::TAKE_BYTES, &[bytes, Value::Long(-5)]).unwrap(),
            Value::Bytes(ByteStr::default())
        );
    }

    #[test]
    fn unicode_fix_changes_string_size() {
        let snowman = Value::Str("☃abc".to_owned());
        let fixed = call_native(ids::SIZE_STRING, &[snowman.clone()], StdLibVersion::V5, &cfg(true)).unwrap();
        assert_eq!(fixed, Value::Long(4));
        let legacy = call_native(ids::SIZE_STRING, &[snowman], StdLibVersion::V4, &cfg(false)).unwrap();
        assert_eq!(legacy, Value::Long(6));
    }

    #[test]
    fn pow_saturates_only_under_old_precision() {
        let legacy = call_native(
            ids::POW,
            &[Value::Long(i64::MAX), Value::Long(2)],
            StdLibVersion::V4,
            &cfg(false),
        )
        .unwrap();
        assert_eq!(legacy, Value::Long(i64::MAX));

        let fixed = call_native(
            ids::POW,
            &[Value::Long(i64::MAX), Value::Long(2)],
            StdLibVersion::V5,
            &cfg(true),
        );
        assert!(matches!(fixed, Err(ExecutionError::Throw(_))));
    }

    #[test]
    fn floor_division() {
        assert_eq!(call(ids::DIV_LONG, &[Value::Long(-7), Value::Long(2)]).unwrap(), Value::Long(-4));
        assert_eq!(call(ids::MOD_LONG, &[Value::Long(-7), Value::Long(2)]).unwrap(), Value::Long(1));
        assert!(matches!(
            call(ids::DIV_LONG, &[Value::Long(1), Value::Long(0)]),
            Err(ExecutionError::Throw(_))
        ));
    }

    #[test]
    fn list_operations() {
        let list = call(ids::CREATE_LIST, &[Value::Long(1), Value::List(vec![])]).unwrap();
        let list = call(ids::APPEND_LIST, &[list, Value::Long(2)]).unwrap();
        assert_eq!(call(ids::SIZE_LIST, &[list.clone()]).unwrap(), Value::Long(2));
        assert_eq!(call(ids::GET_LIST, &[list.clone(), Value::Long(1)]).unwrap(), Value::Long(2));
        assert!(matches!(
            call(ids::GET_LIST, &[list, Value::Long(5)]),
            Err(ExecutionError::Throw(_))
        ));
    }

    #[test]
    fn sig_verify_rejects_garbage_without_failing() {
        let result = call(
            ids::SIG_VERIFY,
            &[
                Value::Bytes(ByteStr::from(vec![1, 2, 3])),
                Value::Bytes(ByteStr::from(vec![0u8; 64])),
                Value::Bytes(ByteStr::from(vec![0u8; 32])),
            ],
        )
        .unwrap();
        assert_eq!(result, Value::Bool(false));
    }
}
