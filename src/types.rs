/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Primitive value types of the chain: byte strings, addresses, aliases, asset ids,
//! data entries, and the hash functions their derivations use.
//!
//! Everything here is an immutable value type with structural equality. Addresses and aliases
//! validate themselves on construction; an [Address] or [Alias] value that exists is well-formed.

use std::fmt;

use borsh::BorshSerialize;

use crate::error::RejectError;

/// Ed25519 public key of an account.
pub type PublicKey = [u8; 32];

/// Block height. Activation of protocol rules is expressed as a height threshold.
pub type Height = u32;

pub const ADDRESS_LENGTH: usize = 26;
pub const ADDRESS_VERSION: u8 = 1;
pub const ALIAS_VERSION: u8 = 2;
pub const ALIAS_MIN_LENGTH: usize = 4;
pub const ALIAS_MAX_LENGTH: usize = 30;
pub const ASSET_ID_LENGTH: usize = 32;
pub const TX_ID_LENGTH: usize = 32;

/// Immutable byte sequence with equality by content. Renders as `base58'…'`,
/// which is also the canonical textual form used in evaluation logs.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize)]
pub struct ByteStr(Vec<u8>);

impl ByteStr {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteStr {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteStr {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ByteStr {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "base58'{}'", bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// 26-byte account address: version byte, chain id, 20-byte public key hash, 4-byte checksum.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Derives the address of `public_key` on the chain identified by `chain_id`.
    pub fn from_public_key(chain_id: u8, public_key: &PublicKey) -> Self {
        let hash = secure_hash(public_key);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[0] = ADDRESS_VERSION;
        bytes[1] = chain_id;
        bytes[2..22].copy_from_slice(&hash[..20]);
        let checksum = secure_hash(&bytes[..22]);
        bytes[22..].copy_from_slice(&checksum[..4]);
        Self(bytes)
    }

    /// Validates length, version byte and checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RejectError> {
        if bytes.len() != ADDRESS_LENGTH {
            return Err(RejectError::InvalidAddress(format!(
                "wrong address length: expected {}, got {}",
                ADDRESS_LENGTH,
                bytes.len()
            )));
        }
        if bytes[0] != ADDRESS_VERSION {
            return Err(RejectError::InvalidAddress(format!(
                "unknown address version {}",
                bytes[0]
            )));
        }
        let checksum = secure_hash(&bytes[..22]);
        if checksum[..4] != bytes[22..] {
            return Err(RejectError::InvalidAddress("bad address checksum".to_owned()));
        }
        let mut fixed = [0u8; ADDRESS_LENGTH];
        fixed.copy_from_slice(bytes);
        Ok(Self(fixed))
    }

    pub fn chain_id(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Short account name registered on chain. Charset is `[a-z0-9.@_-]`, length 4 to 30.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize)]
pub struct Alias {
    chain_id: u8,
    name: String,
}

impl Alias {
    pub fn new(chain_id: u8, name: &str) -> Result<Self, RejectError> {
        if name.len() < ALIAS_MIN_LENGTH || name.len() > ALIAS_MAX_LENGTH {
            return Err(RejectError::GenericError(format!(
                "alias '{}' length should be between {} and {}",
                name, ALIAS_MIN_LENGTH, ALIAS_MAX_LENGTH
            )));
        }
        let valid = name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'@' | b'_' | b'-'));
        if !valid {
            return Err(RejectError::GenericError(format!(
                "alias '{}' contains invalid characters",
                name
            )));
        }
        Ok(Self {
            chain_id,
            name: name.to_owned(),
        })
    }

    pub fn chain_id(&self) -> u8 {
        self.chain_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "alias:{}:{}", self.chain_id as char, self.name)
    }
}

impl fmt::Debug for Alias {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Transfer and lease destinations are either a concrete address or an alias
/// that drivers resolve against the chain before building portfolio diffs.
#[derive(Clone, PartialEq, Eq, Hash, BorshSerialize)]
pub enum Recipient {
    Address(Address),
    Alias(Alias),
}

impl Recipient {
    /// Byte form used in deterministic id derivation (lease ids).
    pub fn to_id_bytes(&self) -> Vec<u8> {
        match self {
            Recipient::Address(address) => address.as_bytes().to_vec(),
            Recipient::Alias(alias) => {
                let mut bytes = vec![ALIAS_VERSION, alias.chain_id()];
                bytes.extend_from_slice(alias.name().as_bytes());
                bytes
            }
        }
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Recipient::Address(address) => write!(f, "{}", address),
            Recipient::Alias(alias) => write!(f, "{}", alias),
        }
    }
}

impl From<Address> for Recipient {
    fn from(address: Address) -> Self {
        Recipient::Address(address)
    }
}

impl From<Alias> for Recipient {
    fn from(alias: Alias) -> Self {
        Recipient::Alias(alias)
    }
}

/// Either the chain's native asset or an issued one identified by a 32-byte id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize)]
pub enum AssetId {
    Base,
    Issued(ByteStr),
}

impl AssetId {
    pub fn issued(id: impl Into<ByteStr>) -> Self {
        AssetId::Issued(id.into())
    }

    pub fn is_base(&self) -> bool {
        matches!(self, AssetId::Base)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssetId::Base => write!(f, "BASE"),
            AssetId::Issued(id) => write!(f, "{}", bs58::encode(id.as_bytes()).into_string()),
        }
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One key of an account's data storage. `Empty` means "delete this key".
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct DataEntry {
    pub key: String,
    pub value: DataValue,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    Binary(ByteStr),
    Str(String),
    Empty,
}

impl DataEntry {
    /// Serialized footprint counted against the per-invocation write-set byte limit.
    pub fn payload_len(&self) -> usize {
        let value_len = match &self.value {
            DataValue::Bool(_) => 1,
            DataValue::Int(_) => 8,
            DataValue::Binary(bytes) => bytes.len(),
            DataValue::Str(string) => string.len(),
            DataValue::Empty => 0,
        };
        self.key.len() + value_len
    }
}

/// blake2b-256 of `data`.
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    use blake2::digest::consts::U32;
    use blake2::{Blake2b, Digest};
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// Composite hash used for address derivation: keccak-256 over blake2b-256.
pub fn secure_hash(data: &[u8]) -> [u8; 32] {
    keccak256(&blake2b256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN_ID: u8 = b'T';

    #[test]
    fn address_roundtrip_and_checksum() {
        let address = Address::from_public_key(CHAIN_ID, &[7u8; 32]);
        assert_eq!(address.chain_id(), CHAIN_ID);
        assert!(Address::from_bytes(address.as_bytes()).is_ok());

        let mut corrupted = address.as_bytes().to_vec();
        corrupted[10] ^= 0xff;
        assert!(matches!(
            Address::from_bytes(&corrupted),
            Err(RejectError::InvalidAddress(_))
        ));
    }

    #[test]
    fn alias_charset_and_length() {
        assert!(Alias::new(CHAIN_ID, "merry").is_ok());
        assert!(Alias::new(CHAIN_ID, "four").is_ok());
        assert!(Alias::new(CHAIN_ID, "abc").is_err());
        assert!(Alias::new(CHAIN_ID, "UPPER").is_err());
        assert!(Alias::new(CHAIN_ID, &"a".repeat(31)).is_err());
        assert!(Alias::new(CHAIN_ID, "with space").is_err());
    }

    #[test]
    fn bytestr_renders_base58() {
        let network_byte = ByteStr::from(vec![b'W']);
        assert_eq!(network_byte.to_string(), "base58'2W'");
    }
}
