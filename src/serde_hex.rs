//! Serde helpers for EVM quantities and byte strings
//!
//! JSON callers (FFI, CLI) send quantities either as numbers, decimal
//! strings or `0x` hex strings. `U256` values are written back as `0x` hex,
//! counters (nonce, chain id) as plain numbers.

use ethers_core::types::U256;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Number(u64),
    Text(String),
}

/// Parse a quantity from decimal or `0x` hex text. `"0x"` alone is zero.
pub fn parse_quantity(input: &str) -> Result<U256, String> {
    let trimmed = input.trim();
    if let Some(digits) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_str_radix(digits, 16).map_err(|e| format!("invalid hex quantity {:?}: {}", input, e))
    } else {
        U256::from_dec_str(trimmed).map_err(|e| format!("invalid decimal quantity {:?}: {}", input, e))
    }
}

fn raw_to_u256(raw: RawQuantity) -> Result<U256, String> {
    match raw {
        RawQuantity::Number(n) => Ok(U256::from(n)),
        RawQuantity::Text(s) => parse_quantity(&s),
    }
}

fn raw_to_u64(raw: RawQuantity) -> Result<u64, String> {
    let value = raw_to_u256(raw)?;
    if value > U256::from(u64::MAX) {
        return Err(format!("quantity {} does not fit in 64 bits", value));
    }
    Ok(value.as_u64())
}

/// Serialize/deserialize U256 as a quantity
pub mod quantity {
    use super::*;

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:#x}", value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawQuantity::deserialize(deserializer)?;
        raw_to_u256(raw).map_err(serde::de::Error::custom)
    }
}

/// Serialize/deserialize Option<U256> as a quantity
pub mod quantity_option {
    use super::*;

    pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&format!("{:#x}", v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawQuantity>::deserialize(deserializer)?;
        raw.map(raw_to_u256)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Serialize/deserialize u64 as a number, accepting quantity strings
pub mod quantity_u64 {
    use super::*;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawQuantity::deserialize(deserializer)?;
        raw_to_u64(raw).map_err(serde::de::Error::custom)
    }
}

/// Serialize/deserialize Option<u64> as a number, accepting quantity strings
pub mod quantity_u64_option {
    use super::*;

    pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawQuantity>::deserialize(deserializer)?;
        raw.map(raw_to_u64)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Serialize/deserialize Vec<u8> as `0x` hex
pub mod hex_bytes {
    use super::*;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&crate::utils::encode_hex_prefixed(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        crate::utils::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}
