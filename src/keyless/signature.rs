//! Externally supplied ECDSA signatures
//!
//! A keyless signer hands back `r || s || v` (65 bytes) or the EIP-2098
//! compact form (64 bytes). Internally only `r`, `s` and the y-parity are
//! kept; `v` is re-derived for whichever envelope embeds the signature.

use std::fmt;
use std::str::FromStr;

use ethers_core::types::{Address, Signature, H256, U256};
use serde::{Deserialize, Serialize};

use super::{KeylessError, KeylessResult};
use crate::utils::{decode_hex, encode_hex_prefixed};

/// Normalized secp256k1 signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeylessSignature {
    pub r: U256,
    pub s: U256,
    /// 0 or 1
    pub y_parity: u8,
}

impl KeylessSignature {
    pub fn new(r: U256, s: U256, y_parity: u8) -> KeylessResult<Self> {
        if y_parity > 1 {
            return Err(KeylessError::InvalidSignature(format!(
                "y-parity must be 0 or 1, got {}",
                y_parity
            )));
        }
        if r.is_zero() || s.is_zero() {
            return Err(KeylessError::InvalidSignature("r and s must be non-zero".to_string()));
        }
        Ok(Self { r, s, y_parity })
    }

    /// Parse raw signature bytes (65-byte `r || s || v` or 64-byte EIP-2098)
    pub fn from_bytes(bytes: &[u8]) -> KeylessResult<Self> {
        match bytes.len() {
            65 => {
                let r = U256::from_big_endian(&bytes[..32]);
                let s = U256::from_big_endian(&bytes[32..64]);
                let y_parity = parity_from_v(u64::from(bytes[64]))?;
                Self::new(r, s, y_parity)
            }
            64 => {
                let r = U256::from_big_endian(&bytes[..32]);
                let y_parity = bytes[32] >> 7;
                let mut s_bytes = [0u8; 32];
                s_bytes.copy_from_slice(&bytes[32..64]);
                s_bytes[0] &= 0x7f;
                Self::new(r, U256::from_big_endian(&s_bytes), y_parity)
            }
            other => Err(KeylessError::InvalidSignature(format!(
                "expected 65 or 64 bytes, got {}",
                other
            ))),
        }
    }

    /// Build from an `ethers-core` signature, whatever `v` convention it uses
    pub fn from_ethers(signature: &Signature) -> KeylessResult<Self> {
        Self::new(signature.r, signature.s, parity_from_v(signature.v)?)
    }

    /// `ethers-core` signature carrying the given `v`
    pub fn to_ethers(&self, v: u64) -> Signature {
        Signature {
            r: self.r,
            s: self.s,
            v,
        }
    }

    /// 65-byte `r || s || v` with `v` in the 27/28 convention
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        self.r.to_big_endian(&mut out[..32]);
        self.s.to_big_endian(&mut out[32..64]);
        out[64] = 27 + self.y_parity;
        out
    }

    pub fn to_hex(&self) -> String {
        encode_hex_prefixed(&self.to_bytes())
    }

    /// Recover the address that produced this signature over `digest`
    pub fn recover(&self, digest: [u8; 32]) -> KeylessResult<Address> {
        self.to_ethers(27 + u64::from(self.y_parity))
            .recover(H256::from(digest))
            .map_err(|e| KeylessError::Recovery(e.to_string()))
    }
}

/// Map any `v` convention (0/1, 27/28, EIP-155) onto the y-parity
pub fn parity_from_v(v: u64) -> KeylessResult<u8> {
    match v {
        0 | 1 => Ok(v as u8),
        27 | 28 => Ok((v - 27) as u8),
        v if v >= 35 => Ok(((v - 35) % 2) as u8),
        other => Err(KeylessError::InvalidSignature(format!("invalid v value {}", other))),
    }
}

impl FromStr for KeylessSignature {
    type Err = KeylessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s).map_err(|e| KeylessError::InvalidSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl TryFrom<String> for KeylessSignature {
    type Error = KeylessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeylessSignature> for String {
    fn from(signature: KeylessSignature) -> Self {
        signature.to_hex()
    }
}

impl fmt::Display for KeylessSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
