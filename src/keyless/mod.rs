//! Keyless Transactions
//!
//! Builds signed EVM transactions from signatures produced outside this
//! process (keyless signers, deterministic deployment proxies, custodial
//! signing services):
//! 1. Encode the unsigned transaction and compute its signing digest
//! 2. Recover the signer address from the external signature
//! 3. Embed the signature into the final, broadcast-ready encoding
//!
//! Transaction encoding is delegated to `ethers-core`.

pub mod builder;
pub mod signature;
pub mod transaction;


pub use builder::*;
pub use signature::*;
pub use transaction::*;

use crate::error::ConnectError;

/// Errors raised while building or decoding keyless transactions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeylessError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} is not allowed on a {envelope} transaction")]
    UnexpectedField {
        envelope: &'static str,
        field: &'static str,
    },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signer recovery failed: {0}")]
    Recovery(String),

    #[error("Decoding failed: {0}")]
    Decode(String),
}

pub type KeylessResult<T> = Result<T, KeylessError>;

impl From<KeylessError> for ConnectError {
    fn from(e: KeylessError) -> Self {
        ConnectError::malformed_input(e.to_string())
    }
}
