//! evm-connect Core Library
//!
//! Two independent building blocks for EVM dApps.
//!
//! # Architecture
//!
//! This crate provides:
//! - **keyless**: Signed transactions from externally produced signatures
//! - **wallet**: Core wallet adapter (injected provider or remote pairing via QR code)
//! - **ffi**: C-ABI exports for the keyless builder
//! - **utils**: Hashing, address checksums and structured logging
//!
//! # FFI Usage
//!
//! All public FFI functions are in the `ffi` module and follow this pattern:
//! - Input: JSON string (null-terminated C string)
//! - Output: JSON string (must be freed with `evmconnect_free_string`)
//!
//! # Example
//!
//! ```rust,ignore
//! use evm_connect::keyless::{build_keyless_transaction_hex, UnsignedTransaction};
//!
//! let result = build_keyless_transaction_hex(&tx, "0x...")?;
//! println!("Signer: {}", result.signer_address);
//! ```

pub mod error;
pub mod types;
pub mod ffi;
pub mod keyless;
pub mod wallet;
pub mod utils;
pub mod serde_hex;

// Re-export key types for convenience
pub use error::{ConnectError, ConnectResult, ErrorCode};
pub use keyless::{
    build_keyless_transaction, parse_signed_transaction, signing_digest, KeylessError,
    KeylessSignature, KeylessTransactionResult, TxEnvelope, UnsignedTransaction,
};
pub use utils::{keccak256, to_checksum_address};
pub use wallet::{CoreWallet, CoreWalletOptions, WalletEvent};
