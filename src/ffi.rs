//! C-ABI exports
//!
//! All functions follow the same pattern:
//! - Input: JSON string (null-terminated C string)
//! - Output: JSON string (must be freed with `evmconnect_free_string`)
//!
//! Error handling: All functions return JSON with `success` field.
//! On error, `success: false` and `error` object is populated.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::error::ConnectError;
use crate::keyless;
use crate::types::*;
use crate::utils::encode_hex_prefixed;

// =============================================================================
// Memory Management
// =============================================================================

/// Free a string returned by any evmconnect_* function
///
/// # Safety
/// The pointer must have been returned by an evmconnect_* function
#[unsafe(no_mangle)]
pub extern "C" fn evmconnect_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(s);
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Convert C string to an owned Rust string, returning error JSON if invalid
fn parse_input(input: *const c_char) -> Result<String, *mut c_char> {
    if input.is_null() {
        return Err(error_response(ConnectError::malformed_input("Null input pointer")));
    }

    let c_str = unsafe { CStr::from_ptr(input) };
    match c_str.to_str() {
        Ok(s) => Ok(s.to_owned()),
        Err(_) => Err(error_response(ConnectError::malformed_input("Invalid UTF-8 string"))),
    }
}

fn parse_request<T: serde::de::DeserializeOwned>(input: *const c_char) -> Result<T, *mut c_char> {
    let json_str = parse_input(input)?;
    serde_json::from_str(&json_str)
        .map_err(|e| error_response(ConnectError::from(e).with_details("Invalid request JSON")))
}

/// Create a success response JSON string
fn success_response<T: serde::Serialize>(data: T) -> *mut c_char {
    let response = ApiResponse::ok(data);
    string_to_ptr(response.to_json())
}

/// Create an error response JSON string
fn error_response(error: ConnectError) -> *mut c_char {
    let response: ApiResponse<()> = ApiResponse::err(error);
    string_to_ptr(response.to_json())
}

/// Convert Rust string to C string pointer
fn string_to_ptr(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        // JSON output never contains interior NULs
        Err(_) => std::ptr::null_mut(),
    }
}

// =============================================================================
// Keyless Transactions
// =============================================================================

/// Build a signed transaction from an unsigned one and an external signature
///
/// # Input
/// ```json
/// {
///   "transaction": { "type": "eip1559", "chainId": 43114, "nonce": 0, ... },
///   "signature": "0x<r><s><v>"
/// }
/// ```
///
/// # Output
/// ```json
/// {
///   "success": true,
///   "data": { "signer": "0x...", "transaction": "0x02...", "transactionHash": "0x..." }
/// }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn evmconnect_build_keyless_transaction(input: *const c_char) -> *mut c_char {
    let request: KeylessRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };

    match keyless::build_keyless_transaction_hex(&request.transaction, &request.signature) {
        Ok(result) => success_response(result),
        Err(e) => error_response(e.into()),
    }
}

/// Digest a keyless signer has to sign
///
/// # Input
/// ```json
/// { "transaction": { ... } }
/// ```
///
/// # Output
/// ```json
/// { "success": true, "data": { "digest": "0x..." } }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn evmconnect_signing_digest(input: *const c_char) -> *mut c_char {
    let request: DigestRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };

    match keyless::signing_digest(&request.transaction) {
        Ok(digest) => success_response(DigestResponse {
            digest: encode_hex_prefixed(&digest),
        }),
        Err(e) => error_response(e.into()),
    }
}

/// Decode a signed transaction
///
/// # Input
/// ```json
/// { "raw": "0xf86c..." }
/// ```
///
/// # Output
/// ```json
/// {
///   "success": true,
///   "data": { "transaction": { ... }, "signature": "0x...", "from": "0x...", "transactionHash": "0x..." }
/// }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn evmconnect_parse_signed_transaction(input: *const c_char) -> *mut c_char {
    let request: ParseSignedRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };

    match keyless::parse_signed_transaction(&request.raw) {
        Ok(parsed) => success_response(parsed),
        Err(e) => error_response(e.into()),
    }
}
