//! Unified error types for evm-connect
//!
//! All errors flow through this module for consistent handling
//! and FFI-safe error reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all evm-connect operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ConnectError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn malformed_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedInput, msg)
    }

    pub fn unsupported_operation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedOperation, msg)
    }

    pub fn not_connected(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotConnected, msg)
    }

    /// Failure reported by an underlying connector or pairing library
    pub fn connector(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Connector, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    pub fn is_malformed_input(&self) -> bool {
        self.code == ErrorCode::MalformedInput
    }

    pub fn is_unsupported_operation(&self) -> bool {
        self.code == ErrorCode::UnsupportedOperation
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConnectError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    MalformedInput,
    InvalidConfig,

    // Wallet adapter errors
    UnsupportedOperation,
    NotConnected,
    Connector,

    // Parse errors
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for evm-connect operations
pub type ConnectResult<T> = Result<T, ConnectError>;

// Conversions from common error types

impl From<serde_json::Error> for ConnectError {
    fn from(e: serde_json::Error) -> Self {
        ConnectError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for ConnectError {
    fn from(e: hex::FromHexError) -> Self {
        ConnectError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for ConnectError {
    fn from(e: std::io::Error) -> Self {
        ConnectError::new(ErrorCode::Internal, e.to_string())
    }
}

impl From<url::ParseError> for ConnectError {
    fn from(e: url::ParseError) -> Self {
        ConnectError::new(ErrorCode::InvalidConfig, format!("Invalid URL: {}", e))
    }
}
