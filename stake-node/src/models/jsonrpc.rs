use std::str::FromStr;
use alloy_primitives::hex;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// JSON-RPC 2.0 request structure
///
/// This structure represents a standard JSON-RPC request with generic parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct JsonRpcRequest<T> {
    /// JSON-RPC protocol version (should be "2.0")
    pub jsonrpc: String,

    /// Method name to call
    pub method: String,

    /// Method parameters, positional
    #[serde(default)]
    pub params: T,

    /// Request identifier
    #[serde(default)]
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 successful response
///
/// This structure represents a standard JSON-RPC successful response with generic result.
#[derive(Debug, Serialize)]
pub struct JsonRpcSuccess<T> {
    /// JSON-RPC protocol version (always "2.0")
    pub jsonrpc: String,

    /// Request identifier (matching the request)
    pub id: serde_json::Value,

    /// Method result
    pub result: T,
}

/// JSON-RPC 2.0 error response
///
/// This structure represents a standard JSON-RPC error response.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// JSON-RPC protocol version (always "2.0")
    pub jsonrpc: String,

    /// Request identifier (matching the request)
    pub id: serde_json::Value,

    /// Error details
    pub error: JsonRpcErrorDetail,
}

/// JSON-RPC 2.0 error detail
///
/// This structure contains the detailed error information in a JSON-RPC error response.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorDetail {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Create a new JSON-RPC invalid request error
    ///
    /// # Arguments
    ///
    /// * `id` - Request identifier
    /// * `message` - Error message
    pub fn invalid_request(id: serde_json::Value, message: String) -> Self {
        Self::from_error(id, &ServiceError::InvalidRequest(message))
    }

    /// Build an error response from a service error
    ///
    /// The JSON-RPC code is taken from [`ServiceError::json_rpc_code`] and the
    /// message is the error's display form.
    pub fn from_error(id: serde_json::Value, err: &ServiceError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            error: JsonRpcErrorDetail {
                code: err.json_rpc_code(),
                message: err.to_string(),
                data: None,
            },
        }
    }
}

impl<T> JsonRpcSuccess<T> {
    /// Create a new JSON-RPC success response
    ///
    /// # Arguments
    ///
    /// * `id` - Request identifier
    /// * `result` - Response result
    pub fn new(id: serde_json::Value, result: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
        }
    }
}

/// Strip an optional "0x"/"0X" prefix from a hex string.
pub fn strip_hex(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a hexadecimal address string into an `Address`.
///
/// Accepts 40 hex digits with or without the "0x" prefix.
///
/// # Arguments
///
/// * `hex` - The hexadecimal address string
///
/// # Returns
///
/// * `Result<Address, String>` - Parsed address or error message
pub fn parse_hex_address(hex: &str) -> Result<Address, String> {
    Address::from_str(strip_hex(hex.trim()))
        .map_err(|e| format!("Invalid address {}: {}", hex, e))
}

/// Parse a hexadecimal string into raw bytes.
///
/// The "0x" prefix is optional. An empty string decodes to empty bytes.
pub fn parse_hex_bytes(hex: &str) -> Result<Vec<u8>, String> {
    let hex = strip_hex(hex.trim());
    if hex.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(hex).map_err(|e| format!("Invalid hex data: {}", e))
}

/// Format a `u64` as an Ethereum hex quantity ("0x0", "0x1f", ...).
pub fn format_hex_u64(value: u64) -> String {
    format!("0x{:x}", value)
}
