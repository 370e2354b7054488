use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Service-specific error types
///
/// This enum defines all possible errors that can occur while serving RPC
/// calls. Errors from the consensus node and the signing stack are carried
/// through with their original message.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed JSON-RPC envelope
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No handler registered under the requested method name
    #[error("the method {0} does not exist/is not available")]
    MethodNotFound(String),

    /// Arguments could not be decoded or are out of range
    #[error("invalid argument: {0}")]
    InvalidParams(String),

    /// Error talking to the consensus node RPC endpoint
    #[error("RPC connection error: {0}")]
    RPCConnectionError(String),

    /// The consensus node answered with an RPC-level error
    #[error("consensus RPC error {code}: {message}")]
    ConsensusError {
        code: i64,
        message: String,
    },

    /// An ABCI query returned an empty value
    #[error("No data returned for query")]
    NoData,

    /// Stored value or RPC payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Transaction failed client-side validation
    #[error("invalid transaction: {0}")]
    Validation(String),

    /// The consensus node has not reported its chain id yet
    #[error("Empty chain id. Please wait for the consensus engine to finish starting up. ")]
    ChainIdUnavailable,

    /// Keystore lookup or unlock failure
    #[error("account error: {0}")]
    Account(String),

    /// Signing the transaction failed
    #[error("signing failed: {0}")]
    Signing(String),
}

impl ServiceError {
    /// JSON-RPC 2.0 error code for this error
    ///
    /// Protocol-level failures use the reserved codes; everything raised while
    /// executing a method uses the generic server error code -32000.
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            ServiceError::InvalidRequest(_) => -32600,
            ServiceError::MethodNotFound(_) => -32601,
            ServiceError::InvalidParams(_) => -32602,
            _ => -32000,
        }
    }
}

/// Structured error response for the API
///
/// This structure defines the JSON format of error responses returned by the
/// plain HTTP endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    /// Human-readable error message
    error: String,

    /// Machine-readable error code
    error_code: String,
}

impl ResponseError for ServiceError {
    /// Convert the error to an HTTP response
    fn error_response(&self) -> HttpResponse {
        let error_code = match self {
            ServiceError::InvalidRequest(_) => "INVALID_REQUEST",
            ServiceError::MethodNotFound(_) => "METHOD_NOT_FOUND",
            ServiceError::InvalidParams(_) => "INVALID_PARAMS",
            ServiceError::RPCConnectionError(_) => "RPC_CONNECTION_ERROR",
            ServiceError::ConsensusError { .. } => "CONSENSUS_ERROR",
            ServiceError::NoData => "NO_DATA",
            ServiceError::Decode(_) => "DECODE_ERROR",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::ChainIdUnavailable => "CHAIN_ID_UNAVAILABLE",
            ServiceError::Account(_) => "ACCOUNT_ERROR",
            ServiceError::Signing(_) => "SIGNING_ERROR",
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
        })
    }

    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match *self {
            ServiceError::InvalidRequest(_)
            | ServiceError::InvalidParams(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::MethodNotFound(_) | ServiceError::NoData => StatusCode::NOT_FOUND,
            ServiceError::RPCConnectionError(_) | ServiceError::ConsensusError { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ServiceError::ChainIdUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Account(_) => StatusCode::FORBIDDEN,
            ServiceError::Decode(_) | ServiceError::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
