//! Error types for the client driver.

use thiserror::Error;
use umcp_codec::CodecError;
use umcp_types::RequestId;

use crate::driver::DriverState;

/// Errors from talking to an MCP server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to MCP server: {source}")]
    Connect {
        #[source]
        source: Box<ClientError>,
    },

    #[error("Client is not ready (state: {state:?})")]
    NotReady { state: DriverState },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Response id {actual} does not match request id {expected}")]
    IdMismatch {
        expected: RequestId,
        actual: RequestId,
    },

    #[error("Stream ended without a response")]
    NoData,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("MCP protocol error: {0}")]
    Protocol(String),
}
