//! Shared protocol types and error hierarchy for umcp.

pub mod error;
pub mod jsonrpc;
pub mod mcp;
pub mod tool;

pub use error::{ConfigError, ToolError};
pub use jsonrpc::{
    Envelope, JSONRPC_VERSION, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, ResponsePayload, codes,
};
pub use mcp::*;
pub use tool::*;
