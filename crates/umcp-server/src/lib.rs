//! Server side of the umcp protocol: session-aware dispatcher and HTTP transport.

mod dispatcher;
mod error;
mod http;

pub use dispatcher::{McpServer, Outcome, ServerConfig, accepts_event_stream};
pub use error::TransportError;
pub use http::{mcp_router, serve};
