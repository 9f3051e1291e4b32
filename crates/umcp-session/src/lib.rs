//! Server-side MCP session tracking for umcp.

pub mod error;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use store::SessionStore;
pub use types::{Session, SessionId, SessionState};
