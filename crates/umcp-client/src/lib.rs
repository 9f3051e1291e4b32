//! Client protocol driver for umcp servers.

mod driver;
mod error;

pub use driver::{ClientOptions, DEFAULT_TIMEOUT, DriverState, McpHttpClient};
pub use error::ClientError;
