//! The capability interface every tool implements.

use std::future::Future;
use std::pin::Pin;

use umcp_types::{ToolDescriptor, ToolError};

/// Future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// A named, schema-described unit of invocable behavior.
///
/// Tools validate their own arguments; the registry passes them through
/// untouched.
pub trait Tool: Send + Sync {
    /// Unique name of this tool within a registry.
    fn name(&self) -> &str;

    /// Name, description and input schema advertised by `tools/list`.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool and return its text output.
    fn execute(&self, arguments: serde_json::Value) -> ToolFuture<'_>;
}
