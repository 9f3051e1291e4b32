//! Tool registry for name-based dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::task::AbortOnDropHandle;
use umcp_types::{ToolDescriptor, ToolError, ToolResult};

use crate::tool::Tool;

/// Registry of available tools. Listing order is registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Check if a tool exists by name.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// The only error is [`ToolError::UnknownTool`]. A tool that fails, or
    /// panics, produces a [`ToolResult`] with `is_error` set.
    ///
    /// The tool runs on its own task, which is aborted if the returned future
    /// is dropped.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })?;

        let task = AbortOnDropHandle::new(tokio::spawn(async move {
            tool.execute(arguments).await
        }));

        let failure = match task.await {
            Ok(Ok(text)) => return Ok(ToolResult::text(text)),
            Ok(Err(e)) => e.to_string(),
            Err(join) if join.is_panic() => "tool panicked".to_string(),
            Err(join) => join.to_string(),
        };
        tracing::warn!(tool = name, error = %failure, "Tool execution failed");
        Ok(ToolResult::error(format!("Tool execution error: {failure}")))
    }
}
