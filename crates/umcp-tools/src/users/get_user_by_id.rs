use std::sync::Arc;

use serde_json::{Value, json};
use umcp_types::ToolDescriptor;

use super::{UserService, format_user, parse_id};
use crate::tool::{Tool, ToolFuture};

const NAME: &str = "get_user_by_id";

/// Looks up one user by id.
pub struct GetUserByIdTool {
    service: Arc<dyn UserService>,
}

impl GetUserByIdTool {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

impl Tool for GetUserByIdTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: NAME.to_string(),
            description: "Provides full user information by user_id".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number", "description": "User ID"}
                },
                "required": ["id"]
            }),
        }
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let id = parse_id(NAME, &arguments, "id")?;
            let user = self.service.get_user(id).await?;
            Ok(format_user(&user))
        })
    }
}
