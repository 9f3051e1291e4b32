use std::sync::Arc;

use serde_json::{Value, json};
use umcp_types::ToolDescriptor;

use super::{UserService, parse_id};
use crate::tool::{Tool, ToolFuture};

const NAME: &str = "delete_user";

pub struct DeleteUserTool {
    service: Arc<dyn UserService>,
}

impl DeleteUserTool {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

impl Tool for DeleteUserTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: NAME.to_string(),
            description: "Deletes user by user_id".to_string(),
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
            self.service.delete_user(id).await?;
            Ok(format!("User with id {id} successfully deleted"))
        })
    }
}
