use std::sync::Arc;

use serde_json::{Value, json};
use umcp_types::{ToolDescriptor, ToolError};

use super::{UserService, UserUpdate, format_user, parse_arguments, parse_id, user_fields_schema};
use crate::tool::{Tool, ToolFuture};

const NAME: &str = "update_user";

/// Applies a partial update (`new_info`) to an existing user.
pub struct UpdateUserTool {
    service: Arc<dyn UserService>,
}

impl UpdateUserTool {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

impl Tool for UpdateUserTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: NAME.to_string(),
            description: "Updates user info".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number", "description": "User ID that should be updated."},
                    "new_info": {
                        "type": "object",
                        "properties": user_fields_schema()
                    }
                },
                "required": ["id"]
            }),
        }
    }

    fn execute(&self, mut arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let id = parse_id(NAME, &arguments, "id")?;
            let update: UserUpdate = match arguments.get_mut("new_info").map(Value::take) {
                None | Some(Value::Null) => UserUpdate::default(),
                Some(info @ Value::Object(_)) => parse_arguments(NAME, info)?,
                Some(other) => {
                    return Err(ToolError::InvalidInput {
                        tool: NAME.to_string(),
                        message: format!("'new_info' must be an object, got {other}"),
                    });
                }
            };
            let updated = self.service.update_user(id, update).await?;
            Ok(format!("User successfully updated\n\n{}", format_user(&updated)))
        })
    }
}
