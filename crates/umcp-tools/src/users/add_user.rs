use std::sync::Arc;

use serde_json::{Value, json};
use umcp_types::ToolDescriptor;

use super::{NewUser, UserService, format_user, parse_arguments, user_fields_schema};
use crate::tool::{Tool, ToolFuture};

const NAME: &str = "add_user";

pub struct AddUserTool {
    service: Arc<dyn UserService>,
}

impl AddUserTool {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

impl Tool for AddUserTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: NAME.to_string(),
            description: "Adds new user into the system".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": user_fields_schema(),
                "required": ["name", "surname", "email"]
            }),
        }
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let user: NewUser = parse_arguments(NAME, arguments)?;
            let created = self.service.add_user(user).await?;
            Ok(format!("User successfully added\n\n{}", format_user(&created)))
        })
    }
}
