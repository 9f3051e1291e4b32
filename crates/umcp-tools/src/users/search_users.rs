use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::{Value, json};
use umcp_types::ToolDescriptor;

use super::{UserSearch, UserService, format_user, parse_arguments};
use crate::tool::{Tool, ToolFuture};

const NAME: &str = "search_users";

/// Filters users by any combination of name, surname, email and gender.
pub struct SearchUsersTool {
    service: Arc<dyn UserService>,
}

impl SearchUsersTool {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

impl Tool for SearchUsersTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: NAME.to_string(),
            description: "Searches users by name, surname, email, and gender".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "User name"},
                    "surname": {"type": "string", "description": "User surname"},
                    "email": {"type": "string", "description": "User email"},
                    "gender": {
                        "type": "string",
                        "description": "User gender",
                        "enum": ["male", "female"]
                    }
                },
                "required": []
            }),
        }
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let filter: UserSearch = if arguments.is_null() {
                UserSearch::default()
            } else {
                parse_arguments(NAME, arguments)?
            };
            let users = self.service.search_users(filter).await?;
            if users.is_empty() {
                return Ok("No users found".to_string());
            }

            let mut out = format!("Found {} users", users.len());
            for user in &users {
                let _ = write!(out, "\n\n{}", format_user(user));
            }
            Ok(out)
        })
    }
}
