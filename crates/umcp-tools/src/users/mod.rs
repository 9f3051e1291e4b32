//! User-management tools and the service they talk to.
//!
//! Each tool authors its own input schema; the [`UserService`] trait is the
//! only thing the tools know about the backing system.

mod add_user;
mod delete_user;
mod get_user_by_id;
mod http;
mod memory;
mod search_users;
mod update_user;

use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use umcp_types::ToolError;

use crate::registry::ToolRegistry;

pub use add_user::AddUserTool;
pub use delete_user::DeleteUserTool;
pub use get_user_by_id::GetUserByIdTool;
pub use http::{DEFAULT_TIMEOUT, HttpUserService};
pub use memory::InMemoryUserService;
pub use search_users::SearchUsersTool;
pub use update_user::UpdateUserTool;

/// Future returned by [`UserService`] methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ToolError>> + Send + 'a>>;

/// A user record as stored by the user service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
}

/// Fields for a new user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
}

/// Search filters; every present field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// The backing user-management system.
pub trait UserService: Send + Sync {
    fn get_user(&self, id: u64) -> ServiceFuture<'_, User>;
    fn search_users(&self, filter: UserSearch) -> ServiceFuture<'_, Vec<User>>;
    fn add_user(&self, user: NewUser) -> ServiceFuture<'_, User>;
    fn update_user(&self, id: u64, update: UserUpdate) -> ServiceFuture<'_, User>;
    fn delete_user(&self, id: u64) -> ServiceFuture<'_, ()>;
}

/// Register the five user tools, in their advertised order.
pub fn register_user_tools(
    registry: &mut ToolRegistry,
    service: Arc<dyn UserService>,
) -> Result<(), ToolError> {
    registry.register(Arc::new(GetUserByIdTool::new(Arc::clone(&service))))?;
    registry.register(Arc::new(SearchUsersTool::new(Arc::clone(&service))))?;
    registry.register(Arc::new(AddUserTool::new(Arc::clone(&service))))?;
    registry.register(Arc::new(UpdateUserTool::new(Arc::clone(&service))))?;
    registry.register(Arc::new(DeleteUserTool::new(service)))?;
    Ok(())
}

/// Render a user as `key: value` lines.
pub fn format_user(user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id: {}", user.id);
    let _ = writeln!(out, "name: {}", user.name);
    let _ = writeln!(out, "surname: {}", user.surname);
    let _ = writeln!(out, "email: {}", user.email);
    let optional = [
        ("phone", user.phone.clone()),
        ("date_of_birth", user.date_of_birth.clone()),
        ("gender", user.gender.clone()),
        ("company", user.company.clone()),
        ("salary", user.salary.map(|s| s.to_string())),
        ("about_me", user.about_me.clone()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            let _ = writeln!(out, "{key}: {value}");
        }
    }
    out.trim_end().to_string()
}

/// Read a required user id. Accepts integers, integral floats and numeric strings.
pub(crate) fn parse_id(
    tool: &str,
    arguments: &serde_json::Value,
    field: &str,
) -> Result<u64, ToolError> {
    let invalid = |message: String| ToolError::InvalidInput {
        tool: tool.to_string(),
        message,
    };
    let value = arguments
        .get(field)
        .ok_or_else(|| invalid(format!("missing required field '{field}'")))?;

    let id = match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| invalid(format!("'{field}' must be a non-negative integer, got {value}")))
}

/// Deserialize tool arguments into `T`, mapping failures to `InvalidInput`.
pub(crate) fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool: &str,
    arguments: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidInput {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Schema properties shared by `add_user` and `update_user`.
pub(crate) fn user_fields_schema() -> serde_json::Value {
    serde_json::json!({
        "name": {"type": "string", "description": "User name"},
        "surname": {"type": "string", "description": "User surname"},
        "email": {"type": "string", "description": "User email"},
        "phone": {"type": "string", "description": "Phone number"},
        "date_of_birth": {"type": "string", "description": "Date of birth, YYYY-MM-DD"},
        "gender": {"type": "string", "description": "User gender", "enum": ["male", "female"]},
        "company": {"type": "string", "description": "Employer"},
        "salary": {"type": "number", "description": "Yearly salary"},
        "about_me": {"type": "string", "description": "Free-form description"}
    })
}
