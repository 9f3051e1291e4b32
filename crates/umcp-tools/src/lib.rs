//! Tool trait, capability registry and the user-management tools.

mod registry;
mod tool;
pub mod users;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolFuture};
pub use users::{HttpUserService, InMemoryUserService, UserService, register_user_tools};
