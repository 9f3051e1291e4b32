//! Tool descriptors and tool results as they appear on the wire.

use serde::{Deserialize, Serialize};

/// Name, description and input schema of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// A single typed block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

/// Output of one tool invocation.
///
/// `is_error` marks a tool that ran and reported a failure, as opposed to a
/// protocol-level error on the call itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text output.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Create an error text output.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// The first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_uses_camel_case_schema_key() {
        let d = ToolDescriptor {
            name: "get_user_by_id".into(),
            description: "Provides full user information by user_id".into(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert!(json.get("inputSchema").is_some());
        assert!(json.get("input_schema").is_none());
    }

    #[test]
    fn descriptor_without_description_or_schema() {
        let d: ToolDescriptor = serde_json::from_str(r#"{"name": "list"}"#).unwrap();
        assert_eq!(d.description, "");
        assert_eq!(d.input_schema["type"], "object");
    }

    #[test]
    fn successful_result_omits_is_error() {
        let json = serde_json::to_value(ToolResult::text("ok")).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "ok");
        assert!(json.get("isError").is_none());
    }

    #[test]
    fn error_result_sets_is_error() {
        let json = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(json["isError"], true);

        let parsed: ToolResult = serde_json::from_value(json).unwrap();
        assert!(parsed.is_error);
        assert_eq!(parsed.first_text(), Some("boom"));
    }
}
