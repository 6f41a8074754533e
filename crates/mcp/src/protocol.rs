//! Tool descriptors and results, decoupled from the SDK wire types.

use rmcp::model::{CallToolResult, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments passed to a tool invocation.
pub type JsonObject = Map<String, Value>;

/// A tool advertised by a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<Tool> for ToolDescriptor {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool
                .description
                .map(|d| d.into_owned())
                .unwrap_or_default(),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// Outcome of a tool invocation as fed back to the model.
///
/// Serializes to `{"result": [...], "meta": "...", "isError": bool}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(rename = "result")]
    pub text_segments: Vec<String>,
    pub meta: String,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result made of the given text blocks.
    pub fn text<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text_segments: segments.into_iter().map(Into::into).collect(),
            meta: Value::Null.to_string(),
            is_error: false,
        }
    }

    /// Mark this result as a tool-level error.
    pub fn into_error(mut self) -> Self {
        self.is_error = true;
        self
    }
}

impl From<CallToolResult> for ToolResult {
    fn from(result: CallToolResult) -> Self {
        let meta = serde_json::to_string(&result.meta)
            .unwrap_or_else(|_| Value::Null.to_string());

        let text_segments = result
            .content
            .iter()
            .filter_map(|content| content.as_text())
            .map(|text| text.text.clone())
            .collect();

        Self {
            text_segments,
            meta,
            is_error: result.is_error.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_from_sdk_tool() {
        let tool: Tool = serde_json::from_value(json!({
            "name": "add",
            "description": "Add two numbers",
            "inputSchema": {"type": "object", "properties": {"a": {"type": "number"}}}
        }))
        .unwrap();

        let descriptor = ToolDescriptor::from(tool);
        assert_eq!(descriptor.name, "add");
        assert_eq!(descriptor.description, "Add two numbers");
        assert_eq!(descriptor.input_schema["properties"]["a"]["type"], "number");
    }

    #[test]
    fn missing_description_is_empty() {
        let tool: Tool = serde_json::from_value(json!({
            "name": "ping",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();

        assert_eq!(ToolDescriptor::from(tool).description, "");
    }

    #[test]
    fn result_keeps_text_blocks_in_order() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                {"type": "text", "text": "second"}
            ],
            "isError": true
        }))
        .unwrap();

        let result = ToolResult::from(result);
        assert_eq!(result.text_segments, vec!["first", "second"]);
        assert!(result.is_error);
    }

    #[test]
    fn result_meta_is_json_text() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "ok"}],
            "_meta": {"requestId": 7}
        }))
        .unwrap();

        let result = ToolResult::from(result);
        let meta: Value = serde_json::from_str(&result.meta).unwrap();
        assert_eq!(meta, json!({"requestId": 7}));
    }

    #[test]
    fn result_without_meta_reads_null() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "ok"}]
        }))
        .unwrap();

        assert_eq!(ToolResult::from(result).meta, "null");
    }

    #[test]
    fn result_wire_shape() {
        let result = ToolResult::text(["201.06"]);
        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(
            encoded,
            json!({"result": ["201.06"], "meta": "null", "isError": false})
        );
    }
}
