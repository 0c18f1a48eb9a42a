//! `echo`: returns its input text unchanged.

use async_trait::async_trait;
use mcpstream_types::{Content, ToolDescriptor};
use serde_json::{json, Value};

use crate::tools::{ToolError, ToolHandler};

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "echo".to_string(),
        title: Some("Echo".to_string()),
        description: "Echo the provided text back to the caller".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to echo"
                }
            },
            "required": ["text"]
        }),
    }
}

pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, arguments: Value) -> Result<Vec<Content>, ToolError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("text must be a string".to_string()))?;
        Ok(vec![Content::text(text)])
    }
}
