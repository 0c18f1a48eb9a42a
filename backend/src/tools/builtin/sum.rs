//! `sum`: adds a list of numbers.

use async_trait::async_trait;
use mcpstream_types::{Content, ToolDescriptor};
use serde_json::{json, Value};

use crate::tools::{ToolError, ToolHandler};

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "sum".to_string(),
        title: Some("Sum".to_string()),
        description: "Add up a list of numbers".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "values": {
                    "type": "array",
                    "items": { "type": "number" },
                    "description": "Numbers to add"
                }
            },
            "required": ["values"]
        }),
    }
}

pub struct SumTool;

#[async_trait]
impl ToolHandler for SumTool {
    async fn call(&self, arguments: Value) -> Result<Vec<Content>, ToolError> {
        let values = arguments
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::InvalidArguments("values must be array".to_string()))?;

        let mut total = 0.0_f64;
        for value in values {
            total += value.as_f64().ok_or_else(|| {
                ToolError::InvalidArguments(format!("values must be numbers, got {}", value))
            })?;
        }

        if !total.is_finite() {
            return Err(ToolError::Failed("sum overflowed".to_string()));
        }

        Ok(vec![Content::text(total.to_string())])
    }
}
