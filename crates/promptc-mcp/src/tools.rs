//! The two tools the agent exposes and their argument parsing.

use crate::error::McpError;
use crate::protocol::ToolDefinition;
use promptc_core::PromptRequest;
use serde::Deserialize;
use serde_json::{Value, json};

pub const GET_TEMPLATE: &str = "get_template";
pub const OPTIMIZE_PROMPT: &str = "optimize_prompt";

/// Tool schemas returned by `tools/list`.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_TEMPLATE.to_string(),
            description: Some("Fetch a stored prompt template by name.".to_string()),
            input_schema: json!({
                "type": "object",
                "required": ["template_name"],
                "properties": {
                    "template_name": { "type": "string" }
                }
            }),
        },
        ToolDefinition {
            name: OPTIMIZE_PROMPT.to_string(),
            description: Some(
                "Compile and optimise a prompt. Accepts template_name to use a stored template as the task."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "required": ["role", "context", "task"],
                "properties": {
                    "role": { "type": "string" },
                    "context": { "type": "string" },
                    "task": { "type": "string" },
                    "template_name": { "type": "string" },
                    "constraints": { "type": "array", "items": { "type": "string" } },
                    "variables": { "type": "object", "additionalProperties": { "type": "string" } }
                }
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct GetTemplateArgs {
    template_name: String,
}

/// A parsed `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetTemplate { template_name: String },
    OptimizePrompt(PromptRequest),
}

impl ToolCall {
    pub fn parse(name: &str, arguments: Value) -> Result<Self, McpError> {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        match name {
            GET_TEMPLATE => {
                let args: GetTemplateArgs =
                    serde_json::from_value(arguments).map_err(|e| invalid(name, e))?;
                if args.template_name.trim().is_empty() {
                    return Err(McpError::InvalidArguments {
                        tool: name.to_string(),
                        reason: "template_name must not be empty".to_string(),
                    });
                }
                Ok(Self::GetTemplate {
                    template_name: args.template_name,
                })
            }
            OPTIMIZE_PROMPT => {
                let mut request: PromptRequest =
                    serde_json::from_value(arguments).map_err(|e| invalid(name, e))?;
                if request
                    .template_name
                    .as_deref()
                    .is_some_and(|n| n.trim().is_empty())
                {
                    request.template_name = None;
                }
                Ok(Self::OptimizePrompt(request))
            }
            other => Err(McpError::ToolNotFound {
                name: other.to_string(),
            }),
        }
    }
}

fn invalid(tool: &str, err: serde_json::Error) -> McpError {
    McpError::InvalidArguments {
        tool: tool.to_string(),
        reason: err.to_string(),
    }
}
