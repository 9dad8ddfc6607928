//! Tool declarations for structured (function-call) replies.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Function the generation flow forces the model to call.
pub const GENERATION_TOOL_NAME: &str = "submit_generated_code";

// ═══════════════════════════════════════════════════════════════════════════
// Request side
// ═══════════════════════════════════════════════════════════════════════════

/// A tool offered to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
}

/// The structured reply surface for code generation: the model judges the
/// request and returns the code through this function's arguments.
pub fn generation_tool() -> ToolDefinition {
    ToolDefinition {
        tool_type: "function",
        function: FunctionDefinition {
            name: GENERATION_TOOL_NAME,
            description: "生成または変更したコードを構造化された形式で提出する",
            parameters: json!({
                "type": "object",
                "properties": {
                    "isValidRequest": {
                        "type": "boolean",
                        "description": "指示がコード生成・変更の要求として適切かどうか"
                    },
                    "code": {
                        "type": "string",
                        "description": "生成または変更したコード全体"
                    },
                    "reason": {
                        "type": "string",
                        "description": "指示が不適切な場合の理由"
                    }
                },
                "required": ["isValidRequest", "code"]
            }),
        },
    }
}

/// `tool_choice` value that forces the generation function to be invoked.
pub fn generation_tool_choice() -> serde_json::Value {
    json!({
        "type": "function",
        "function": { "name": GENERATION_TOOL_NAME }
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Response side
// ═══════════════════════════════════════════════════════════════════════════

/// A tool invocation returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments exactly as the model produced them.
    pub arguments: String,
}
