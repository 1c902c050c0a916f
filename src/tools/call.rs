//! 工具调用：模型原始调用 -> 强类型 ToolRequest
//!
//! 目前只有 execute_command 一种工具；未知工具名与非法参数都显式返回错误，由编排器转为回传文本。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 指令执行工具在模型侧声明的名称
pub const EXECUTE_COMMAND: &str = "execute_command";

/// 模型返回的原始工具调用（名称 + JSON 参数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

impl RawToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// 便捷构造：execute_command({"command": ...})
    pub fn execute_command(command: impl Into<String>) -> Self {
        Self::new(
            EXECUTE_COMMAND,
            serde_json::json!({ "command": command.into() }),
        )
    }
}

/// execute_command 的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteCommandArgs {
    /// 要执行的 shell 指令
    pub command: String,
}

/// 已识别的工具调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    ExecuteCommand(ExecuteCommandArgs),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    #[error("Unsupported tool: {0}")]
    Unsupported(String),

    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },
}

impl TryFrom<&RawToolCall> for ToolRequest {
    type Error = ToolCallError;

    fn try_from(call: &RawToolCall) -> Result<Self, Self::Error> {
        match call.name.as_str() {
            EXECUTE_COMMAND => {
                let args: ExecuteCommandArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| ToolCallError::InvalidArguments {
                        name: call.name.clone(),
                        reason: e.to_string(),
                    })?;
                if args.command.trim().is_empty() {
                    return Err(ToolCallError::InvalidArguments {
                        name: call.name.clone(),
                        reason: "command is empty".to_string(),
                    });
                }
                Ok(ToolRequest::ExecuteCommand(args))
            }
            other => Err(ToolCallError::Unsupported(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execute_command() {
        let call = RawToolCall::execute_command("ls");
        let request = ToolRequest::try_from(&call).unwrap();
        assert_eq!(
            request,
            ToolRequest::ExecuteCommand(ExecuteCommandArgs {
                command: "ls".into()
            })
        );
    }

    #[test]
    fn test_unknown_tool_is_unsupported() {
        let call = RawToolCall::new("send_email", serde_json::json!({}));
        assert_eq!(
            ToolRequest::try_from(&call),
            Err(ToolCallError::Unsupported("send_email".into()))
        );
    }

    #[test]
    fn test_missing_or_empty_command_is_invalid() {
        let call = RawToolCall::new(EXECUTE_COMMAND, serde_json::json!({ "cmd": "ls" }));
        assert!(matches!(
            ToolRequest::try_from(&call),
            Err(ToolCallError::InvalidArguments { .. })
        ));

        let call = RawToolCall::execute_command("   ");
        assert!(matches!(
            ToolRequest::try_from(&call),
            Err(ToolCallError::InvalidArguments { .. })
        ));
    }
}
