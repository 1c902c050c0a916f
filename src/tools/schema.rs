//! 工具参数 JSON Schema 生成（schemars）
//!
//! 由 ExecuteCommandArgs 自动生成 execute_command 的参数 schema，注入模型请求的工具声明，
//! 保证声明与实际解析的参数结构一致。

use schemars::schema_for;
use serde_json::Value;

use crate::tools::call::{ExecuteCommandArgs, EXECUTE_COMMAND};

/// execute_command 的工具描述（供模型理解用途）
pub const EXECUTE_COMMAND_DESCRIPTION: &str =
    "在指定目录下执行本机指令（如 ls、cat、echo），返回指令输出";

/// 工具声明：名称、描述、参数 schema
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// execute_command 的参数 schema；去掉 $schema / title，部分 OpenAI 兼容端点不接受这两个字段
pub fn execute_command_parameters() -> Value {
    let schema = schema_for!(ExecuteCommandArgs);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

/// 当前支持的全部工具声明
pub fn tool_declarations() -> Vec<ToolDeclaration> {
    vec![ToolDeclaration {
        name: EXECUTE_COMMAND,
        description: EXECUTE_COMMAND_DESCRIPTION,
        parameters: execute_command_parameters(),
    }]
}
