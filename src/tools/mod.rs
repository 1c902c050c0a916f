//! 工具层：工具调用解析、安全过滤、指令执行

pub mod call;
pub mod runner;
pub mod schema;
pub mod security;

pub use call::{ExecuteCommandArgs, RawToolCall, ToolCallError, ToolRequest, EXECUTE_COMMAND};
pub use runner::{CommandOutcome, CommandRunner, ShellRunner, EMPTY_OUTPUT_PLACEHOLDER, TIMEOUT_MESSAGE};
pub use schema::{tool_declarations, ToolDeclaration};
pub use security::{FilterVerdict, SecurityFilter, DEFAULT_DENYLIST};
