//! cmdgate - 让对话模型经过安全过滤执行本机指令的网关
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）与凭据读取
//! - **core**: 编排器（单次工具调用的对话轮协议）、错误类型、构建
//! - **integrations**: 消息通道（控制台 REPL / Telegram）
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）
//! - **memory**: 按会话的有界对话记忆
//! - **observability**: 日志初始化
//! - **tools**: 工具调用解析、安全过滤、指令执行

pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

pub use crate::core::{GatewayError, Orchestrator};
