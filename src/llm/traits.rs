//! 模型客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Gemini / Mock）实现 ModelClient：给定提示词与历史，
//! 返回最终文本或工具调用请求。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Exchange;
use crate::tools::RawToolCall;

/// 模型调用失败（网络、额度、鉴权、响应格式）
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 一次模型回复：文本与工具调用二选一（也可能都有，工具调用优先）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(call: RawToolCall) -> Self {
        Self {
            text: None,
            tool_calls: vec![call],
        }
    }

    pub fn has_tool_call(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// 文本内容，缺失时为空串
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// 模型客户端 trait
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// 发送提示词（附带历史），返回文本或工具调用
    async fn ask(&self, prompt: &str, history: &[Exchange]) -> Result<ModelReply, LlmError>;

    /// 累计 token 使用：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
