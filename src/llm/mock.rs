//! Mock 模型客户端（用于测试，无需 API）
//!
//! 按脚本顺序返回预设回复，并记录每次调用收到的提示词与历史，便于断言编排流程。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmError, ModelClient, ModelReply};
use crate::memory::Exchange;

/// 一次被记录的 ask 调用
#[derive(Debug, Clone)]
pub struct RecordedAsk {
    pub prompt: String,
    pub history: Vec<Exchange>,
}

/// 脚本化 Mock：依次弹出预设结果；脚本耗尽时返回 InvalidResponse
#[derive(Debug, Default)]
pub struct MockModelClient {
    script: Mutex<VecDeque<Result<ModelReply, LlmError>>>,
    calls: Mutex<Vec<RecordedAsk>>,
    delay: Option<Duration>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次 ask 前先等待一段时间（模拟慢速模型）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn then_reply(self, reply: ModelReply) -> Self {
        self.push(Ok(reply));
        self
    }

    pub fn then_fail(self, err: LlmError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn push(&self, result: Result<ModelReply, LlmError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
    }

    pub fn calls(&self) -> Vec<RecordedAsk> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn ask(&self, prompt: &str, history: &[Exchange]) -> Result<ModelReply, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedAsk {
                prompt: prompt.to_string(),
                history: history.to_vec(),
            });
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Err(LlmError::InvalidResponse("mock script exhausted".to_string())))
    }
}
