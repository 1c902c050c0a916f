//! 短期记忆：单个会话的对话记录
//!
//! 按追加顺序保存 user/model 交替的 Exchange，超出上限时从头部成对剪枝（FIFO 滑动窗口）。

use serde::{Deserialize, Serialize};

/// 默认保留的消息条数：10 轮 user/model 对
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// 发言角色（与模型客户端约定的 "user" / "model" 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条已记录的发言，追加后不可变
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub role: Role,
    pub text: String,
}

impl Exchange {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// 有界对话记录：长度永不超过 max_messages
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    exchanges: Vec<Exchange>,
    max_messages: usize,
}

impl ConversationMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            exchanges: Vec::new(),
            max_messages,
        }
    }

    pub fn push(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
        self.prune();
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    /// 超出上限时每次从头部丢弃两条（默认成对插入，保证头部仍以 user 开始）
    fn prune(&mut self) {
        while self.exchanges.len() > self.max_messages {
            let n = self.exchanges.len().min(2);
            self.exchanges.drain(..n);
        }
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}
