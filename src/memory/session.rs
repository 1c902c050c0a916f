//! 会话记忆存储
//!
//! 按 session_id 管理各自的 ConversationMemory。首次引用时创建，进程内常驻（无持久化）。
//! 每个会话一把 Mutex：lock_session 在整轮对话期间独占该会话，
//! 同一会话的并发轮次因此串行执行，写入顺序即完成顺序。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::memory::{ConversationMemory, Exchange, Role};

/// 会话 ID（Telegram chat id 为 i64，控制台通道使用配置中的固定 ID）
pub type SessionId = i64;

type SessionSlot = Arc<Mutex<ConversationMemory>>;

/// 所有会话的记忆：session_id -> 有界对话记录
pub struct SessionMemory {
    sessions: RwLock<HashMap<SessionId, SessionSlot>>,
    max_messages: usize,
}

impl SessionMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages,
        }
    }

    /// 取会话槽位，不存在则创建
    async fn slot(&self, session_id: SessionId) -> SessionSlot {
        if let Some(slot) = self.sessions.read().await.get(&session_id) {
            return slot.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| {
                tracing::debug!(session_id, "session created");
                Arc::new(Mutex::new(ConversationMemory::new(self.max_messages)))
            })
            .clone()
    }

    /// 获取会话历史快照（按追加顺序，最旧在前）
    pub async fn get_history(&self, session_id: SessionId) -> Vec<Exchange> {
        let slot = self.slot(session_id).await;
        let memory = slot.lock().await;
        memory.exchanges().to_vec()
    }

    /// 追加一条发言，超出上限时从头部成对剪枝
    pub async fn add_message(&self, session_id: SessionId, role: Role, text: impl Into<String>) {
        let slot = self.slot(session_id).await;
        slot.lock().await.push(Exchange {
            role,
            text: text.into(),
        });
    }

    /// 清空会话历史
    pub async fn clear(&self, session_id: SessionId) {
        let slot = self.slot(session_id).await;
        slot.lock().await.clear();
        tracing::info!(session_id, "session history cleared");
    }

    /// 独占会话直到返回的 SessionTurn 被 drop
    pub async fn lock_session(&self, session_id: SessionId) -> SessionTurn {
        let slot = self.slot(session_id).await;
        SessionTurn {
            session_id,
            memory: slot.lock_owned().await,
        }
    }

    /// 已创建的会话数
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(crate::memory::DEFAULT_MAX_MESSAGES)
    }
}

/// 一轮对话期间对单个会话的独占访问
pub struct SessionTurn {
    session_id: SessionId,
    memory: OwnedMutexGuard<ConversationMemory>,
}

impl SessionTurn {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn history(&self) -> &[Exchange] {
        self.memory.exchanges()
    }

    /// 按顺序写入本轮的用户输入与模型最终回复
    pub fn record_exchange(&mut self, user_text: impl Into<String>, model_text: impl Into<String>) {
        self.memory.push(Exchange::user(user_text));
        self.memory.push(Exchange::model(model_text));
    }
}
