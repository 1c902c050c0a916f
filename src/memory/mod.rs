//! 记忆层：单会话有界对话记录 + 按会话管理的进程内存储

pub mod conversation;
pub mod session;

pub use conversation::{ConversationMemory, Exchange, Role, DEFAULT_MAX_MESSAGES};
pub use session::{SessionId, SessionMemory, SessionTurn};
