//! 消息通道：把用户文本送进编排器、把回复送回用户
//!
//! - console：标准输入/输出 REPL（默认入口）
//! - telegram：Telegram Bot（feature = "telegram"）
//!
//! 两个通道共用 ChannelCommand 解析 /start、/clear 等控制指令。

pub mod console;
#[cfg(feature = "telegram")]
pub mod telegram;

/// /start 的欢迎语
pub const GREETING: &str = "机器人已启动！请跟我说话。";
/// /clear 后的确认语
pub const CLEARED: &str = "对话记忆已清空。";

/// 通道收到的一条输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand<'a> {
    Start,
    Clear,
    Quit,
    /// 普通对话文本（已去掉首尾空白）
    Message(&'a str),
    Empty,
}

impl<'a> ChannelCommand<'a> {
    /// 解析输入；指令支持 Telegram 的 `/cmd@botname` 形式
    pub fn parse(input: &'a str) -> Self {
        let text = input.trim();
        if text.is_empty() {
            return ChannelCommand::Empty;
        }
        let head = text.split_whitespace().next().unwrap_or("");
        let command = head.split('@').next().unwrap_or(head);
        match command {
            "/start" => ChannelCommand::Start,
            "/clear" => ChannelCommand::Clear,
            "/quit" | "/exit" => ChannelCommand::Quit,
            _ => ChannelCommand::Message(text),
        }
    }
}
