//! Telegram 通道（teloxide，长轮询）
//!
//! chat id 即会话 ID。收到文本时先发 typing 状态，再跑一轮对话并回复；
//! /start 回欢迎语，/clear 清空该 chat 的记忆。

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatAction;

use crate::config::require_env;
use crate::core::{GatewayError, Orchestrator};
use crate::integrations::{ChannelCommand, CLEARED, GREETING};

/// Telegram 单条消息的最大字符数
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Bot Token 的环境变量名
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

const EMPTY_REPLY: &str = "(模型没有返回内容)";

/// Telegram 通道
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    /// 从 TELEGRAM_BOT_TOKEN 创建；缺失时返回 Configuration 错误
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self::new(require_env(TELEGRAM_BOT_TOKEN_ENV)?))
    }

    /// 启动长轮询，直到 Ctrl+C
    pub async fn run(self, orchestrator: Arc<Orchestrator>) {
        match self.bot.get_me().await {
            Ok(me) => tracing::info!(username = ?me.username, "Telegram bot connected"),
            Err(e) => tracing::error!(error = %e, "cannot reach Telegram, check token or network"),
        }

        let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
            let orchestrator = orchestrator.clone();
            async move { handle_message(bot, msg, orchestrator).await }
        });

        tracing::info!("Telegram bot polling");
        Dispatcher::builder(self.bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    orchestrator: Arc<Orchestrator>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    let reply = match ChannelCommand::parse(text) {
        ChannelCommand::Empty | ChannelCommand::Quit => return Ok(()),
        ChannelCommand::Start => GREETING.to_string(),
        ChannelCommand::Clear => {
            orchestrator.clear_session(chat_id.0).await;
            CLEARED.to_string()
        }
        ChannelCommand::Message(text) => {
            tracing::info!(chat_id = chat_id.0, "Telegram message received");
            if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
                tracing::debug!(error = %e, "typing action failed");
            }
            orchestrator.handle_turn(chat_id.0, text).await
        }
    };

    for chunk in split_message(&reply, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

/// 按 UTF-16 码元数切分超长回复（Telegram 的长度上限按 UTF-16 计）；空回复替换为占位文本
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![EMPTY_REPLY.to_string()];
    }
    let limit = limit.max(2);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut units = 0;
    for c in text.chars() {
        let width = c.len_utf16();
        if units + width > limit {
            chunks.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(c);
        units += width;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
