//! 控制台通道：每行输入即一轮对话
//!
//! 所有输入属于同一个会话（[app].console_session_id）。支持 /start、/clear、/quit。

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::Orchestrator;
use crate::integrations::{ChannelCommand, CLEARED, GREETING};
use crate::memory::SessionId;

/// 控制台通道
pub struct ConsoleChannel {
    orchestrator: Arc<Orchestrator>,
    session_id: SessionId,
}

impl ConsoleChannel {
    pub fn new(orchestrator: Arc<Orchestrator>, session_id: SessionId) -> Self {
        Self {
            orchestrator,
            session_id,
        }
    }

    /// 逐行读取 reader，回复写入 writer；读到 EOF 或 /quit 时返回
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        writer.write_all(b"> ").await?;
        writer.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let reply = match ChannelCommand::parse(&line) {
                ChannelCommand::Quit => break,
                ChannelCommand::Empty => None,
                ChannelCommand::Start => Some(GREETING.to_string()),
                ChannelCommand::Clear => {
                    self.orchestrator.clear_session(self.session_id).await;
                    Some(CLEARED.to_string())
                }
                ChannelCommand::Message(text) => {
                    tracing::info!(session_id = self.session_id, "console message received");
                    Some(self.orchestrator.handle_turn(self.session_id, text).await)
                }
            };
            if let Some(reply) = reply {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.write_all(b"> ").await?;
            writer.flush().await?;
        }
        Ok(())
    }
}
