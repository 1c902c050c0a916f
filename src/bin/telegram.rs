//! cmdgate Telegram 服务
//!
//! 环境变量:
//! - TELEGRAM_BOT_TOKEN: BotFather 提供的 Bot Token
//! - GEMINI_API_KEY 或 OPENAI_API_KEY: 模型 API Key（取决于 [llm].provider）
//!
//! 启动: cargo run --bin cmdgate-telegram --features telegram

use std::sync::Arc;

use anyhow::Context;
use cmdgate::config::load_config;
use cmdgate::core::create_orchestrator;
use cmdgate::integrations::telegram::TelegramChannel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    cmdgate::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let orchestrator = Arc::new(create_orchestrator(&cfg).context("Failed to create orchestrator")?);
    let channel = TelegramChannel::from_env().context("Failed to create Telegram channel")?;

    channel.run(orchestrator).await;
    Ok(())
}
