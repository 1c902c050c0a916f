//! cmdgate - 控制台入口
//!
//! 初始化日志、加载 .env 与配置、创建编排器，然后在标准输入/输出上运行对话循环。
//! 缺少 API Key 等配置错误会直接退出。

use std::sync::Arc;

use anyhow::Context;
use cmdgate::config::load_config;
use cmdgate::core::create_orchestrator;
use cmdgate::integrations::console::ConsoleChannel;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    cmdgate::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let orchestrator = Arc::new(create_orchestrator(&cfg).context("Failed to create orchestrator")?);

    let channel = ConsoleChannel::new(orchestrator, cfg.app.console_session_id);
    tracing::info!("cmdgate console ready (/clear 清空记忆, /quit 退出)");

    tokio::select! {
        result = channel.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => {
            result.context("Console channel failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
