//! 编排器构建：根据配置创建模型客户端、执行器、记忆与编排器
//!
//! 控制台与 Telegram 两个入口共用同一套初始化逻辑；凭据缺失在这里以 Configuration 错误暴露。

use std::sync::Arc;

use crate::config::{load_system_prompt, require_env, AppConfig};
use crate::core::{GatewayError, Orchestrator};
use crate::llm::{create_gemini_client, ModelClient, OpenAiClient, GEMINI_API_KEY_ENV, GEMINI_FLASH};
use crate::memory::SessionMemory;
use crate::tools::{SecurityFilter, ShellRunner};

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 根据 [llm].provider 选择后端（gemini / openai）；对应 API Key 未设置时返回 Configuration 错误
pub fn create_model_client(
    cfg: &AppConfig,
    system_prompt: &str,
) -> Result<Arc<dyn ModelClient>, GatewayError> {
    let provider = cfg.llm.provider.to_lowercase();
    match provider.as_str() {
        "gemini" => {
            let api_key = require_env(GEMINI_API_KEY_ENV)?;
            let model = cfg.llm.model.as_deref();
            tracing::info!("Using Gemini model ({})", model.unwrap_or(GEMINI_FLASH));
            let client = match cfg.llm.base_url.as_deref() {
                Some(url) => OpenAiClient::new(
                    Some(url),
                    model.unwrap_or(GEMINI_FLASH),
                    &api_key,
                    system_prompt,
                ),
                None => create_gemini_client(&api_key, model, system_prompt),
            };
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = require_env(OPENAI_API_KEY_ENV)?;
            let model = cfg.llm.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL);
            tracing::info!("Using OpenAI-compatible model ({})", model);
            Ok(Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                model,
                &api_key,
                system_prompt,
            )))
        }
        other => Err(GatewayError::Configuration(format!(
            "unknown llm provider: {other}"
        ))),
    }
}

/// 用给定的模型客户端组装编排器（执行器、过滤、记忆均取自配置）
pub fn build_orchestrator(cfg: &AppConfig, model: Arc<dyn ModelClient>) -> Orchestrator {
    let shell = &cfg.tools.shell;
    Orchestrator::new(
        model,
        Arc::new(ShellRunner::with_timeout_secs(shell.timeout_secs)),
        Arc::new(SessionMemory::new(cfg.app.max_history_messages)),
    )
    .with_filter(SecurityFilter::new(shell.denylist.clone()))
    .with_working_dir(shell.working_dir.clone())
    .with_fallback_message(cfg.app.fallback_message.clone())
    .with_request_timeout_secs(cfg.llm.request_timeout_secs)
}

/// 从配置创建完整的编排器
pub fn create_orchestrator(cfg: &AppConfig) -> Result<Orchestrator, GatewayError> {
    let system_prompt = load_system_prompt(cfg);
    let model = create_model_client(cfg, &system_prompt)?;
    tracing::info!(
        working_dir = %cfg.tools.shell.working_dir.display(),
        denylist = cfg.tools.shell.denylist.len(),
        max_history = cfg.app.max_history_messages,
        "orchestrator ready"
    );
    Ok(build_orchestrator(cfg, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockModelClient, ModelReply};

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "nonsense".into();
        let err = create_model_client(&cfg, "sys").err().unwrap();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_build_orchestrator_uses_config() {
        let mut cfg = AppConfig::default();
        cfg.app.max_history_messages = 2;
        cfg.app.fallback_message = "oops".into();
        let model = Arc::new(
            MockModelClient::new()
                .then_reply(ModelReply::text("a"))
                .then_reply(ModelReply::text("b")),
        );
        let orch = build_orchestrator(&cfg, model);

        orch.handle_turn(1, "q1").await;
        orch.handle_turn(1, "q2").await;
        let history = orch.memory().get_history(1).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "q2");

        // 脚本耗尽 -> 上游失败 -> 兜底文本
        assert_eq!(orch.handle_turn(1, "q3").await, "oops");
    }
}
