//! Gemini 客户端（经由 OpenAI 兼容端点）
//!
//! Google 为 Gemini 提供了 OpenAI 兼容的 chat/completions 接口，直接复用 OpenAiClient。
//! - Base URL: https://generativelanguage.googleapis.com/v1beta/openai
//! - 鉴权: GEMINI_API_KEY

use crate::llm::OpenAiClient;

/// Gemini API 常量
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// 创建 Gemini 客户端；model 未指定时使用 GEMINI_FLASH
pub fn create_gemini_client(
    api_key: &str,
    model: Option<&str>,
    system_prompt: impl Into<String>,
) -> OpenAiClient {
    let model = model.unwrap_or(GEMINI_FLASH);
    OpenAiClient::new(Some(GEMINI_BASE_URL), model, api_key, system_prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_endpoint_has_single_slash() {
        let client = create_gemini_client("key", None, "sys");
        assert_eq!(
            client.endpoint("/chat/completions"),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }
}
