//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；Gemini、OpenAI、自建代理均可。
//! 每次请求都带上 system prompt 与 execute_command 工具声明，模型可选择直接回答或请求工具调用。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
#[cfg(test)]
use async_openai::config::Config;
use async_openai::types::chat::{
    ChatChoice, ChatCompletionMessageToolCalls, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequest,
    CreateChatCompletionResponse, FunctionObject, ToolChoiceOptions,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmError, ModelClient, ModelReply};
use crate::memory::{Exchange, Role};
use crate::tools::{tool_declarations, RawToolCall};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名、system prompt 与工具声明
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
    tools: Vec<ChatCompletionTools>,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &str,
        system_prompt: impl Into<String>,
    ) -> Self {
        // async-openai 直接拼接 "/chat/completions"，base_url 末尾的 '/' 会产生双斜杠
        let config = match base_url {
            Some(url) => OpenAIConfig::new()
                .with_api_base(url.trim_end_matches('/'))
                .with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        let tools = tool_declarations()
            .into_iter()
            .map(|decl| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: decl.name.to_string(),
                        description: Some(decl.description.to_string()),
                        parameters: Some(decl.parameters),
                        strict: None,
                    },
                })
            })
            .collect();

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            system_prompt: system_prompt.into(),
            tools,
            usage: TokenUsage::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn endpoint(&self, path: &str) -> String {
        self.client.config().url(path)
    }

    /// system prompt + 历史 + 本次提示词
    fn to_openai_messages(&self, prompt: &str, history: &[Exchange]) -> Vec<ChatCompletionRequestMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(
            ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(self.system_prompt.clone()),
                name: None,
            }
            .into(),
        );
        messages.extend(history.iter().map(|e| match e.role {
            Role::User => user_message(&e.text),
            Role::Model => model_message(&e.text),
        }));
        messages.push(user_message(prompt));
        messages
    }
}

fn user_message(text: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Text(text.to_string()),
        name: None,
    }
    .into()
}

fn model_message(text: &str) -> ChatCompletionRequestMessage {
    #[allow(deprecated)]
    ChatCompletionRequestAssistantMessage {
        content: Some(ChatCompletionRequestAssistantMessageContent::Text(text.to_string())),
        name: None,
        tool_calls: None,
        function_call: None,
        refusal: None,
        audio: None,
    }
    .into()
}

/// 工具参数是 JSON 字符串；解析失败时原样保留，交给 ToolRequest 报告参数错误
fn parse_arguments(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// 取第一个 choice 转为 ModelReply；没有 choice 视为无效响应
fn reply_from_response(response: &CreateChatCompletionResponse) -> Result<ModelReply, LlmError> {
    response
        .choices
        .first()
        .map(reply_from_choice)
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
}

/// 只保留 function 类型的工具调用，其它类型忽略
fn reply_from_choice(choice: &ChatChoice) -> ModelReply {
    let tool_calls = choice
        .message
        .tool_calls
        .iter()
        .flatten()
        .filter_map(|tc| match tc {
            ChatCompletionMessageToolCalls::Function(call) => Some(RawToolCall::new(
                call.function.name.clone(),
                parse_arguments(&call.function.arguments),
            )),
            _ => None,
        })
        .collect();

    ModelReply {
        text: choice.message.content.clone(),
        tool_calls,
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn ask(&self, prompt: &str, history: &[Exchange]) -> Result<ModelReply, LlmError> {
        tracing::info!(model = %self.model, history = history.len(), "model request");

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: self.to_openai_messages(prompt, history),
            tools: Some(self.tools.clone()),
            tool_choice: Some(ChatCompletionToolChoiceOption::Mode(ToolChoiceOptions::Auto)),
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
            let (_, _, total) = self.usage.get();
            tracing::debug!(total_tokens = total, "token usage");
        }

        reply_from_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_wrap_history_with_system_and_prompt() {
        let client = OpenAiClient::new(None, "gpt-4o-mini", "sk-test", "sys");
        let history = vec![Exchange::user("hi"), Exchange::model("hello")];
        let messages = client.to_openai_messages("ls", &history);
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_parse_arguments_falls_back_to_raw_string() {
        assert_eq!(
            parse_arguments(r#"{"command":"ls"}"#),
            serde_json::json!({ "command": "ls" })
        );
        assert_eq!(parse_arguments("not json"), serde_json::json!("not json"));
    }

    #[test]
    fn test_token_usage_accumulates() {
        let usage = TokenUsage::new();
        usage.add(10, 5);
        usage.add(1, 1);
        assert_eq!(usage.get(), (11, 6, 17));
    }

    #[test]
    fn test_client_reports_accumulated_usage() {
        let client = OpenAiClient::new(None, "gpt-4o-mini", "sk-test", "sys");
        assert_eq!(client.token_usage(), (0, 0, 0));
        client.usage.add(7, 3);
        assert_eq!(client.token_usage(), (7, 3, 10));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenAiClient::new(Some("http://localhost:8080/v1/"), "m", "k", "sys");
        assert_eq!(
            client.endpoint("/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    fn response(json: serde_json::Value) -> CreateChatCompletionResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_reply_maps_function_tool_calls() {
        let response = response(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gemini-2.5-flash",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": "我来看看",
                    "tool_calls": [
                        {
                            "id": "call_1",
                            "type": "function",
                            "function": { "name": "execute_command", "arguments": "{\"command\":\"ls -la\"}" }
                        },
                        {
                            "id": "call_2",
                            "type": "function",
                            "function": { "name": "execute_command", "arguments": "{command: ls" }
                        }
                    ]
                }
            }]
        }));

        let reply = reply_from_response(&response).unwrap();
        assert_eq!(reply.text.as_deref(), Some("我来看看"));
        assert_eq!(
            reply.tool_calls,
            vec![
                RawToolCall::execute_command("ls -la"),
                RawToolCall::new("execute_command", serde_json::json!("{command: ls")),
            ]
        );
    }

    #[test]
    fn test_reply_without_tool_calls_is_plain_text() {
        let response = response(serde_json::json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": { "role": "assistant", "content": "你好" }
            }]
        }));

        let reply = reply_from_response(&response).unwrap();
        assert_eq!(reply.text.as_deref(), Some("你好"));
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn test_response_without_choices_is_invalid() {
        let response = response(serde_json::json!({
            "id": "chatcmpl-3",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": []
        }));

        assert!(matches!(
            reply_from_response(&response),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
