//! 编排器：单次工具调用的对话轮协议
//!
//! 一轮对话：取会话历史 -> 问模型 -> (直接回答 | 执行一次工具 -> 带结果再问模型) -> 写入记忆 -> 返回文本。
//! 整轮持有该会话的独占锁，同一会话的并发轮次串行执行；模型失败时回兜底文本且不写记忆。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::core::GatewayError;
use crate::llm::{LlmError, ModelClient, ModelReply};
use crate::memory::{Exchange, SessionId, SessionMemory};
use crate::tools::{
    CommandOutcome, CommandRunner, FilterVerdict, RawToolCall, SecurityFilter, ToolCallError,
    ToolRequest,
};

/// 模型失败时的默认兜底回复
pub const DEFAULT_FALLBACK_MESSAGE: &str = "处理过程中发生错误，请查看日志。";

/// 单轮对话的阶段（debug 日志用）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    Start,
    AskedModel,
    Direct,
    ToolRequested,
    ToolExecuted,
    AskedModelAgain,
    Done,
}

fn enter(phase: TurnPhase) {
    tracing::debug!(?phase, "turn phase");
}

/// 工具执行结果（含未识别工具与参数错误），统一转为回传模型的文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Command(CommandOutcome),
    Unsupported { name: String },
    InvalidArguments { name: String, reason: String },
}

impl ToolOutcome {
    pub fn to_text(&self) -> String {
        match self {
            ToolOutcome::Command(outcome) => outcome.to_text(),
            ToolOutcome::Unsupported { name } => format!(
                "[不支持的工具]: 工具 \"{name}\" 不可用，目前只支持 execute_command。"
            ),
            ToolOutcome::InvalidArguments { name, reason } => {
                format!("[参数错误]: 工具 \"{name}\" 的参数无效：{reason}")
            }
        }
    }
}

/// 一轮对话的结果：最终回复 + 本轮执行过的工具（若有）
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool: Option<ToolOutcome>,
}

/// 工具执行后的追问提示词；ignored 为本轮未执行的多余工具调用数
pub fn follow_up_prompt(result_text: &str, ignored: usize) -> String {
    let mut prompt = format!("执行结果：\n{result_text}\n");
    if ignored > 0 {
        prompt.push_str(&format!(
            "注意：每轮只执行第一个工具调用，其余 {ignored} 个调用未执行。\n"
        ));
    }
    prompt.push_str("请根据结果回答。");
    prompt
}

/// 编排器：持有模型客户端、安全过滤、指令执行器与会话记忆
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    filter: SecurityFilter,
    runner: Arc<dyn CommandRunner>,
    memory: Arc<SessionMemory>,
    working_dir: PathBuf,
    fallback_message: String,
    request_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        runner: Arc<dyn CommandRunner>,
        memory: Arc<SessionMemory>,
    ) -> Self {
        Self {
            model,
            filter: SecurityFilter::default(),
            runner,
            memory,
            working_dir: PathBuf::from("."),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            request_timeout: None,
        }
    }

    pub fn with_filter(mut self, filter: SecurityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    /// 单次模型请求超时；0 表示不限
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }

    /// 处理一轮对话并返回要发给用户的文本；任何失败都转为兜底文本，不会 panic 或返回错误
    pub async fn handle_turn(&self, session_id: SessionId, text: &str) -> String {
        match self.process_turn(session_id, text).await {
            Ok(outcome) => outcome.reply,
            Err(e) => {
                tracing::error!(session_id, error = %e, "turn failed");
                self.fallback_message.clone()
            }
        }
    }

    /// 与 handle_turn 相同的一轮对话，但暴露工具结果与错误；只有 Ok 时写入记忆
    pub async fn process_turn(
        &self,
        session_id: SessionId,
        text: &str,
    ) -> Result<TurnOutcome, GatewayError> {
        let span = tracing::info_span!(
            "turn",
            session_id,
            turn_id = %uuid::Uuid::new_v4()
        );
        async {
            enter(TurnPhase::Start);
            let mut session = self.memory.lock_session(session_id).await;
            let outcome = self.run_turn(session.history(), text).await?;
            session.record_exchange(text, outcome.reply.clone());
            enter(TurnPhase::Done);
            let (prompt_tokens, completion_tokens, total_tokens) = self.model.token_usage();
            tracing::info!(
                tool = outcome.tool.is_some(),
                history = session.history().len(),
                prompt_tokens,
                completion_tokens,
                total_tokens,
                "turn completed"
            );
            Ok::<_, GatewayError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// 清空会话记忆
    pub async fn clear_session(&self, session_id: SessionId) {
        self.memory.clear(session_id).await;
    }

    async fn run_turn(&self, history: &[Exchange], text: &str) -> Result<TurnOutcome, GatewayError> {
        let reply = self.ask_model(text, history).await?;
        enter(TurnPhase::AskedModel);

        let Some((call, extra)) = reply.tool_calls.split_first() else {
            enter(TurnPhase::Direct);
            return Ok(TurnOutcome {
                reply: reply.text_or_empty().to_string(),
                tool: None,
            });
        };

        enter(TurnPhase::ToolRequested);
        if !extra.is_empty() {
            tracing::warn!(
                ignored = extra.len(),
                "model requested multiple tool calls, only the first is executed"
            );
        }

        let tool = self.execute_tool(call).await;
        enter(TurnPhase::ToolExecuted);
        let result_text = tool.to_text();

        // 追问仍使用工具调用前的历史
        let prompt = follow_up_prompt(&result_text, extra.len());
        let follow_up = self.ask_model(&prompt, history).await?;
        enter(TurnPhase::AskedModelAgain);

        let reply = if follow_up.has_tool_call() {
            tracing::warn!("model requested another tool call after the tool result, not executed");
            final_text_for_nested_call(&follow_up, &result_text)
        } else {
            follow_up.text_or_empty().to_string()
        };

        Ok(TurnOutcome {
            reply,
            tool: Some(tool),
        })
    }

    /// 解析工具调用；execute_command 先过安全过滤，通过后才交给执行器
    async fn execute_tool(&self, call: &RawToolCall) -> ToolOutcome {
        match ToolRequest::try_from(call) {
            Ok(ToolRequest::ExecuteCommand(args)) => {
                tracing::info!(command = %args.command, "tool call: execute_command");
                let outcome = match self.filter.check(&args.command) {
                    FilterVerdict::Denied(keyword) => CommandOutcome::Rejected { keyword },
                    FilterVerdict::Allowed => self.runner.run(&args.command, &self.working_dir).await,
                };
                ToolOutcome::Command(outcome)
            }
            Err(ToolCallError::Unsupported(name)) => {
                tracing::warn!(tool = %name, "unsupported tool requested");
                ToolOutcome::Unsupported { name }
            }
            Err(ToolCallError::InvalidArguments { name, reason }) => {
                tracing::warn!(tool = %name, reason = %reason, "invalid tool arguments");
                ToolOutcome::InvalidArguments { name, reason }
            }
        }
    }

    async fn ask_model(&self, prompt: &str, history: &[Exchange]) -> Result<ModelReply, LlmError> {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.model.ask(prompt, history))
                .await
                .map_err(|_| LlmError::Timeout(limit.as_secs()))?,
            None => self.model.ask(prompt, history).await,
        }
    }
}

/// 追问时模型又要求调用工具：不再循环，优先用其附带的文本，否则直接给出工具结果
fn final_text_for_nested_call(follow_up: &ModelReply, result_text: &str) -> String {
    match follow_up.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => format!("每轮只支持一次工具调用，以下是本次执行结果：\n{result_text}"),
    }
}
