//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CMDGATE__*` 覆盖（双下划线表示嵌套，如 `CMDGATE__LLM__PROVIDER=openai`）。
//! 凭据（API Key、Bot Token）不放在配置文件里，只从环境变量读取，缺失即为启动期致命错误。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::{GatewayError, DEFAULT_FALLBACK_MESSAGE};
use crate::memory::DEFAULT_MAX_MESSAGES;
use crate::tools::DEFAULT_DENYLIST;

/// 未找到 config/prompts/system.txt 且配置未覆盖时使用的 system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个拥有系统管理权限的 AI 助手。你可以通过 execute_command 工具来查看目录或文件内容。请根据工具的返回结果来回答用户。";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
}

/// [app] 段：会话记忆上限、失败兜底回复、控制台会话 ID
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 每个会话保留的消息条数（user/model 各算一条）
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    /// 模型调用失败时回给用户的固定文本
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
    #[serde(default)]
    pub console_session_id: i64,
}

fn default_max_history_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history_messages(),
            fallback_message: default_fallback_message(),
            console_session_id: 0,
        }
    }
}

/// [llm] 段：后端选择、模型、超时、system prompt
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：gemini / openai
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 单次模型请求超时（秒），0 表示不限
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub system_prompt: Option<String>,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            request_timeout_secs: default_request_timeout(),
            system_prompt: None,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsSection {
    #[serde(default)]
    pub shell: ShellSection,
}

/// [tools.shell] 段：工作目录、超时、黑名单
#[derive(Debug, Clone, Deserialize)]
pub struct ShellSection {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// 单条指令超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_denylist() -> Vec<String> {
    DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect()
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            timeout_secs: default_timeout_secs(),
            denylist: default_denylist(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 CMDGATE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CMDGATE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(env_source());

    let c = builder.build()?;
    c.try_deserialize()
}

/// CMDGATE__* 环境变量源；denylist 以逗号分隔，如 `CMDGATE__TOOLS__SHELL__DENYLIST=rm,sudo`
fn env_source() -> config::Environment {
    config::Environment::with_prefix("CMDGATE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tools.shell.denylist")
}

/// 读取必需的凭据环境变量；缺失或为空时返回 Configuration 错误
pub fn require_env(name: &str) -> Result<String, GatewayError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GatewayError::Configuration(format!("{name} is not set"))),
    }
}

/// system prompt：config/prompts/system.txt > [llm].system_prompt > 内置默认
pub fn load_system_prompt(cfg: &AppConfig) -> String {
    ["config/prompts/system.txt", "../config/prompts/system.txt"]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| cfg.llm.system_prompt.clone())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
}
