//! 网关错误类型
//!
//! 安全拒绝与执行失败不是错误，它们作为 CommandOutcome 回传给模型；
//! 这里只有两类真正的错误：模型调用失败（单轮中止、回兜底文本）与启动期配置错误（进程退出）。

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// 模型客户端失败：网络、额度、鉴权、超时
    #[error("Upstream model failure: {0}")]
    Upstream(#[from] LlmError),

    /// 缺少凭据或配置无效，仅在启动期出现
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<config::ConfigError> for GatewayError {
    fn from(e: config::ConfigError) -> Self {
        GatewayError::Configuration(e.to_string())
    }
}
