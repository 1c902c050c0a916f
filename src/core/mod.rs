//! 核心编排层：错误类型、编排器、构建

pub mod builder;
pub mod error;
pub mod orchestrator;

pub use builder::{build_orchestrator, create_model_client, create_orchestrator};
pub use error::GatewayError;
pub use orchestrator::{
    follow_up_prompt, Orchestrator, ToolOutcome, TurnOutcome, TurnPhase, DEFAULT_FALLBACK_MESSAGE,
};
