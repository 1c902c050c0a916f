//! 模型层：客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod traits;

pub use gemini::{create_gemini_client, GEMINI_API_KEY_ENV, GEMINI_BASE_URL, GEMINI_FLASH};
pub use mock::{MockModelClient, RecordedAsk};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmError, ModelClient, ModelReply};
