use async_trait::async_trait;

use crate::errors::DeskPilotResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// Chat-completion backend. New providers only need to implement this trait
/// and be registered from config.toml.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The provider's identifier (its key under `[llm.providers]`).
    fn name(&self) -> &str;

    /// Send `messages` and return the complete answer. Streamed responses
    /// are accumulated before returning.
    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> DeskPilotResult<LlmResponse>;
}
