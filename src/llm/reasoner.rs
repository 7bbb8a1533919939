use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::DeskPilotResult;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage};

pub const INTERPRET_SYSTEM_PROMPT: &str = "You are an AI desktop automation interpreter. \
Translate the user's instruction into a sequence of mouse and keyboard operations.";

pub const PLAN_SYSTEM_PROMPT: &str = "You are an AI desktop automation assistant. \
Break down user tasks into concrete steps that can be performed using mouse clicks, \
keyboard input, and screen reading.";

pub fn interpret_prompt(step: &str) -> String {
    format!(
        "Instruction: {step}\nTranslate this into a sequence of basic operations \
         (click, type, press key, etc.), one per line."
    )
}

pub fn plan_prompt(task: &str) -> String {
    format!("Task: {task}\nBreak this down into a sequence of specific steps, one per line.")
}

/// Free-text completion used for planning and for instructions no pattern
/// understands.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> DeskPilotResult<String>;
}

/// Reasoning service backed by a chat provider.
pub struct LlmReasoner {
    provider: Arc<dyn LlmProvider>,
    call: CallConfig,
}

impl LlmReasoner {
    pub fn new(provider: Arc<dyn LlmProvider>, call: CallConfig) -> Self {
        Self { provider, call }
    }
}

#[async_trait]
impl ReasoningService for LlmReasoner {
    async fn complete(&self, system: &str, user: &str) -> DeskPilotResult<String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let response = self.provider.chat(messages, &self.call).await?;
        let answer = response.content.trim().to_string();
        tracing::info!(
            provider = self.provider.name(),
            model = %self.call.model,
            lines = answer.lines().count(),
            "reasoning answer received"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{LlmResponse, Role};
    use std::sync::Mutex;

    struct EchoProvider {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> DeskPilotResult<LlmResponse> {
            *self.seen.lock().unwrap() = messages;
            Ok(LlmResponse {
                content: format!("  model={}\n", cfg.model),
                reasoning: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn sends_system_then_user_and_trims_answer() {
        let provider = Arc::new(EchoProvider { seen: Mutex::new(Vec::new()) });
        let reasoner = LlmReasoner::new(
            provider.clone(),
            CallConfig { model: "m1".into(), stream: false, temperature: 0.1 },
        );

        let answer = reasoner.complete("sys", "usr").await.unwrap();

        assert_eq!(answer, "model=m1");
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, Role::System);
        assert_eq!(seen[1].content, "usr");
    }

    #[test]
    fn prompts_embed_the_input() {
        assert!(interpret_prompt("open the mail").starts_with("Instruction: open the mail\n"));
        assert!(plan_prompt("send a mail").starts_with("Task: send a mail\n"));
    }
}
