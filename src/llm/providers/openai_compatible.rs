use async_trait::async_trait;
use futures_util::StreamExt;

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::llm::provider::LlmProvider;
use crate::llm::sse_parser;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunkKind};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

fn request_body(messages: &[ChatMessage], cfg: &CallConfig) -> serde_json::Value {
    serde_json::json!({
        "model": cfg.model,
        "messages": messages,
        "stream": cfg.stream,
        "temperature": cfg.temperature,
    })
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> DeskPilotResult<LlmResponse> {
        let body = request_body(&messages, cfg);

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            stream = cfg.stream,
            messages = messages.len(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DeskPilotError::LlmProvider(format!("{status}: {err_body}")));
        }

        if cfg.stream {
            self.handle_stream(response).await
        } else {
            self.handle_json(response).await
        }
    }
}

impl OpenAiCompatibleProvider {
    /// Accumulate an SSE stream until `[DONE]`, a finish reason, or EOF.
    async fn handle_stream(&self, response: reqwest::Response) -> DeskPilotResult<LlmResponse> {
        let mut byte_stream = response.bytes_stream();
        let mut acc = StreamAccumulator::default();

        while let Some(result) = byte_stream.next().await {
            let bytes = result?;
            if acc.feed(&bytes) {
                break;
            }
        }
        acc.flush();

        tracing::info!(
            provider = %self.id,
            content_len = acc.response.content.len(),
            reasoning_len = acc.response.reasoning.len(),
            "LLM stream complete"
        );
        Ok(acc.response)
    }

    async fn handle_json(&self, response: reqwest::Response) -> DeskPilotResult<LlmResponse> {
        let json: serde_json::Value = response.json().await?;
        let parsed = parse_json_response(&json);
        tracing::info!(
            provider = %self.id,
            content_len = parsed.content.len(),
            "LLM JSON response received"
        );
        Ok(parsed)
    }
}

fn parse_json_response(json: &serde_json::Value) -> LlmResponse {
    let message = &json["choices"][0]["message"];
    LlmResponse {
        content: message["content"].as_str().unwrap_or("").to_string(),
        reasoning: message["reasoning_content"].as_str().unwrap_or("").to_string(),
    }
}

/// Splits the streamed bytes into lines and folds the parsed chunks.
/// Lines are decoded only once complete, so a character split across two
/// network reads stays intact.
#[derive(Default)]
struct StreamAccumulator {
    line_buf: Vec<u8>,
    response: LlmResponse,
    done: bool,
}

impl StreamAccumulator {
    /// Returns true once the stream signalled completion.
    fn feed(&mut self, bytes: &[u8]) -> bool {
        for &b in bytes {
            if b == b'\n' {
                let line = std::mem::take(&mut self.line_buf);
                self.handle_line(String::from_utf8_lossy(&line).trim());
                if self.done {
                    return true;
                }
            } else {
                self.line_buf.push(b);
            }
        }
        false
    }

    /// Handle a trailing line without a newline.
    fn flush(&mut self) {
        if self.done || self.line_buf.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.line_buf);
        self.handle_line(String::from_utf8_lossy(&line).trim());
    }

    fn handle_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        match sse_parser::parse_sse_line(line) {
            Ok(Some(chunk)) => match chunk.kind {
                StreamChunkKind::Reasoning => self.response.reasoning.push_str(&chunk.content),
                StreamChunkKind::Content => self.response.content.push_str(&chunk.content),
                StreamChunkKind::Done => self.done = true,
            },
            Ok(None) => {}
            Err(e) => tracing::debug!("SSE parse skipped: {e}"),
        }
    }
}
