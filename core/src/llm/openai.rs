//! OpenAI-compatible chat-completion client.
//!
//! Grounded on `loom/src/memory/openai_embedder.rs`'s idiom of wrapping an
//! `async_openai::Client` behind a small struct, and on
//! `examples/original_source/src/prompt_manager.py`'s `_call_openai` /
//! `generate_answer_stream` for the retry-and-stream behaviour.

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{CallOptions, ChatMessage, LlmClient, LlmError, Namespace, Role};

const PER_CALL_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiLlmClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key.into());
        Self { client: Client::with_config(config), model: model.into() }
    }

    fn to_request_messages(
        messages: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let mut out = Vec::with_capacity(messages.len());
        for m in messages {
            let built: ChatCompletionRequestMessage = match m.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map_err(|e| LlmError::Upstream(e.to_string()))?
                    .into(),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map_err(|e| LlmError::Upstream(e.to_string()))?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map_err(|e| LlmError::Upstream(e.to_string()))?
                    .into(),
            };
            out.push(built);
        }
        Ok(out)
    }

    async fn call_once(
        &self,
        namespace: Namespace,
        messages: &[ChatMessage],
        opts: CallOptions,
    ) -> Result<String, LlmError> {
        let config = namespace.config();
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(opts.max_tokens.unwrap_or(config.max_tokens))
            .temperature(opts.temperature.unwrap_or(config.temperature))
            .messages(Self::to_request_messages(messages)?)
            .build()
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let response = tokio::time::timeout(PER_CALL_TIMEOUT, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout)?
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content)
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn call(
        &self,
        namespace: Namespace,
        messages: &[ChatMessage],
        opts: CallOptions,
    ) -> Result<String, LlmError> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.call_once(namespace, messages, opts).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    last_err = Some(err);
                    if attempt + 1 < MAX_ATTEMPTS {
                        let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        Err(last_err.expect("loop runs at least once"))
    }

    async fn call_stream(
        &self,
        namespace: Namespace,
        messages: &[ChatMessage],
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<String, LlmError> {
        let config = namespace.config();
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(config.max_tokens)
            .temperature(config.temperature)
            .messages(Self::to_request_messages(messages)?)
            .build()
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| LlmError::Stream(e.to_string()))?;

        let mut full = String::new();
        while let Some(next) = stream.next().await {
            let chunk = next.map_err(|e| LlmError::Stream(e.to_string()))?;
            for choice in chunk.choices {
                if let Some(delta) = choice.delta.content {
                    if delta.is_empty() {
                        continue;
                    }
                    full.push_str(&delta);
                    // A disconnected subscriber must not stop token production.
                    let _ = chunk_tx.send(delta).await;
                }
            }
        }
        Ok(full)
    }
}
