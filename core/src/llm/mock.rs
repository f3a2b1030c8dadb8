//! Fixed-response test double, grounded on `loom/src/llm/mod.rs`'s `StubLlm`
//! test helper (promoted here to a reusable, named type since multiple
//! component tests across the crate need an `LlmClient` double).

use async_trait::async_trait;

use super::{CallOptions, ChatMessage, LlmClient, LlmError, Namespace};

pub struct MockLlm {
    response: String,
}

impl MockLlm {
    pub fn with_fixed_response(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn call(
        &self,
        _namespace: Namespace,
        _messages: &[ChatMessage],
        _opts: CallOptions,
    ) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }
}
