//! Scripted model for deterministic tests.

use async_trait::async_trait;
use deskflow_core::{Content, DeskError, Llm, LlmRequest, LlmResponse, LlmResponseStream, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a script: each `generate` call pops the next batch of chunk
/// responses. Running past the script is an error, which keeps runaway
/// agent loops visible in tests.
pub struct MockLlm {
    name: String,
    script: Mutex<VecDeque<Vec<LlmResponse>>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), script: Mutex::new(VecDeque::new()) }
    }

    /// Queue the chunks for one model call.
    pub fn call(self, chunks: Vec<LlmResponse>) -> Self {
        self.script.lock().unwrap().push_back(chunks);
        self
    }

    /// Queue a single complete text reply for one model call.
    pub fn reply(self, text: &str) -> Self {
        self.call(vec![LlmResponse::new(
            Content::new(deskflow_core::ROLE_MODEL).with_text(text),
        )])
    }

    /// Queue a reply carrying a single function call.
    pub fn reply_with_call(self, tool: &str, args: serde_json::Value) -> Self {
        self.call(vec![LlmResponse::new(
            Content::new(deskflow_core::ROLE_MODEL).with_function_call(tool, args),
        )])
    }

    /// Number of calls not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        let chunks = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DeskError::Model("mock script exhausted".to_string()))?;
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }
}
