use crate::{Result, types::Content};
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmResponse>> + Send>>;

/// A model provider. `stream = false` yields exactly one response;
/// `stream = true` yields partial chunks ending with `turn_complete`.
#[async_trait]
pub trait Llm: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub config: Option<GenerateConfig>,
    /// Tool declarations in the wire format: `{name, description, parameters}`.
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<i32>,
    pub max_output_tokens: Option<i32>,
    /// JSON schema for structured output. When set, providers request a JSON
    /// response conforming to the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Option<Content>,
    pub finish_reason: Option<FinishReason>,
    pub partial: bool,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            contents,
            system_instruction: None,
            config: None,
            tools: Vec::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_config(mut self, config: GenerateConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }

    /// Request structured output conforming to the schema.
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.config.get_or_insert_with(GenerateConfig::default).response_schema = Some(schema);
        self
    }
}

impl LlmResponse {
    /// A complete, final response wrapping the given content.
    pub fn new(content: Content) -> Self {
        Self {
            content: Some(content),
            finish_reason: Some(FinishReason::Stop),
            partial: false,
            turn_complete: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builders() {
        let req = LlmRequest::new("gemini-test", vec![Content::user("hi")])
            .with_system_instruction("You are terse.")
            .with_response_schema(json!({"type": "object"}));

        assert_eq!(req.model, "gemini-test");
        assert_eq!(req.system_instruction.as_deref(), Some("You are terse."));
        assert!(req.config.unwrap().response_schema.is_some());
    }

    #[test]
    fn test_response_defaults() {
        let resp = LlmResponse::new(Content::new(crate::ROLE_MODEL).with_text("ok"));
        assert!(resp.turn_complete);
        assert!(!resp.partial);
        assert_eq!(resp.finish_reason, Some(FinishReason::Stop));
    }
}
