//! Request middleware: a seam for rewriting the outgoing model request.

use async_trait::async_trait;
use deskflow_core::{LlmRequest, Result};

/// Runs just before each model call. Middlewares apply in registration
/// order; each receives the previous one's output.
#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    async fn before_model(&self, req: LlmRequest) -> Result<LlmRequest>;
}

/// Appends a fixed block to the system instruction. The skill catalog uses
/// this to advertise available skills.
pub struct SystemPromptAddendum {
    addendum: String,
}

impl SystemPromptAddendum {
    pub fn new(addendum: impl Into<String>) -> Self {
        Self { addendum: addendum.into() }
    }
}

#[async_trait]
impl RequestMiddleware for SystemPromptAddendum {
    async fn before_model(&self, mut req: LlmRequest) -> Result<LlmRequest> {
        let prompt = match req.system_instruction.take() {
            Some(existing) => format!("{existing}\n\n{}", self.addendum),
            None => self.addendum.clone(),
        };
        req.system_instruction = Some(prompt);
        Ok(req)
    }
}
