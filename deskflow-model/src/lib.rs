//! # deskflow-model
//!
//! LLM providers implementing [`deskflow_core::Llm`].
//!
//! - [`GeminiModel`] - Google Gemini over the `generativelanguage` REST API,
//!   unary and SSE streaming
//! - [`MockLlm`] - scripted responses for deterministic tests

pub mod gemini;
pub mod mock;

pub use gemini::GeminiModel;
pub use mock::MockLlm;
