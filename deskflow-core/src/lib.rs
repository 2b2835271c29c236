//! # deskflow-core
//!
//! Core traits and types shared across the Deskflow crates.
//!
//! - [`Content`] / [`Part`] - conversation messages exchanged with models
//! - [`Llm`] - the model provider trait with unary and streaming generation
//! - [`Tool`] - callable capabilities exposed to agents
//! - [`DeskError`] / [`Result`] - unified error handling

pub mod error;
pub mod model;
pub mod tool;
pub mod transcript;
pub mod types;

pub use error::{DeskError, Result};
pub use transcript::MESSAGES_CHANNEL;
pub use model::{FinishReason, GenerateConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream};
pub use tool::{Tool, declaration};
pub use types::{Content, Part, ROLE_FUNCTION, ROLE_MODEL, ROLE_USER};
